//! Error types for vidgist.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an operation failed, as far as the caller needs to know.
///
/// Only [`ErrorKind::NetworkError`] and [`ErrorKind::RateLimited`] are worth
/// another attempt; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    TooLong,
    TooLarge,
    NetworkError,
    NoContent,
    PermissionDenied,
    RateLimited,
    Unknown,
}

impl ErrorKind {
    /// Whether another attempt of the same operation may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::RateLimited)
    }

    /// Classify an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => ErrorKind::RateLimited,
            404 => ErrorKind::NotFound,
            403 => ErrorKind::PermissionDenied,
            500..=599 => ErrorKind::NetworkError,
            _ => ErrorKind::Unknown,
        }
    }

    /// Classify a Bilibili API response code.
    pub fn from_bilibili_code(code: i64) -> Self {
        match code {
            -404 | 62002 | 62004 => ErrorKind::NotFound,
            -403 => ErrorKind::PermissionDenied,
            -504 | -503 => ErrorKind::NetworkError,
            -509 => ErrorKind::RateLimited,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::TooLong => "too_long",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::NoContent => "no_content",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// User-facing explanation of the failure.
    ///
    /// `limit` fills in the ceiling for [`ErrorKind::TooLong`] (minutes) and
    /// [`ErrorKind::TooLarge`] (megabytes).
    pub fn friendly_message(self, limit: Option<u64>) -> String {
        match self {
            ErrorKind::NotFound => "the video does not exist or has been removed".to_string(),
            ErrorKind::TooLong => match limit {
                Some(limit) => format!("the video is longer than the {} minute limit", limit),
                None => "the video is too long".to_string(),
            },
            ErrorKind::TooLarge => match limit {
                Some(limit) => format!("the video file is larger than {} MB", limit),
                None => "the video file is too large".to_string(),
            },
            ErrorKind::NetworkError => "network error, please try again later".to_string(),
            ErrorKind::NoContent => "no usable content could be extracted".to_string(),
            ErrorKind::PermissionDenied => {
                "the video requires login or a membership to watch".to_string()
            }
            ErrorKind::RateLimited => "too many requests, please try again later".to_string(),
            ErrorKind::Unknown => "the video could not be processed".to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can tell which [`ErrorKind`] they belong to.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Core error type for vidgist operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{message}")]
    Classified { kind: ErrorKind, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn classified(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error::Classified {
            kind,
            message: message.into(),
        }
    }
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Classified { kind, .. } => *kind,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Result type alias using vidgist's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
