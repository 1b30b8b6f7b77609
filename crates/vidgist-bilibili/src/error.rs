//! Error types for Bilibili API operations.

use thiserror::Error;
use vidgist_core::{Classify, ErrorKind};

/// Errors that can occur when talking to Bilibili.
#[derive(Error, Debug)]
pub enum BiliError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-zero code.
    #[error("Bilibili API error (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("HTTP request failed with status {0}")]
    Status(u16),

    #[error("Video file exceeds {limit_mb} MB")]
    TooLarge { limit_mb: u64 },

    #[error("No video reference in: {0}")]
    InvalidReference(String),

    #[error("No download URL for {0}")]
    NoDownloadUrl(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for BiliError {
    fn kind(&self) -> ErrorKind {
        match self {
            BiliError::Http(e) if e.is_decode() => ErrorKind::Unknown,
            BiliError::Http(e) if e.is_timeout() || e.is_connect() || e.is_body() => {
                ErrorKind::NetworkError
            }
            BiliError::Http(e) => e
                .status()
                .map(|s| ErrorKind::from_http_status(s.as_u16()))
                .unwrap_or(ErrorKind::NetworkError),
            BiliError::Api { code, .. } => ErrorKind::from_bilibili_code(*code),
            BiliError::Status(status) => ErrorKind::from_http_status(*status),
            BiliError::TooLarge { .. } => ErrorKind::TooLarge,
            BiliError::InvalidReference(_) | BiliError::NoDownloadUrl(_) => ErrorKind::NotFound,
            BiliError::Parse(_) | BiliError::Io(_) => ErrorKind::Unknown,
        }
    }
}

impl From<BiliError> for vidgist_core::Error {
    fn from(e: BiliError) -> Self {
        vidgist_core::Error::classified(e.kind(), e.to_string())
    }
}

/// Result type for Bilibili operations.
pub type BiliResult<T> = Result<T, BiliError>;
