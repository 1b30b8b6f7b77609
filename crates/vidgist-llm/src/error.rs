//! Error types for model provider operations.

use thiserror::Error;
use vidgist_core::{Classify, ErrorKind};

/// Errors that can occur when talking to a model provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Connection error - unable to reach the provider.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// Ollama server is not running.
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// No API key configured for a provider that needs one.
    #[error("No API key configured for {provider}")]
    MissingApiKey { provider: String },

    /// The provider answered but said nothing.
    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    /// An uploaded file could not be processed server-side.
    #[error("File processing failed: {0}")]
    FileProcessing(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for LlmError {
    fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Connection(_)
            | LlmError::Timeout { .. }
            | LlmError::ServerNotRunning { .. }
            | LlmError::EmptyResponse { .. } => ErrorKind::NetworkError,
            LlmError::ApiError { status, .. } => ErrorKind::from_http_status(*status),
            LlmError::ModelNotFound { .. } => ErrorKind::NotFound,
            LlmError::Http(e) if e.is_timeout() || e.is_connect() => ErrorKind::NetworkError,
            LlmError::Http(e) => e
                .status()
                .map(|s| ErrorKind::from_http_status(s.as_u16()))
                .unwrap_or(ErrorKind::Unknown),
            _ => ErrorKind::Unknown,
        }
    }
}

/// Result type for provider operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Turn a send error into the most specific variant.
pub(crate) fn map_send_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout {
            seconds: timeout_secs,
        }
    } else if e.is_connect() {
        LlmError::Connection(e.to_string())
    } else {
        LlmError::Http(e)
    }
}

/// Fail with [`LlmError::ApiError`] unless the response is a success.
pub(crate) async fn check_status(response: reqwest::Response) -> LlmResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(LlmError::ApiError {
        status: status.as_u16(),
        message,
    })
}
