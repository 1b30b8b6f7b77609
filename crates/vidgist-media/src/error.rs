//! Error types for media processing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Tool not found: {tool}. Please install it.")]
    ToolNotFound { tool: String },

    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    #[error("No frames could be extracted from {0}")]
    NoFrames(PathBuf),

    #[error("Parse error: {0}")]
    ParseError(String),
}
