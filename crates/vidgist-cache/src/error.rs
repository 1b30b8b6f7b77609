//! Cache error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to commit {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

pub type CacheResult<T> = Result<T, CacheError>;
