//! Error types for the processing pipeline.

use thiserror::Error;
use vidgist_core::{Classify, ErrorKind};

/// Failures that end a request without a usable digest.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A non-retryable failure, such as a missing or restricted video.
    #[error("{message}")]
    Terminal { kind: ErrorKind, message: String },

    /// The request ran but produced nothing usable.
    #[error("{message}")]
    Failed { kind: ErrorKind, message: String },

    /// No video reference could be found or resolved.
    #[error("No Bilibili video found in: {0}")]
    NoReference(String),
}

impl PipelineError {
    /// The user-facing phrase for this failure.
    ///
    /// `duration_limit_min` and `size_limit_mb` fill in the limits for
    /// `TooLong` and `TooLarge`.
    pub fn friendly_message(&self, duration_limit_min: u64, size_limit_mb: u64) -> String {
        match self {
            PipelineError::NoReference(_) => {
                "no valid Bilibili video found; use a BV id, an av id, a video link or a b23.tv short link"
                    .to_string()
            }
            other => {
                let kind = other.kind();
                let limit = match kind {
                    ErrorKind::TooLong => Some(duration_limit_min),
                    ErrorKind::TooLarge => Some(size_limit_mb),
                    _ => None,
                };
                kind.friendly_message(limit)
            }
        }
    }
}

impl Classify for PipelineError {
    fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Terminal { kind, .. } | PipelineError::Failed { kind, .. } => *kind,
            PipelineError::NoReference(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_message_uses_limits() {
        let err = PipelineError::Failed {
            kind: ErrorKind::TooLong,
            message: "45 minutes".to_string(),
        };
        assert!(err.friendly_message(30, 200).contains("30 minute"));

        let err = PipelineError::Terminal {
            kind: ErrorKind::NotFound,
            message: "code -404".to_string(),
        };
        assert_eq!(
            err.friendly_message(30, 200),
            ErrorKind::NotFound.friendly_message(None)
        );
    }
}
