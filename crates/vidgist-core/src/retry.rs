//! Bounded retry with fixed delays.

use crate::error::Classify;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Build a policy from config values expressed in seconds.
    pub fn from_secs(max_attempts: u32, interval_secs: f64) -> Self {
        let interval = Duration::try_from_secs_f64(interval_secs).unwrap_or(Duration::ZERO);
        Self::new(max_attempts, interval)
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds, fails terminally, or runs out of attempts.
///
/// Terminal errors are returned immediately. Retryable errors are retried
/// after `policy.interval`; the last error is returned once attempts run out.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                let kind = e.kind();
                if !kind.is_retryable() {
                    debug!("{} failed with terminal error ({}): {}", operation, kind, e);
                    return Err(e);
                }
                if attempt >= attempts {
                    warn!("{} failed after {} attempts: {}", operation, attempts, e);
                    return Err(e);
                }
                warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    operation, attempt, attempts, e, policy.interval
                );
                tokio::time::sleep(policy.interval).await;
                attempt += 1;
            }
        }
    }
}
