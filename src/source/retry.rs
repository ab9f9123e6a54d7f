//! Retry logic utilities for source operations
//!
//! Helpers for exponential backoff and timeout wrapping around batch requests.

use crate::errors::{SourceError, SourceResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Backoff and timeout settings for batch requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_seconds: 10,
        }
    }
}

/// Calculate next backoff duration using exponential backoff with a maximum cap
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use traffic_history::source::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

/// Run a source operation under a timeout
///
/// An elapsed timeout becomes [`SourceError::Timeout`]; the operation's own
/// error passes through unchanged.
pub async fn execute_with_timeout<T, F>(
    timeout_seconds: u64,
    operation: &str,
    future: F,
) -> SourceResult<T>
where
    F: Future<Output = SourceResult<T>>,
{
    match timeout(Duration::from_secs(timeout_seconds), future).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            timeout_seconds,
            operation: operation.to_string(),
        }),
    }
}

/// Retry `make_request` with exponential backoff until it succeeds or retries run out
///
/// Missing streams are not retried.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut make_request: F,
) -> SourceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let mut backoff = Duration::from_millis(config.initial_backoff_ms);
    let mut attempt = 0;

    loop {
        match execute_with_timeout(config.timeout_seconds, operation, make_request()).await {
            Ok(value) => return Ok(value),
            Err(e @ SourceError::StreamNotFound { .. }) => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt > config.max_retries {
                    warn!("{} failed after {} attempts: {}", operation, attempt, e);
                    return Err(SourceError::MaxRetriesExceeded {
                        operation: operation.to_string(),
                    });
                }
                debug!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation, attempt, config.max_retries, backoff, e
                );
                sleep(backoff).await;
                backoff = calculate_next_backoff(
                    backoff,
                    config.backoff_multiplier,
                    config.max_backoff_seconds,
                );
            }
        }
    }
}
