//! Exponential backoff for transient collaborator failures.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use catalog_search_repository::{SearchError, StoreError};

/// Errors that know whether a retry may help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for SearchError {
    fn is_transient(&self) -> bool {
        SearchError::is_transient(self)
    }
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        StoreError::is_transient(self)
    }
}

/// Retry settings shared by the publisher and the full-rebuild page fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying transient failures with exponential backoff.
    ///
    /// Non-transient errors are returned immediately.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay_ms = self.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation = %operation, attempt = attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    debug!(operation = %operation, error = %e, "Non-retryable error encountered");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_retries => {
                    warn!(
                        operation = %operation,
                        attempts = attempt + 1,
                        error = %e,
                        "Giving up after retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    warn!(
                        operation = %operation,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms * 2, self.max_retry_delay_ms);
                }
            }
        }
    }
}
