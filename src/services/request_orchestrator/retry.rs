use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;
use crate::domain::{RequestError, RequestResult};

/// Retry policy with a per-attempt timeout and capped exponential backoff.
///
/// Each attempt races `timeout_ms`; losing the race drops the attempt's
/// future and counts as a transient [`RequestError::Timeout`]. Transient
/// failures are retried up to `max_retries` more times, sleeping
/// `min(initial_backoff_ms * 2^attempt, max_backoff_ms)` in between.
/// Permanent failures (client errors) surface immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first
    max_retries: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
    /// Budget for a single attempt in milliseconds
    timeout_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Example
    /// ```
    /// use perfcore::services::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 1_000, 10_000, 5_000);
    /// assert_eq!(policy.max_retries(), 3);
    /// ```
    pub const fn new(
        max_retries: u32,
        initial_backoff_ms: u64,
        max_backoff_ms: u64,
        timeout_ms: u64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
            timeout_ms,
        }
    }

    #[must_use]
    pub const fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Execute an operation, retrying transient failures.
    ///
    /// Returns the first success, the first permanent error, or the last
    /// error once retries are exhausted.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> RequestResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RequestResult<T>>,
    {
        let mut attempt = 0;

        loop {
            let outcome = match timeout(self.timeout(), operation()).await {
                Ok(result) => result,
                Err(_) => Err(RequestError::Timeout {
                    timeout_ms: self.timeout_ms,
                }),
            };

            match outcome {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                            error = %err,
                            "transient failure, retrying"
                        );

                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if attempt >= self.max_retries && err.is_transient() {
                            warn!("Operation failed after {} attempts: {}", attempt + 1, err);
                        } else {
                            debug!("Permanent error, not retrying: {}", err);
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Calculate exponential backoff duration for a given attempt
    ///
    /// Formula: min(initial_backoff * 2^attempt, max_backoff)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    /// Determine if an error should be retried
    fn should_retry(&self, error: &RequestError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        error.is_transient()
    }
}

impl Default for RetryPolicy {
    /// Three retries, 1s initial backoff capped at 10s, 5s per attempt.
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
            config.timeout_ms,
        )
    }
}
