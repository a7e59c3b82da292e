//! Explicit retry policy for calls crossing the network boundary.
//!
//! Local operations (hashing, structuring) never retry; embedding, storage,
//! and vector-store calls wrap themselves in [`retry_with_backoff`] with a
//! policy derived from configuration. The retryable-error predicate is
//! supplied by the caller so the policy stays testable independent of any
//! particular transport.

use std::future::Future;
use std::time::Duration;

use crate::config::Config;

/// Backoff parameters applied to a retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each attempt after that.
    pub base_delay: Duration,
    /// Ceiling on the computed backoff delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy used for embedding, storage, and vector-store calls.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.embedding_max_attempts.max(1),
            base_delay: Duration::from_millis(config.embedding_retry_base_ms),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Backoff delay preceding the given attempt (attempts are 1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << exponent);
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `operation` until it succeeds, the error is classified permanent, or
/// the attempt budget is exhausted.
///
/// `is_retryable` inspects the error after each failed attempt; permanent
/// errors are returned immediately without sleeping.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && is_retryable(&error) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure; backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                if attempt >= policy.max_attempts && is_retryable(&error) {
                    tracing::error!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %error,
                        "Retry budget exhausted"
                    );
                }
                return Err(error);
            }
        }
    }
}
