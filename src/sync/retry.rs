//! Bounded retry with exponential backoff for propagation writes.

use crate::store::StoreError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry tuning for the denormalized-copy writes.
///
/// Only propagation steps are retried; the conflict-check read never is,
/// since re-reading a stale list does not change the outcome.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts (grows exponentially).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Calculates the delay before the next attempt with exponential
    /// backoff and jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        // Exponential backoff: base * 2^min(attempt-1, 5)
        let exponential = base * 2u64.pow(attempt.saturating_sub(1).min(5));
        // Cap at 10 seconds
        let capped = exponential.min(10_000);
        // Add jitter: 0-20% of the delay
        let jitter = rand::thread_rng().gen_range(0..=(capped / 5));
        Duration::from_millis(capped + jitter)
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or
/// exhausts the policy's attempts. Returns the last error on exhaustion.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "store write failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
