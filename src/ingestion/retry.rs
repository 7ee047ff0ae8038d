use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Errors that may succeed if the same operation is attempted again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff without jitter: attempt `i` (0-based) that fails with
/// a retryable error waits `base_delay * 2^i` before the next try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn delay_for(&self, retry_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry_index))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Every retryable failure is followed by its
    /// backoff delay, including the last one, so three rate-limited attempts
    /// sleep 0.5s, 1s and 2s before the final error is returned.
    ///
    /// `op` receives the 0-based attempt index.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable failure, backing off"
                    );
                    sleep(delay).await;

                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
