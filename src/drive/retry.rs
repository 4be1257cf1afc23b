use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Strategy mapping a 1-indexed attempt number to the delay slept before
/// the next attempt.
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Bounded retry executor for remote operations.
///
/// `max_attempts` is the total attempt budget, not the number of retries
/// beyond the first. Only errors carrying a retryable HTTP status are
/// retried; everything else aborts on the first failure.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed inter-attempt delay. Adequate for interactive use; swap the
    /// strategy via [`RetryPolicy::with_backoff`] for anything heavier.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Result<Self> {
        Self::with_backoff(max_attempts, Arc::new(move |_| delay))
    }

    pub fn with_backoff(max_attempts: u32, backoff: Backoff) -> Result<Self> {
        if max_attempts < 1 {
            return Err(Error::InvalidRetryBound {
                value: max_attempts.to_string(),
            });
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. `context` is the logical operation
    /// name used only in error messages and logs.
    pub async fn execute<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(Error::Operation {
                    context: context.to_string(),
                    source: Box::new(error),
                });
            }

            if attempt >= self.max_attempts {
                return Err(Error::RetriesExhausted {
                    context: context.to_string(),
                    attempts: self.max_attempts,
                    source: Box::new(error),
                });
            }

            let delay = (self.backoff)(attempt);
            log::warn!(
                "{context} failed with status {:?} (attempt {attempt}/{}), retrying in {}ms",
                error.status(),
                self.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}
