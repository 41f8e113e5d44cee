//! Bounded retry with a fixed delay between attempts.
//!
//! The same policy wraps the state store and the feed, so tests can swap in
//! a zero-delay policy without touching call sites.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between two attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Retry policy: at most `max_attempts` tries, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy without any delay (for tests).
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up. Sleeps `delay` between attempts, never after
    /// the last one.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        label: &str,
        mut op: F,
        is_transient: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display + fmt::Debug,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !is_transient(&e) => {
                    return Err(RetryError::Permanent(e));
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(
                        operation = label,
                        attempts = attempt,
                        error = %e,
                        "Giving up"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Attempt failed, retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Failure of a retried operation.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: fmt::Display + fmt::Debug> {
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    Permanent(E),
}
