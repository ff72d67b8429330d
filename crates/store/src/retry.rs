//! Bounded retry with exponential backoff for write transactions.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// How many times to try an operation and how long to wait in between.
///
/// The wait before attempt `n + 1` is `base_delay * 2^(n - 1)`: with the
/// defaults that is 100 ms, then 200 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}
impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// The operation failed on its final attempt, or with an error not worth
/// retrying.
#[derive(Debug)]
pub(crate) struct GaveUp<E> {
    pub last_error: E,
    pub attempts: u32,
}

/// Run `op` until it succeeds, `should_retry` rejects its error, or the
/// policy's attempts are exhausted. `op` receives the 1-based attempt number.
pub(crate) async fn with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    should_retry: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, GaveUp<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Debug,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts || !should_retry(&error) => {
                return Err(GaveUp { last_error: error, attempts: attempt });
            },
            Err(error) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    ?error,
                    "Attempt failed; retrying"
                );
                sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
