//! Retry with exponential backoff
//!
//! A single parameterized retry utility used by every API call: maximum attempt
//! count, base delay, and a predicate deciding which errors are worth retrying.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default number of attempts for one logical fetch
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay after the first failed attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each later one
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

/// One planned attempt of a retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub attempt_number: u32,
    /// Backoff to sleep if this attempt fails; `None` for the final attempt
    pub delay_before_next: Option<Duration>,
}

impl RetryPolicy {
    /// A policy that tries exactly once
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Attempts actually made; a zero budget still runs the operation once
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// The full attempt plan for this policy
    pub fn schedule(&self) -> Vec<RetryAttempt> {
        let attempts = self.attempts();
        (1..=attempts)
            .map(|attempt_number| RetryAttempt {
                attempt_number,
                delay_before_next: (attempt_number < attempts)
                    .then(|| self.backoff_after(attempt_number)),
            })
            .collect()
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent
///
/// Every failure is logged with the operation name, attempt count and error.
/// Only errors for which `is_retryable` returns `true` consume a backoff sleep;
/// anything else is returned immediately.
pub async fn retry<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let retryable = is_retryable(&error);
        if !retryable || attempt >= max_attempts {
            warn!(
                operation,
                attempt,
                max_attempts,
                retryable,
                error = %error,
                "giving up"
            );
            return Err(error);
        }

        let delay = policy.backoff_after(attempt);
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
