//! Retry logic.
//!
//! # Responsibilities
//! - Execute an async operation up to a bounded number of attempts
//! - Sleep with exponential backoff + jitter between attempts
//! - Log every failed attempt where it happens
//!
//! # Design Decisions
//! - Generic over the operation's output and error, so every upstream call
//!   shares one loop
//! - At least one attempt is always made; a policy of zero attempts is
//!   rejected by config validation and treated as one here
//! - The backoff sleep lives inside the caller's future: dropping the future
//!   (request timeout, client disconnect) abandons the sleep with it

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::{calculate_backoff, max_backoff};

/// Bounded retry policy with capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// A policy that calls the operation exactly once.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Number of attempts actually made, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay)
    }

    /// Longest time `retry` can take when every attempt runs for `per_attempt`
    /// and every backoff draws the largest jitter.
    pub fn worst_case_elapsed(&self, per_attempt: Duration) -> Duration {
        let attempts = self.attempts();
        let mut total = per_attempt.saturating_mul(attempts);

        for attempt in 1..attempts {
            let delay = max_backoff(attempt, self.base_delay, self.max_delay);
            total = total.saturating_add(delay);

            // Once the ceiling (or zero) is reached every later delay is the same.
            if delay.is_zero() || delay == max_backoff(attempt + 1, self.base_delay, self.max_delay) {
                let remaining = attempts - attempt - 1;
                total = total.saturating_add(delay.saturating_mul(remaining));
                break;
            }
        }

        total
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.client_retries,
            Duration::from_secs_f64(config.client_retry_delay),
            Duration::from_secs_f64(config.client_retry_max_delay),
        )
    }
}

/// Run `f` until it succeeds or the policy's attempts are used up.
///
/// Returns the first success, or the error from the final attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation, attempt, "Upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay = ?delay,
                    error = %e,
                    "Upstream call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Upstream call failed, no attempts left"
                );
                return Err(e);
            }
        }
    }
}
