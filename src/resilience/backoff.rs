//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the delay to wait after failed attempt number `attempt` (1-based).
///
/// The delay is `base * 2^(attempt - 1)`, capped at `max`, plus up to 10% jitter
/// on top. Jitter never pulls the delay below the un-jittered value.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped_delay = capped_backoff(attempt, base, max);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = u64::try_from(capped_delay.as_millis() / 10).unwrap_or(u64::MAX);
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped_delay.saturating_add(Duration::from_millis(jitter))
}

/// Largest delay `calculate_backoff` can return for `attempt`.
pub fn max_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped_delay = capped_backoff(attempt, base, max);
    capped_delay.saturating_add(capped_delay / 10)
}

fn capped_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(exponential_base).min(max)
}
