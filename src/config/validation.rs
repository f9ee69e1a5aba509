//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Validate value ranges (attempts >= 1, rate > 0, timeouts > 0)
//! - Check the upstream URL is usable before any connection is attempted
//! - Check a failing balance lookup finishes inside the request timeout, so
//!   callers see the lookup's own error rather than a timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::time::Duration;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::resilience::RetryPolicy;

/// Largest accepted backoff setting, in seconds.
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("ETH_NETWORK_URL '{url}' is invalid: {reason}")]
    InvalidNetworkUrl { url: String, reason: String },

    #[error("CLIENT_RETRIES must be at least 1, got {0}")]
    ZeroRetries(u32),

    #[error("{field} must be between 0 and 3600 seconds, got {value}")]
    InvalidDelay { field: &'static str, value: f64 },

    #[error("CLIENT_RETRY_MAX_DELAY ({max}) must not be below CLIENT_RETRY_DELAY ({base})")]
    DelayCeilingBelowBase { base: f64, max: f64 },

    #[error("RATE_LIMIT must be a finite number greater than 0, got {0}")]
    InvalidRate(f64),

    #[error("RATE_BURST must be at least 1, got {0}")]
    ZeroBurst(u32),

    #[error("{0} must be greater than 0 seconds")]
    ZeroTimeout(&'static str),

    #[error(
        "a failing balance lookup can take up to {worst_case:?} (CLIENT_RETRIES x RPC_TIMEOUT plus backoff), \
         which does not fit in HTTP_TIMEOUT ({timeout_secs}s)"
    )]
    RetryBudgetExceedsTimeout { worst_case: Duration, timeout_secs: u64 },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.upstream.network_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidNetworkUrl {
            url: config.upstream.network_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidNetworkUrl {
            url: config.upstream.network_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.upstream.rpc_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("RPC_TIMEOUT"));
    }

    let retries = &config.retries;
    if retries.client_retries == 0 {
        errors.push(ValidationError::ZeroRetries(retries.client_retries));
    }
    let mut retries_ok = retries.client_retries > 0 && config.upstream.rpc_timeout_secs > 0;
    let base_ok = check_delay("CLIENT_RETRY_DELAY", retries.client_retry_delay, &mut errors);
    let max_ok = check_delay("CLIENT_RETRY_MAX_DELAY", retries.client_retry_max_delay, &mut errors);
    if base_ok && max_ok && retries.client_retry_max_delay < retries.client_retry_delay {
        errors.push(ValidationError::DelayCeilingBelowBase {
            base: retries.client_retry_delay,
            max: retries.client_retry_max_delay,
        });
        retries_ok = false;
    }
    retries_ok &= base_ok && max_ok;

    let rate = config.rate_limit.rate;
    if !rate.is_finite() || rate <= 0.0 {
        errors.push(ValidationError::InvalidRate(rate));
    }
    if config.rate_limit.burst == 0 {
        errors.push(ValidationError::ZeroBurst(config.rate_limit.burst));
    }

    if config.listener.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("HTTP_TIMEOUT"));
    } else if retries_ok {
        let policy = RetryPolicy::from(retries);
        let worst_case =
            policy.worst_case_elapsed(Duration::from_secs(config.upstream.rpc_timeout_secs));
        if worst_case >= Duration::from_secs(config.listener.timeout_secs) {
            errors.push(ValidationError::RetryBudgetExceedsTimeout {
                worst_case,
                timeout_secs: config.listener.timeout_secs,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_delay(field: &'static str, value: f64, errors: &mut Vec<ValidationError>) -> bool {
    // Duration::from_secs_f64 panics on negative, NaN or overflowing input.
    if value.is_finite() && (0.0..=MAX_RETRY_DELAY_SECS).contains(&value) {
        true
    } else {
        errors.push(ValidationError::InvalidDelay { field, value });
        false
    }
}
