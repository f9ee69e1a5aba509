//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the upstream node.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0:?}")]
    Timeout(Duration),

    /// Every attempt allowed by the retry policy failed.
    #[error("Gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<GatewayError>,
    },

    /// The configured endpoint URL could not be used.
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Rejected textual account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address '{0}'")]
pub struct InvalidAddress(pub String);

/// Parse a 20-byte account from hex text.
///
/// Accepts an optional `0x`/`0X` prefix followed by exactly 40 hex digits in
/// any case. Mixed-case checksums are not enforced.
pub fn parse_account(text: &str) -> Result<Address, InvalidAddress> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InvalidAddress(text.to_string()));
    }

    digits
        .parse::<Address>()
        .map_err(|_| InvalidAddress(text.to_string()))
}
