//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming balance request:
//!     → rate_limit.rs (derive client key from socket address, take a token)
//!     → Pass to handler, or 429 without touching the upstream
//! ```
//!
//! # Design Decisions
//! - One bucket per client IP, uniform rate and burst
//! - Fail closed: no client address means no admission

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, ClientKey, RateLimiterRegistry, TokenBucket};
