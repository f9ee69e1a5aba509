//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → retries.rs (attempt, on failure sleep and try again)
//!     → backoff.rs (delay doubles per failure, capped, jittered)
//! ```
//!
//! # Design Decisions
//! - Every retry is bounded; the final error is always surfaced
//! - Jittered backoff prevents thundering herd against the node
//! - Per-call deadlines live with the RPC client, not here

pub mod backoff;
pub mod retries;

pub use retries::{retry, RetryPolicy};
