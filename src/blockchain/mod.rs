//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → gateway.rs (retry policy around balance lookups)
//!     → client.rs (JSON-RPC call with timeout)
//!     → Ethereum node
//! ```
//!
//! # Constraints
//! - All RPC calls have configurable timeouts
//! - Upstream error detail is logged, never returned to callers
//! - The gateway is immutable after startup and shared by every request

pub mod client;
pub mod gateway;
pub mod types;

pub use client::{ChainRpc, RpcClient};
pub use gateway::UpstreamGateway;
pub use types::{parse_account, GatewayError, GatewayResult, InvalidAddress};
