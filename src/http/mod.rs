//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → pipeline.rs (panic guard → rate limit, balance route only)
//!     → handlers.rs (validate, call the gateway, encode JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod pipeline;
pub mod request;
pub mod server;

pub use handlers::{AppState, BalanceResponse};
pub use pipeline::{GuardStage, RequestPipeline};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, HttpServer, ServerError};
