//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment variables / CLI flags
//!     → loader.rs (parse via clap)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Everything but the upstream URL has a default
//! - Validation separates syntactic (clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_from, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig, RetryConfig, ServiceConfig,
    UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
