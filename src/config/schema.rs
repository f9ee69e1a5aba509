//! Configuration schema definitions.
//!
//! Every setting is read from an environment variable, with an equivalent
//! command-line flag taking precedence. Sections are flattened into the root
//! `ServiceConfig` so the whole service is configured in one place.

use clap::{Args, Parser, ValueEnum};
use serde::Serialize;

/// Root configuration for the balance proxy.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "eth-proxy")]
#[command(about = "Rate-limited HTTP façade for Ethereum balance queries", long_about = None)]
pub struct ServiceConfig {
    /// Upstream JSON-RPC node.
    #[command(flatten)]
    pub upstream: UpstreamConfig,

    /// Retry behavior for balance lookups.
    #[command(flatten)]
    pub retries: RetryConfig,

    /// Per-client rate limiting.
    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    /// HTTP listener settings.
    #[command(flatten)]
    pub listener: ListenerConfig,

    /// Logging settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,
}

/// Upstream node configuration.
#[derive(Debug, Clone, Args, Serialize)]
pub struct UpstreamConfig {
    /// JSON-RPC endpoint URL of the Ethereum node.
    #[arg(long = "eth-network-url", env = "ETH_NETWORK_URL")]
    pub network_url: String,

    /// Timeout for a single RPC call, in seconds. All attempts of a balance
    /// lookup, with their backoff, must fit inside HTTP_TIMEOUT.
    #[arg(long = "rpc-timeout", env = "RPC_TIMEOUT", default_value_t = 3)]
    pub rpc_timeout_secs: u64,
}

/// Retry configuration for balance lookups.
#[derive(Debug, Clone, Args, Serialize)]
pub struct RetryConfig {
    /// Total attempts per balance lookup (must be at least 1).
    #[arg(long, env = "CLIENT_RETRIES", default_value_t = 3)]
    pub client_retries: u32,

    /// Delay after the first failure, in seconds. Doubles per failure.
    #[arg(long, env = "CLIENT_RETRY_DELAY", default_value_t = 1.0)]
    pub client_retry_delay: f64,

    /// Ceiling for the backoff delay, in seconds.
    #[arg(long, env = "CLIENT_RETRY_MAX_DELAY", default_value_t = 30.0)]
    pub client_retry_max_delay: f64,
}

/// Token bucket settings applied to every client.
#[derive(Debug, Clone, Args, Serialize)]
pub struct RateLimitConfig {
    /// Refill rate in tokens per second.
    #[arg(long = "rate-limit", env = "RATE_LIMIT", default_value_t = 10.0)]
    pub rate: f64,

    /// Bucket capacity (maximum burst).
    #[arg(long = "rate-burst", env = "RATE_BURST", default_value_t = 10)]
    pub burst: u32,
}

/// Listener configuration.
#[derive(Debug, Clone, Args, Serialize)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    #[arg(long = "http-host", env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long = "http-port", env = "HTTP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Whole-request timeout in seconds.
    #[arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value_t = 15)]
    pub timeout_secs: u64,
}

impl ListenerConfig {
    /// Bind address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, for development.
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Args, Serialize)]
pub struct ObservabilityConfig {
    /// Default log filter when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Configuration for tests and embedding: defaults everywhere except the
    /// upstream URL, which has none.
    pub fn with_network_url(network_url: impl Into<String>) -> Self {
        Self {
            upstream: UpstreamConfig {
                network_url: network_url.into(),
                rpc_timeout_secs: 3,
            },
            retries: RetryConfig {
                client_retries: 3,
                client_retry_delay: 1.0,
                client_retry_max_delay: 30.0,
            },
            rate_limit: RateLimitConfig {
                rate: 10.0,
                burst: 10,
            },
            listener: ListenerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                timeout_secs: 15,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: LogFormat::Json,
            },
        }
    }
}
