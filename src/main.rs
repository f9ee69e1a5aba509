//! eth-proxy
//!
//! Answers balance and liveness queries against an Ethereum JSON-RPC node,
//! shielding the node with per-client rate limiting and the callers with
//! bounded retries.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────────┐
//!                    │                      ETH PROXY                        │
//!                    │                                                       │
//!  GET /eth/balance  │  ┌──────────┐   ┌────────────┐   ┌──────────────────┐ │
//!  ──────────────────┼─▶│  http    │──▶│  pipeline  │──▶│    blockchain    │─┼──▶ Ethereum
//!                    │  │ server   │   │ panic guard│   │ gateway + retry  │ │    node
//!  ◀─────────────────┼──│          │◀──│ rate limit │◀──│  JSON-RPC client │◀┼───
//!                    │  └──────────┘   └────────────┘   └──────────────────┘ │
//!                    │                                                       │
//!                    │  /healthy  /ready  /metrics (unguarded)               │
//!                    │                                                       │
//!                    │  Cross-cutting: config · observability · lifecycle    │
//!                    └───────────────────────────────────────────────────────┘
//! ```

use eth_proxy::config::load_config;
use eth_proxy::lifecycle::startup;
use eth_proxy::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        Err(eth_proxy::config::ConfigError::Parse(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    init_logging(&config.observability);
    tracing::info!("eth-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
