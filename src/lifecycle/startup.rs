//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and begin accepting traffic
//! - Hook OS signals up to graceful shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when everything is built)

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;

/// Build the server from `config` and serve until SIGINT or SIGTERM.
pub async fn run(config: ServiceConfig) -> Result<(), ServerError> {
    match serde_json::to_string(&config) {
        Ok(effective) => tracing::info!(config = %effective, "Configuration loaded"),
        Err(e) => tracing::warn!(error = %e, "Could not serialize configuration for logging"),
    }

    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "The service is ready to listen and serve");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await
}
