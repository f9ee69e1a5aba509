//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared components (metrics, gateway, rate limiter registry)
//! - Create the Axum Router with all handlers
//! - Wrap the balance route in its guard pipeline
//! - Wire up service-wide middleware (request ID, tracing, timeout)
//! - Serve with connect info until shutdown is signalled

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::{GatewayError, RpcClient, UpstreamGateway};
use crate::config::ServiceConfig;
use crate::http::handlers::{self, AppState};
use crate::http::pipeline::RequestPipeline;
use crate::http::request::{request_id, UuidRequestId};
use crate::observability::Metrics;
use crate::resilience::RetryPolicy;
use crate::security::RateLimiterRegistry;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to initialize upstream client: {0}")]
    Upstream(#[from] GatewayError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the balance proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server talking to the configured node over JSON-RPC.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let metrics = Arc::new(Metrics::new());
        let rpc = Arc::new(RpcClient::new(&config.upstream)?);
        let gateway = Arc::new(UpstreamGateway::new(
            rpc,
            RetryPolicy::from(&config.retries),
            metrics.clone(),
        ));
        let registry = Arc::new(RateLimiterRegistry::from_config(
            &config.rate_limit,
            metrics.clone(),
        ));

        Ok(Self::with_components(config, gateway, registry, metrics))
    }

    /// Create a server from already-built components.
    pub fn with_components(
        config: ServiceConfig,
        gateway: Arc<UpstreamGateway>,
        registry: Arc<RateLimiterRegistry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let pipeline = RequestPipeline::for_balance(registry, metrics.clone());
        let state = AppState { gateway, metrics };
        let router = build_router(
            state,
            &pipeline,
            Duration::from_secs(config.listener.timeout_secs),
        );

        Self { router }
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Only the balance route sits behind the guard pipeline; probes and metrics
/// stay reachable for throttled clients. A request that outlives
/// `request_timeout` is answered with 504: the wait was on the node, not the
/// caller.
pub fn build_router(state: AppState, pipeline: &RequestPipeline, request_timeout: Duration) -> Router {
    let balance = pipeline.wrap(
        Router::<AppState>::new().route("/eth/balance/{address}", get(handlers::get_balance)),
    );

    Router::new()
        .merge(balance)
        .route("/healthy", get(handlers::healthy))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}
