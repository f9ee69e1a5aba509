//! Shared utilities for integration testing.

#![allow(dead_code)]

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use eth_proxy::blockchain::{ChainRpc, GatewayError, GatewayResult, UpstreamGateway};
use eth_proxy::observability::Metrics;
use eth_proxy::resilience::RetryPolicy;
use eth_proxy::security::RateLimiterRegistry;
use eth_proxy::{HttpServer, ServiceConfig, Shutdown};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// What the mock node answers to one JSON-RPC call.
pub enum Reply {
    /// A successful `result`.
    Result(Value),
    /// A JSON-RPC `error` object.
    Error(&'static str),
    /// A bare HTTP status with no JSON-RPC body.
    Status(u16),
}

/// Start a programmable JSON-RPC node. `f` receives the method name and the
/// 1-based count of calls made so far to that method.
pub async fn start_mock_node<F>(f: F) -> SocketAddr
where
    F: Fn(&str, u32) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let f = Arc::new(f);
    let balance_calls = Arc::new(AtomicU32::new(0));
    let head_calls = Arc::new(AtomicU32::new(0));
    let other_calls = Arc::new(AtomicU32::new(0));

    let app = Router::new().route(
        "/",
        post(move |Json(request): Json<Value>| {
            let f = f.clone();
            let balance_calls = balance_calls.clone();
            let head_calls = head_calls.clone();
            let other_calls = other_calls.clone();
            async move {
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let counter = match method.as_str() {
                    "eth_getBalance" => balance_calls,
                    "eth_blockNumber" => head_calls,
                    _ => other_calls,
                };
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let id = request["id"].clone();

                match f(&method, call) {
                    Reply::Result(result) => {
                        Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
                    }
                    Reply::Error(message) => Json(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32000, "message": message },
                    }))
                    .into_response(),
                    Reply::Status(status) => (
                        StatusCode::from_u16(status).unwrap(),
                        "node unavailable",
                    )
                        .into_response(),
                }
            }
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Start a node that accepts connections and never answers.
pub async fn start_silent_node() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// Config pointing at `node` with fast retries.
pub fn test_config(node: SocketAddr) -> ServiceConfig {
    let mut config = ServiceConfig::with_network_url(format!("http://{}", node));
    config.upstream.rpc_timeout_secs = 2;
    config.retries.client_retries = 3;
    config.retries.client_retry_delay = 0.05;
    config.retries.client_retry_max_delay = 1.0;
    config
}

/// A running proxy and the handle that stops it.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<()>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not shut down")
            .unwrap();
    }
}

/// Serve `server` on an ephemeral local port.
pub async fn spawn_proxy(server: HttpServer) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    RunningProxy { addr, shutdown, task }
}

/// Client that never reuses connections, so each request is independent.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// In-process node double for tests that bypass JSON-RPC entirely.
pub struct StubNode {
    pub balance: U256,
    pub fail: bool,
    /// Panic when asked for this account's balance.
    pub panic_on: Option<Address>,
    pub balance_calls: AtomicU32,
}

impl StubNode {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            fail: false,
            panic_on: None,
            balance_calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_balance(U256::ZERO)
        }
    }
}

#[async_trait]
impl ChainRpc for StubNode {
    async fn get_balance(&self, account: Address) -> GatewayResult<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on == Some(account) {
            panic!("stub node asked to panic for {}", account);
        }
        if self.fail {
            return Err(GatewayError::Rpc("client error".into()));
        }
        Ok(self.balance)
    }

    async fn get_block_number(&self) -> GatewayResult<u64> {
        if self.fail {
            return Err(GatewayError::Rpc("client error".into()));
        }
        Ok(0)
    }
}

/// Build a server around `node` with the given limiter settings.
pub fn stub_server(node: Arc<StubNode>, rate: f64, burst: u32) -> HttpServer {
    let metrics = Arc::new(Metrics::new());
    let gateway = Arc::new(UpstreamGateway::new(
        node,
        RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(50)),
        metrics.clone(),
    ));
    let registry = Arc::new(RateLimiterRegistry::new(rate, burst, metrics.clone()));
    HttpServer::with_components(
        ServiceConfig::with_network_url("http://127.0.0.1:8545"),
        gateway,
        registry,
        metrics,
    )
}
