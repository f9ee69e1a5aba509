//! Failure injection tests: real sockets, a mock JSON-RPC node, and the full server.

use alloy::primitives::U256;
use eth_proxy::config::{validate_config, ValidationError};
use eth_proxy::http::BalanceResponse;
use eth_proxy::HttpServer;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;

use common::{
    http_client, spawn_proxy, start_mock_node, start_silent_node, stub_server, test_config, Reply,
    StubNode,
};

const ACCOUNT: &str = "0xfe3b557e8fb62b89f4916b721be55ceb828dbd73";

#[tokio::test]
async fn test_balance_over_json_rpc() {
    // 2^70, beyond u64.
    let node = start_mock_node(|method, _| match method {
        "eth_getBalance" => Reply::Result(json!("0x400000000000000000")),
        "eth_blockNumber" => Reply::Result(json!("0x10")),
        _ => Reply::Error("method not found"),
    })
    .await;

    let proxy = spawn_proxy(HttpServer::new(test_config(node)).unwrap()).await;
    let client = http_client();

    let res = client
        .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: BalanceResponse = res.json().await.unwrap();
    assert_eq!(body.balance, (U256::from(1u64) << 70usize).to_string());
    assert_eq!(body.balance, "1180591620717411303424");

    let res = client.get(proxy.url("/ready")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");

    proxy.stop().await;
}

#[tokio::test]
async fn test_retry_on_failure() {
    let node = start_mock_node(|method, call| match (method, call) {
        ("eth_getBalance", 1) => Reply::Status(503),
        ("eth_getBalance", 2) => Reply::Error("header not found"),
        ("eth_getBalance", _) => Reply::Result(json!("0x64")),
        _ => Reply::Result(json!("0x1")),
    })
    .await;

    let config = test_config(node);
    let base_delay = Duration::from_secs_f64(config.retries.client_retry_delay);
    let proxy = spawn_proxy(HttpServer::new(config).unwrap()).await;

    let start = Instant::now();
    let res = http_client()
        .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200, "Should eventually succeed after retries");
    assert_eq!(res.text().await.unwrap(), r#"{"balance":"100"}"#);
    // Two failures: waited base + 2 * base at least.
    assert!(start.elapsed() >= base_delay * 3);

    let metrics = http_client()
        .get(proxy.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("upstream_retries_total{operation=\"get_balance\"} 2"), "{}", metrics);

    proxy.stop().await;
}

#[tokio::test]
async fn test_exhausted_retries_return_500() {
    let balance_calls = Arc::new(AtomicU32::new(0));
    let seen = balance_calls.clone();
    let node = start_mock_node(move |method, _| {
        if method == "eth_getBalance" {
            seen.fetch_add(1, Ordering::SeqCst);
        }
        Reply::Status(502)
    })
    .await;

    let config = test_config(node);
    let attempts = config.retries.client_retries;
    let proxy = spawn_proxy(HttpServer::new(config).unwrap()).await;

    let res = http_client()
        .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Failed to get balance");
    assert_eq!(balance_calls.load(Ordering::SeqCst), attempts);

    proxy.stop().await;
}

#[tokio::test]
async fn test_hanging_node_exhausts_retries_before_request_timeout() {
    let node = start_silent_node().await;

    let mut config = test_config(node);
    config.upstream.rpc_timeout_secs = 1;
    config.retries.client_retry_delay = 0.1;
    config.listener.timeout_secs = 5;
    assert_eq!(validate_config(&config), Ok(()));

    let proxy = spawn_proxy(HttpServer::new(config).unwrap()).await;
    let client = http_client();

    let start = Instant::now();
    let res = client
        .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Failed to get balance");
    // Three timed-out calls plus 0.1s and 0.2s of backoff.
    assert!(start.elapsed() >= Duration::from_millis(3300));

    let metrics = client.get(proxy.url("/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(
        metrics.contains("eth_balance_requests_total{status=\"failed\"} 1"),
        "{}",
        metrics
    );

    proxy.stop().await;
}

#[tokio::test]
async fn test_request_timeout_is_gateway_timeout() {
    let node = start_silent_node().await;

    // Startup refuses this config; build the server anyway to hit the timeout.
    let mut config = test_config(node);
    config.upstream.rpc_timeout_secs = 1;
    config.retries.client_retry_delay = 0.1;
    config.listener.timeout_secs = 2;
    let errors = validate_config(&config).unwrap_err();
    assert!(matches!(
        errors[..],
        [ValidationError::RetryBudgetExceedsTimeout { timeout_secs: 2, .. }]
    ));

    let proxy = spawn_proxy(HttpServer::new(config).unwrap()).await;

    let start = Instant::now();
    let res = http_client()
        .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    assert!(start.elapsed() < Duration::from_millis(3300));

    proxy.stop().await;
}

#[tokio::test]
async fn test_readiness_follows_node() {
    let node_up = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let up = node_up.clone();
    let node = start_mock_node(move |_, _| {
        if up.load(Ordering::SeqCst) {
            Reply::Result(json!("0x2a"))
        } else {
            Reply::Status(503)
        }
    })
    .await;

    let proxy = spawn_proxy(HttpServer::new(test_config(node)).unwrap()).await;
    let client = http_client();

    assert_eq!(client.get(proxy.url("/ready")).send().await.unwrap().status(), 200);

    node_up.store(false, Ordering::SeqCst);
    let res = client.get(proxy.url("/ready")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service not ready");

    // Liveness does not depend on the node.
    let res = client.get(proxy.url("/healthy")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");

    let metrics = client.get(proxy.url("/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(metrics.contains("upstream_health 0"), "{}", metrics);

    node_up.store(true, Ordering::SeqCst);
    assert_eq!(client.get(proxy.url("/ready")).send().await.unwrap().status(), 200);

    proxy.stop().await;
}

#[tokio::test]
async fn test_unreachable_node_is_not_ready() {
    // Bind and drop to get a port with nothing behind it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let mut config = test_config(dead);
    config.retries.client_retries = 2;
    let proxy = spawn_proxy(HttpServer::new(config).unwrap()).await;
    let client = http_client();

    assert_eq!(client.get(proxy.url("/ready")).send().await.unwrap().status(), 503);
    assert_eq!(
        client
            .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
            .send()
            .await
            .unwrap()
            .status(),
        500
    );

    proxy.stop().await;
}

#[tokio::test]
async fn test_rate_limit_over_socket() {
    let node = Arc::new(StubNode::with_balance(U256::from(1u64)));
    let proxy = spawn_proxy(stub_server(node.clone(), 0.001, 3)).await;
    let client = http_client();
    let url = proxy.url(&format!("/eth/balance/{}", ACCOUNT));

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(client.get(&url).send().await.unwrap().status().as_u16());
    }

    // Each request uses a fresh connection (new port); the key is the IP.
    assert_eq!(statuses, vec![200, 200, 200, 429, 429]);
    assert_eq!(node.balance_calls.load(Ordering::SeqCst), 3);

    proxy.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_share_one_bucket() {
    let node = Arc::new(StubNode::with_balance(U256::from(1u64)));
    let proxy = spawn_proxy(stub_server(node.clone(), 0.001, 10)).await;
    let client = http_client();
    let url = proxy.url(&format!("/eth/balance/{}", ACCOUNT));

    let mut handles = Vec::new();
    for _ in 0..30 {
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            client.get(&url).send().await.unwrap().status().as_u16()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            200 => ok += 1,
            429 => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(limited, 20);

    proxy.stop().await;
}

#[tokio::test]
async fn test_panic_recovery_over_socket() {
    let panicking: alloy::primitives::Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
    let node = StubNode {
        panic_on: Some(panicking),
        ..StubNode::with_balance(U256::from(9u64))
    };
    let proxy = spawn_proxy(stub_server(Arc::new(node), 100.0, 100)).await;
    let client = http_client();

    let res = client
        .get(proxy.url(&format!("/eth/balance/{}", panicking)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Internal Server Error");

    for _ in 0..3 {
        let res = client
            .get(proxy.url(&format!("/eth/balance/{}", ACCOUNT)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), r#"{"balance":"9"}"#);
    }

    proxy.stop().await;
}
