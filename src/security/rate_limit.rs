//! Per-client rate limiting.
//!
//! Each client key gets its own token bucket, created on first sight with the
//! registry-wide rate and burst. Buckets are never evicted: memory grows with
//! the number of distinct clients, which is fine for long-lived deployments
//! with a modest client population.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::Metrics;

/// Identity a caller is rate limited under: the IP of its socket address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for ClientKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.ip().to_string())
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket that refills continuously.
#[derive(Debug)]
pub struct TokenBucket {
    /// Tokens added per second.
    rate: f64,
    /// Maximum tokens held.
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(rate: f64, burst: u32) -> Self {
        let capacity = f64::from(burst);
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token if a whole one is available.
    pub fn try_acquire(&self) -> bool {
        // The state is valid after any partial update, so a poisoned lock is
        // still usable.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();

        // Refill tokens
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Concurrent map from client key to that client's bucket.
pub struct RateLimiterRegistry {
    limiters: DashMap<ClientKey, Arc<TokenBucket>>,
    rate: f64,
    burst: u32,
    metrics: Arc<Metrics>,
}

impl RateLimiterRegistry {
    pub fn new(rate: f64, burst: u32, metrics: Arc<Metrics>) -> Self {
        Self {
            limiters: DashMap::new(),
            rate,
            burst,
            metrics,
        }
    }

    pub fn from_config(config: &RateLimitConfig, metrics: Arc<Metrics>) -> Self {
        Self::new(config.rate, config.burst, metrics)
    }

    /// Consume one token from `key`'s bucket, creating the bucket if needed.
    ///
    /// Only the map lookup or insertion holds a shard lock; the token check
    /// runs under the bucket's own lock so unrelated keys do not queue behind
    /// each other.
    pub fn admit(&self, key: &ClientKey) -> bool {
        let admitted = self.limiter(key).try_acquire();
        if !admitted {
            self.metrics.record_rate_limited();
        }
        admitted
    }

    fn limiter(&self, key: &ClientKey) -> Arc<TokenBucket> {
        if let Some(existing) = self.limiters.get(key) {
            return existing.value().clone();
        }

        let mut created = false;
        let limiter = self
            .limiters
            .entry(key.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(TokenBucket::new(self.rate, self.burst))
            })
            .value()
            .clone();

        if created {
            tracing::debug!(client = %key, "Created rate limiter");
            self.metrics.record_tracked_client();
        }
        limiter
    }

    /// Number of distinct client keys seen so far.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl fmt::Debug for RateLimiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterRegistry")
            .field("clients", &self.limiters.len())
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish()
    }
}

/// Middleware admitting a request only if its client still has a token.
///
/// Expects the server to be started with connect info; without a socket
/// address there is no key, and the request fails with 500.
pub async fn rate_limit_middleware(
    State(registry): State<Arc<RateLimiterRegistry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => ClientKey::from(*addr),
        None => {
            tracing::error!("Client address unavailable, cannot apply rate limit");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    if registry.admit(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
    }
}
