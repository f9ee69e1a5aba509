//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (balance outcomes, throttling, retries, panics)
//! - Render them in Prometheus text format for `/metrics`
//! - Track upstream health as seen by the readiness probe
//!
//! # Metrics
//! - `eth_balance_requests_total` (counter): balance requests by status
//! - `rate_limited_requests_total` (counter): requests rejected with 429
//! - `upstream_retries_total` (counter): extra attempts by operation
//! - `recovered_panics_total` (counter): panics converted into 500s
//! - `upstream_health` (gauge): 1=healthy, 0=unhealthy
//! - `rate_limiter_tracked_clients` (gauge): distinct client keys seen
//!
//! # Design Decisions
//! - The collector owns its own recorder and is passed to components, so no
//!   global recorder is installed and tests stay isolated
//! - Low-overhead metric updates (atomic operations)

use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Outcome label for `eth_balance_requests_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOutcome {
    Success,
    Failed,
}

impl BalanceOutcome {
    fn as_str(self) -> &'static str {
        match self {
            BalanceOutcome::Success => "success",
            BalanceOutcome::Failed => "failed",
        }
    }
}

/// Injected metrics collector backed by a private Prometheus recorder.
pub struct Metrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(
                "eth_balance_requests_total",
                "Total number of requests to /eth/balance"
            );
            describe_counter!(
                "rate_limited_requests_total",
                "Requests rejected by the per-client rate limiter"
            );
            describe_counter!(
                "upstream_retries_total",
                "Upstream calls repeated after a failure"
            );
            describe_counter!(
                "recovered_panics_total",
                "Panics caught while producing a response"
            );
            describe_gauge!("upstream_health", "1 if the upstream node answered the last readiness probe");
            describe_gauge!(
                "rate_limiter_tracked_clients",
                "Distinct client keys held by the rate limiter"
            );
        });

        Self { recorder, handle }
    }

    pub fn record_balance_request(&self, outcome: BalanceOutcome) {
        with_local_recorder(&self.recorder, || {
            counter!("eth_balance_requests_total", "status" => outcome.as_str()).increment(1);
        });
    }

    pub fn record_rate_limited(&self) {
        with_local_recorder(&self.recorder, || {
            counter!("rate_limited_requests_total").increment(1);
        });
    }

    pub fn record_retry(&self, operation: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!("upstream_retries_total", "operation" => operation).increment(1);
        });
    }

    pub fn record_panic(&self) {
        with_local_recorder(&self.recorder, || {
            counter!("recovered_panics_total").increment(1);
        });
    }

    pub fn record_upstream_health(&self, healthy: bool) {
        with_local_recorder(&self.recorder, || {
            gauge!("upstream_health").set(if healthy { 1.0 } else { 0.0 });
        });
    }

    /// Count one more distinct client key. Increments commute, so concurrent
    /// inserts cannot leave a stale total behind.
    pub fn record_tracked_client(&self) {
        with_local_recorder(&self.recorder, || {
            gauge!("rate_limiter_tracked_clients").increment(1.0);
        });
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
