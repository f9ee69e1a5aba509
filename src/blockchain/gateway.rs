//! Upstream gateway: the only path from request handlers to the node.
//!
//! Balance lookups go through the retry policy. Chain-head lookups are made
//! once, because readiness wants an immediate answer rather than a patient one.

use alloy::primitives::{Address, U256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{GatewayError, GatewayResult};
use crate::observability::Metrics;
use crate::resilience::{retry, RetryPolicy};

/// Shared, read-only handle to the upstream node.
pub struct UpstreamGateway {
    rpc: Arc<dyn ChainRpc>,
    policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl UpstreamGateway {
    pub fn new(rpc: Arc<dyn ChainRpc>, policy: RetryPolicy, metrics: Arc<Metrics>) -> Self {
        Self {
            rpc,
            policy,
            metrics,
        }
    }

    /// Fetch the latest balance of `account`, retrying with backoff.
    pub async fn query_balance(&self, account: Address) -> GatewayResult<U256> {
        let attempt = AtomicU32::new(0);

        retry(&self.policy, "get_balance", || {
            if attempt.fetch_add(1, Ordering::Relaxed) > 0 {
                self.metrics.record_retry("get_balance");
            }
            self.rpc.get_balance(account)
        })
        .await
        .map_err(|e| {
            let err = GatewayError::Exhausted {
                attempts: attempt.load(Ordering::Relaxed),
                source: Box::new(e),
            };
            tracing::error!(account = %account, error = %err, "Failed to get balance");
            err
        })
    }

    /// Fetch the latest block number with a single attempt.
    pub async fn query_chain_head(&self) -> GatewayResult<u64> {
        retry(&RetryPolicy::single_attempt(), "get_block_number", || {
            self.rpc.get_block_number()
        })
        .await
    }
}

impl std::fmt::Debug for UpstreamGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamGateway")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
