//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint
//! - Query chain state (balances, latest block number)
//! - Bound every call with a timeout and map failures to `GatewayError`

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{GatewayError, GatewayResult};
use crate::config::UpstreamConfig;

/// The calls the gateway needs from a node.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Balance of `account` at the latest block, in wei.
    async fn get_balance(&self, account: Address) -> GatewayResult<U256>;

    /// Number of the latest block.
    async fn get_block_number(&self) -> GatewayResult<u64>;
}

/// JSON-RPC client over HTTP.
#[derive(Clone)]
pub struct RpcClient {
    provider: Arc<dyn Provider + Send + Sync>,
    rpc_url: String,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl RpcClient {
    /// Create a client for the configured endpoint.
    ///
    /// No connection is made here; HTTP transports connect per request, so an
    /// unreachable node only shows up on the first call.
    pub fn new(config: &UpstreamConfig) -> GatewayResult<Self> {
        let url: url::Url = config
            .network_url
            .parse()
            .map_err(|e: url::ParseError| GatewayError::InvalidUrl {
                url: config.network_url.clone(),
                reason: e.to_string(),
            })?;

        let provider =
            Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;

        tracing::info!(rpc_url = %config.network_url, "Blockchain client initialized");

        Ok(Self {
            provider,
            rpc_url: config.network_url.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_balance(&self, account: Address) -> GatewayResult<U256> {
        match timeout(self.timeout_duration, self.provider.get_balance(account)).await {
            Ok(Ok(balance)) => Ok(balance),
            Ok(Err(e)) => Err(GatewayError::Rpc(format!("failed to get balance: {}", e))),
            Err(_) => Err(GatewayError::Timeout(self.timeout_duration)),
        }
    }

    async fn get_block_number(&self) -> GatewayResult<u64> {
        match timeout(self.timeout_duration, self.provider.get_block_number()).await {
            Ok(Ok(number)) => Ok(number),
            Ok(Err(e)) => Err(GatewayError::Rpc(format!("failed to get block number: {}", e))),
            Err(_) => Err(GatewayError::Timeout(self.timeout_duration)),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("rpc_url", &self.rpc_url)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
