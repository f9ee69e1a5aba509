//! Route handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blockchain::{parse_account, UpstreamGateway};
use crate::observability::{BalanceOutcome, Metrics};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<UpstreamGateway>,
    pub metrics: Arc<Metrics>,
}

/// Body of a successful balance lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Balance in wei, as an exact decimal string.
    pub balance: String,
}

/// Failures a handler answers with. Messages are fixed; detail goes to logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    InvalidAddress,
    BalanceUnavailable,
    NotReady,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidAddress => (StatusCode::BAD_REQUEST, "Invalid address"),
            ApiError::BalanceUnavailable => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get balance"),
            ApiError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "Service not ready"),
        };
        (status, message).into_response()
    }
}

/// `GET /eth/balance/{address}`
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = parse_account(&address).map_err(|_| ApiError::InvalidAddress)?;

    match state.gateway.query_balance(account).await {
        Ok(balance) => {
            state.metrics.record_balance_request(BalanceOutcome::Success);
            Ok(Json(BalanceResponse {
                balance: balance.to_string(),
            }))
        }
        Err(_) => {
            // The gateway has already logged the exhausted attempts.
            state.metrics.record_balance_request(BalanceOutcome::Failed);
            Err(ApiError::BalanceUnavailable)
        }
    }
}

/// `GET /healthy`: the process is up.
pub async fn healthy() -> &'static str {
    "OK"
}

/// `GET /ready`: the upstream node answers.
pub async fn ready(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    match state.gateway.query_chain_head().await {
        Ok(block) => {
            tracing::debug!(block, "Readiness probe succeeded");
            state.metrics.record_upstream_health(true);
            Ok("OK")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get block number");
            state.metrics.record_upstream_health(false);
            Err(ApiError::NotReady)
        }
    }
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_error_responses() {
        let cases = [
            (ApiError::InvalidAddress, StatusCode::BAD_REQUEST, "Invalid address"),
            (ApiError::BalanceUnavailable, StatusCode::INTERNAL_SERVER_ERROR, "Failed to get balance"),
            (ApiError::NotReady, StatusCode::SERVICE_UNAVAILABLE, "Service not ready"),
        ];

        for (error, status, message) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), status);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(body, message.as_bytes());
        }
    }

    #[test]
    fn test_balance_response_shape() {
        let body = serde_json::to_string(&BalanceResponse {
            balance: "100".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"balance":"100"}"#);
    }
}
