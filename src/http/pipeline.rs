//! Guard stages wrapped around protected routes.
//!
//! # Stages
//! ```text
//! request
//!     → PanicGuard (catch panics from everything inside, answer 500)
//!     → RateLimit  (client key → token bucket, 429 on empty bucket)
//!     → handler
//! ```
//!
//! Stages are listed outermost first. Any stage may answer on its own; the
//! handler only runs when every stage lets the request through.

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::observability::Metrics;
use crate::security::{rate_limit_middleware, RateLimiterRegistry};

/// A named cross-cutting behavior applied around a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStage {
    /// Convert panics into a generic 500 and keep serving.
    PanicGuard,
    /// Per-client token bucket admission.
    RateLimit,
}

/// Ordered guard stages plus the shared components they consult.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    stages: Vec<GuardStage>,
    registry: Arc<RateLimiterRegistry>,
    metrics: Arc<Metrics>,
}

impl RequestPipeline {
    /// Stages protecting the balance route, outermost first.
    pub const BALANCE_STAGES: [GuardStage; 2] = [GuardStage::PanicGuard, GuardStage::RateLimit];

    pub fn new(
        stages: impl Into<Vec<GuardStage>>,
        registry: Arc<RateLimiterRegistry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            stages: stages.into(),
            registry,
            metrics,
        }
    }

    /// The pipeline used for `/eth/balance`.
    pub fn for_balance(registry: Arc<RateLimiterRegistry>, metrics: Arc<Metrics>) -> Self {
        Self::new(Self::BALANCE_STAGES, registry, metrics)
    }

    pub fn stages(&self) -> &[GuardStage] {
        &self.stages
    }

    /// Wrap every route in `router` with the stages.
    ///
    /// Each `route_layer` call wraps the previous ones, so stages are applied
    /// innermost first to end up in listed order.
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| match stage {
                GuardStage::PanicGuard => {
                    let metrics = self.metrics.clone();
                    router.route_layer(CatchPanicLayer::custom(
                        move |panic: Box<dyn Any + Send + 'static>| {
                            recovered_panic_response(&metrics, panic)
                        },
                    ))
                }
                GuardStage::RateLimit => router.route_layer(middleware::from_fn_with_state(
                    self.registry.clone(),
                    rate_limit_middleware,
                )),
            })
    }
}

fn recovered_panic_response(metrics: &Metrics, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };

    tracing::error!(panic = %detail, "Recovered from panic while handling request");
    metrics.record_panic();
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
