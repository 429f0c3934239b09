pub mod health;
pub mod network;
pub mod papers;
pub mod validate;

use crate::errors::AppError;
use crate::metrics;
use crate::services::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let (prometheus_layer, metrics_router) = metrics::setup_metrics();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/validate-doi", post(validate::validate_doi))
        .route("/generate-network", post(network::generate_network))
        .route("/networks", get(network::list_networks))
        .route("/paper/{id}", get(papers::get_paper))
        .with_state(state.clone());

    let health_routes = Router::new().route("/health", get(health::health_check));

    // The request timeout is the caller-side latency bound: the engine
    // itself never cancels a stalled upstream branch.
    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_router)
        .layer(
            ServiceBuilder::new()
                // Prometheus metrics (outermost - captures all requests)
                .layer(prometheus_layer)
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                // Request ID propagation
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(state.config.request_timeout()))
                // Concurrency limit for backpressure
                .layer(ConcurrencyLimitLayer::new(
                    state.config.server.max_concurrent_requests,
                )),
        )
}

/// Extract the required `doi` field from a JSON body.
///
/// Decoded by hand from `serde_json::Value` so that a missing or non-string
/// `doi` is our 400, not a framework rejection.
pub(crate) fn require_doi(body: &serde_json::Value) -> Result<&str, AppError> {
    let value = body
        .get("doi")
        .ok_or_else(|| AppError::MissingField("doi".into()))?;
    value
        .as_str()
        .ok_or_else(|| AppError::InvalidFormat("doi must be a string".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_doi() {
        assert_eq!(require_doi(&json!({"doi": "10.1/x"})).unwrap(), "10.1/x");
        assert!(matches!(
            require_doi(&json!({})),
            Err(AppError::MissingField(_))
        ));
        assert!(matches!(
            require_doi(&json!({"doi": 42})),
            Err(AppError::InvalidFormat(_))
        ));
        assert!(matches!(
            require_doi(&json!({"doi": null})),
            Err(AppError::InvalidFormat(_))
        ));
    }
}
