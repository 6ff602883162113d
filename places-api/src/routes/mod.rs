//! REST API Routes Module
//!
//! Includes:
//! - Place search (`GET /places`)
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics at `/metrics`
//! - OpenAPI document at `/openapi.json` (feature `openapi`)

pub mod health;
pub mod places;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use places::create_router as places_router;

/// Create the complete API router.
///
/// Layers (outer to inner):
/// 1. Request timeout, answering 408 once `server_timeout` elapses
/// 2. Observability (request span, metrics, completion log)
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let router = Router::new()
        .merge(places_router())
        .nest("/health", health_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(crate::openapi::openapi_json));

    router
        .layer(from_fn_with_state(state.clone(), observability_middleware))
        .layer(TimeoutLayer::new(config.server_timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use places_test_utils::{MemoryCacheStore, MockRequester};
    use tower::ServiceExt;

    use super::*;
    use crate::telemetry::Logger;

    fn router_with(requester: Arc<MockRequester>) -> Router {
        let config = ApiConfig::default();
        let state = AppState::from_parts(
            requester,
            Arc::new(MemoryCacheStore::new()),
            &config,
            Logger::discard(),
        )
        .unwrap();
        create_api_router(state, &config)
    }

    fn router() -> Router {
        router_with(Arc::new(MockRequester::ok(Vec::new())))
    }

    async fn send(router: Router, method: Method, uri: &str) -> Response {
        router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn status_of(method: Method, uri: &str) -> StatusCode {
        send(router(), method, uri).await.status()
    }

    #[tokio::test]
    async fn test_routes_are_mounted() {
        assert_eq!(status_of(Method::GET, "/places").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/health/ping").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/health/live").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/health/ready").await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/metrics").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        assert_eq!(status_of(Method::GET, "/nowhere").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let requester = Arc::new(MockRequester::ok(Vec::new()));

        for method in [Method::HEAD, Method::POST, Method::PUT, Method::DELETE] {
            let response = send(router_with(requester.clone()), method.clone(), "/places").await;
            assert_eq!(
                response.status(),
                StatusCode::METHOD_NOT_ALLOWED,
                "{method} /places"
            );
        }
        assert_eq!(requester.calls(), 0);
    }

    #[tokio::test]
    async fn test_head_is_rejected_with_allow_header() {
        let response = send(router(), Method::HEAD, "/places").await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[cfg(feature = "openapi")]
    #[tokio::test]
    async fn test_openapi_document_is_served() {
        assert_eq!(status_of(Method::GET, "/openapi.json").await, StatusCode::OK);
    }
}
