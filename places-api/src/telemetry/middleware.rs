//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a server span (parented on an incoming W3C
//! `traceparent` header, if any), records Prometheus metrics and logs the
//! completed request through the injected logger.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::{propagation::TextMapPropagator, Context};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::{field::Empty, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::state::AppState;

/// Route label for requests no route matched. Keeps label cardinality bounded.
const UNMATCHED_ROUTE: &str = "unmatched";

fn extract_trace_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Observability middleware for Axum.
pub async fn observability_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&request);
    let parent_context = extract_trace_context(request.headers());

    let span = state.logger.in_scope(|| {
        tracing::info_span!(
            "http_request",
            http.method = %method,
            http.target = %path,
            http.route = %route,
            http.status_code = Empty,
            otel.kind = "server",
            otel.status_code = Empty,
        )
    });
    let _ = span.set_parent(parent_context);

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();

    state.metrics.record_http_request(
        method.as_str(),
        &route,
        status.as_u16(),
        duration.as_secs_f64(),
    );

    span.record("http.status_code", status.as_u16());
    span.record(
        "otel.status_code",
        if status.is_server_error() { "ERROR" } else { "OK" },
    );

    state.logger.in_scope(|| {
        let _entered = span.enter();
        tracing::info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request completed"
        );
    });

    response
}
