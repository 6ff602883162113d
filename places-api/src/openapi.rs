//! OpenAPI Specification for the Places API
//!
//! Generated from the route annotations and response types with utoipa.

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{health, places};
use crate::routes::places::PlaceResponse;

/// OpenAPI document for the Places API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Places API",
        description = "Place search with last-known-good cache fallback"
    ),
    tags(
        (name = "Places", description = "Place search"),
        (name = "Health", description = "Liveness and readiness checks")
    ),
    paths(
        places::search_places,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        PlaceResponse,
        ApiError,
        ErrorCode,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

/// Handler for /openapi.json endpoint.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
