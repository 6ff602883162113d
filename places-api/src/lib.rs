//! Places API - place search over HTTP with cache fallback
//!
//! Answers `GET /places` from an upstream places provider. Every fresh
//! answer is stored as the last good answer for its query; when the upstream
//! fails or misses its deadline, that stored answer is served instead.
//!
//! The search stack is assembled from small capabilities defined in
//! `places-core`: an HTTP [`requester::HttpRequester`], a cache store from
//! `places-storage`, the [`search::SearchService`] orchestrator, optional
//! request coalescing, and logging/tracing decorators around each of them.

pub mod config;
pub mod error;
pub mod instrument;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod requester;
pub mod routes;
pub mod search;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, CacheBackend};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use instrument::instrumented;
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use requester::HttpRequester;
pub use routes::create_api_router;
pub use search::{Coalesced, SearchService, SearchTimeouts};
pub use state::AppState;
pub use telemetry::{init_telemetry, Logger, PlacesMetrics, Telemetry, TelemetryConfig};
