//! Place Search Endpoint
//!
//! `GET /places?term=..&locale=..&types[]=..` answers with a JSON array of
//! places. Other methods get 405 from the router without touching the
//! searcher.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use places_core::{Answer, Place, RequestContext, SearchError, SearchParams};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// One search result as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PlaceResponse {
    /// Place code, e.g. `MOW`
    pub slug: String,
    /// Country for cities, city for airports
    pub subtitle: String,
    /// Display name
    pub title: String,
}

impl From<Place> for PlaceResponse {
    fn from(place: Place) -> Self {
        Self {
            slug: place.identifier,
            subtitle: place.subtitle,
            title: place.title,
        }
    }
}

/// Build search parameters from raw query pairs. The first `term` and
/// `locale` win; every `types[]` is kept in order.
pub fn params_from_query(pairs: Vec<(String, String)>) -> SearchParams {
    let mut term = None;
    let mut locale = None;
    let mut types = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "term" if term.is_none() => term = Some(value),
            "locale" if locale.is_none() => locale = Some(value),
            "types[]" => types.push(value),
            _ => {}
        }
    }

    SearchParams {
        term: term.unwrap_or_default(),
        locale: locale.unwrap_or_default(),
        types,
    }
}

fn outcome_label(result: &Result<Answer, SearchError>) -> &'static str {
    match result {
        Ok(answer) => answer.label(),
        Err(SearchError::ClientFault(_)) => "client_fault",
        Err(SearchError::Unavailable) => "unavailable",
        Err(_) => "error",
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /places - Search places
#[utoipa::path(
    get,
    path = "/places",
    tag = "Places",
    params(
        ("term" = Option<String>, Query, description = "Search term"),
        ("locale" = Option<String>, Query, description = "Result language, e.g. `en`"),
        ("types[]" = Option<Vec<String>>, Query, description = "Place type filters, repeatable"),
    ),
    responses(
        (status = 200, description = "Fresh or cached places", body = Vec<PlaceResponse>),
        (status = 400, description = "Upstream rejected the query", body = ApiError),
        (status = 405, description = "Method not allowed"),
        (status = 500, description = "Unexpected failure", body = ApiError),
        (status = 503, description = "Upstream failed and nothing is cached", body = ApiError),
    ),
)]
pub async fn search_places(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<PlaceResponse>>> {
    let params = params_from_query(pairs);

    // Dropping this future (client disconnect) cancels the search.
    let (ctx, handle) = RequestContext::with_cancel();
    let guard = handle.cancel_on_drop();
    let result = state.searcher.search(&ctx, &params).await;
    guard.disarm();

    state.metrics.record_search_outcome(outcome_label(&result));

    let answer = result.map_err(ApiError::from)?;
    Ok(Json(
        answer
            .into_places()
            .into_iter()
            .map(PlaceResponse::from)
            .collect(),
    ))
}

// ============================================================================
// ROUTER
// ============================================================================

/// `get` also answers HEAD; searches are GET only.
async fn reject_head() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")])
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/places", get(search_places).head(reject_head))
}
