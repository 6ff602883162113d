//! Shared application state and the wiring that builds it.

use std::sync::Arc;
use std::time::Instant;

use places_core::{CacheStore, Requester, Searcher};
use places_storage::{LmdbCacheStore, MemoryCacheStore};

use crate::config::{ApiConfig, CacheBackend};
use crate::error::{ApiError, ApiResult};
use crate::instrument::instrumented;
use crate::requester::HttpRequester;
use crate::search::{Coalesced, SearchService, SearchTimeouts};
use crate::telemetry::{Logger, PlacesMetrics};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Fully instrumented searcher stack.
    pub searcher: Arc<dyn Searcher>,
    /// The same cache store the searcher falls back to, for readiness checks.
    pub cache: Arc<dyn CacheStore>,
    pub metrics: PlacesMetrics,
    pub logger: Logger,
    pub start_time: Instant,
}

impl AppState {
    /// Production wiring: HTTP requester against the configured upstream and
    /// the configured cache backend.
    pub fn build(config: &ApiConfig, logger: Logger) -> ApiResult<Self> {
        let store: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackend::Lmdb => Arc::new(
                LmdbCacheStore::new(&config.cache_path, config.cache_max_size_mb).map_err(|e| {
                    ApiError::internal_error(format!(
                        "Failed to open cache at {}: {}",
                        config.cache_path.display(),
                        e
                    ))
                })?,
            ),
            CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("places-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;
        let requester = HttpRequester::new(client, config.upstream_url.clone());

        logger.in_scope(|| {
            tracing::info!(
                upstream = requester.endpoint(),
                cache_backend = ?config.cache_backend,
                coalesce = config.coalesce,
                "Search stack configured"
            )
        });

        Self::from_parts(requester, store, config, logger)
    }

    /// Wire the searcher stack around the given requester and store:
    /// logging, tracing, optional coalescing, orchestration.
    pub fn from_parts<R>(
        requester: R,
        store: Arc<dyn CacheStore>,
        config: &ApiConfig,
        logger: Logger,
    ) -> ApiResult<Self>
    where
        R: Requester + 'static,
    {
        let cache = Arc::new(instrumented(store, &logger));
        let service = SearchService::new(instrumented(requester, &logger), cache.clone(), logger.clone())
            .with_timeouts(SearchTimeouts::from(config));

        let searcher: Arc<dyn Searcher> = if config.coalesce {
            Arc::new(instrumented(Coalesced::new(service, logger.clone()), &logger))
        } else {
            Arc::new(instrumented(service, &logger))
        };

        Ok(Self {
            searcher,
            cache,
            metrics: PlacesMetrics::new()?,
            logger,
            start_time: Instant::now(),
        })
    }
}
