//! Search orchestration.
//!
//! Ask upstream under a deadline. A fresh answer is returned at once and
//! written to the cache in the background; a failed or late one falls back to
//! the last answer cached for the same query. Upstream rejections are passed
//! through untouched, and a caller that went away gets nothing at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use places_core::{
    Answer, CacheStore, Place, RequestContext, Requester, SearchError, SearchParams,
    SearchResult, Searcher,
};
use tracing::Instrument;

use crate::config::ApiConfig;
use crate::telemetry::Logger;

/// Every bound a search applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTimeouts {
    /// Upstream call.
    pub search: Duration,
    /// Fallback cache read.
    pub cache_read: Duration,
    /// Detached cache write, measured from when it starts.
    pub cache_write: Duration,
}

impl Default for SearchTimeouts {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(3),
            cache_read: Duration::from_secs(1),
            cache_write: Duration::from_secs(5),
        }
    }
}

impl From<&ApiConfig> for SearchTimeouts {
    fn from(config: &ApiConfig) -> Self {
        Self {
            search: config.search_timeout,
            cache_read: config.cache_read_timeout,
            cache_write: config.cache_write_timeout,
        }
    }
}

pub struct SearchService<R, C> {
    requester: R,
    cache: Arc<C>,
    logger: Logger,
    timeouts: SearchTimeouts,
}

impl<R, C> SearchService<R, C>
where
    R: Requester,
    C: CacheStore + 'static,
{
    pub fn new(requester: R, cache: Arc<C>, logger: Logger) -> Self {
        Self {
            requester,
            cache,
            logger,
            timeouts: SearchTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: SearchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Write `places` for `params` on a task of its own. The write gets its
    /// own deadline and does not observe the caller's cancellation.
    fn spawn_cache_write(&self, params: &SearchParams, places: &[Place]) {
        let cache = Arc::clone(&self.cache);
        let logger = self.logger.clone();
        let params = params.clone();
        let places = places.to_vec();
        let write_ctx = RequestContext::detached(self.timeouts.cache_write);
        let span = self.logger.in_scope(|| tracing::debug_span!("cache.write"));

        tokio::spawn(
            async move {
                let written = write_ctx
                    .run(async {
                        cache
                            .cache(&params, &places)
                            .await
                            .map_err(SearchError::from)
                    })
                    .await;

                if let Err(e) = written {
                    logger.in_scope(|| {
                        tracing::error!(
                            error = %e,
                            term = %params.term,
                            locale = %params.locale,
                            types = %params.types_label(),
                            "cache failed"
                        )
                    });
                }
            }
            .instrument(span),
        );
    }

    async fn fallback(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        let read_ctx = ctx.with_timeout(self.timeouts.cache_read);
        let read = read_ctx
            .run(async { self.cache.retrieve(params).await.map_err(SearchError::from) })
            .await;

        let failure = match read {
            Ok(places) => return Ok(Answer::Cached(places)),
            Err(SearchError::CacheMiss) => {
                self.logger.in_scope(|| {
                    tracing::debug!(term = %params.term, "no cached places, unavailable")
                });
                return Err(SearchError::Unavailable);
            }
            Err(SearchError::Cancelled) if ctx.is_cancelled() => return Ok(Answer::Cancelled),
            Err(e) => e,
        };

        self.logger.in_scope(|| {
            tracing::error!(error = %failure, term = %params.term, "unexpected error on retrieve")
        });
        Err(SearchError::Unavailable)
    }
}

#[async_trait]
impl<R, C> Searcher for SearchService<R, C>
where
    R: Requester,
    C: CacheStore + 'static,
{
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        let bounded = ctx.with_timeout(self.timeouts.search);
        let requested = bounded
            .run(self.requester.request(&bounded, params))
            .await;

        let err = match requested {
            Ok(places) => {
                self.spawn_cache_write(params, &places);
                return Ok(Answer::Fresh(places));
            }
            Err(err) => err,
        };

        if ctx.is_cancelled() {
            return Ok(Answer::Cancelled);
        }

        match err {
            SearchError::DeadlineExceeded => {
                self.logger.in_scope(|| {
                    tracing::debug!(term = %params.term, "request deadline exceeded, falling back to cache")
                });
            }
            SearchError::ClientFault(_) => return Err(err),
            other => {
                self.logger.in_scope(|| {
                    tracing::error!(error = %other, term = %params.term, "unexpected error on request")
                });
            }
        }

        self.fallback(ctx, params).await
    }
}
