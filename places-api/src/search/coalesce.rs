//! Request coalescing.
//!
//! Concurrent searches for the same cache key share one in-flight search.
//! The shared search runs on its own task with a background context, so it
//! finishes (and fills the cache) even if every caller that joined it leaves.
//! Each caller still stops waiting as soon as its own context is cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use places_core::{
    derive_key, Answer, CacheKey, RequestContext, SearchError, SearchParams, SearchResult,
    Searcher,
};

use crate::telemetry::Logger;

type SharedSearch = Shared<BoxFuture<'static, SearchResult<Answer>>>;
type InFlight = Arc<Mutex<HashMap<CacheKey, SharedSearch>>>;

pub struct Coalesced<S> {
    inner: Arc<S>,
    in_flight: InFlight,
    logger: Logger,
}

impl<S> Coalesced<S>
where
    S: Searcher + 'static,
{
    pub fn new(inner: S, logger: Logger) -> Self {
        Self {
            inner: Arc::new(inner),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            logger,
        }
    }

    /// Number of searches currently shared.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn join_or_start(&self, params: &SearchParams) -> SharedSearch {
        let key = derive_key(params);
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = in_flight.get(&key) {
            self.logger
                .in_scope(|| tracing::debug!(key = %key, "joined in-flight search"));
            return existing.clone();
        }

        let inner = Arc::clone(&self.inner);
        let entries = Arc::clone(&self.in_flight);
        let params = params.clone();
        let entry_key = key.clone();
        let handle = tokio::spawn(async move {
            let _release = Release {
                entries,
                key: entry_key,
            };
            inner.search(&RequestContext::background(), &params).await
        });

        let shared = async move {
            handle.await.unwrap_or_else(|e| {
                Err(SearchError::unexpected(format!("coalesced search: {e}")))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key, shared.clone());
        shared
    }
}

/// Drops the in-flight entry when the shared search ends, including by panic.
struct Release {
    entries: InFlight,
    key: CacheKey,
}

impl Drop for Release {
    fn drop(&mut self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[async_trait]
impl<S> Searcher for Coalesced<S>
where
    S: Searcher + 'static,
{
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        if ctx.is_cancelled() {
            return Ok(Answer::Cancelled);
        }

        let shared = self.join_or_start(params);

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Ok(Answer::Cancelled),
            result = shared => result,
        }
    }
}
