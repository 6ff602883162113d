//! Capability traits shared by the orchestrator, its collaborators and the
//! instrumentation wrapped around them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::{SearchResult, StorageResult};
use crate::key::{derive_key, CacheKey};
use crate::place::{Place, SearchParams};

/// Live lookup against the upstream provider.
///
/// Implementations classify their own failures: upstream 400 becomes
/// [`SearchError::ClientFault`](crate::SearchError::ClientFault), transport
/// timeouts and cancellations become `DeadlineExceeded` / `Cancelled` no
/// matter how the transport reports them.
#[async_trait]
pub trait Requester: Send + Sync {
    async fn request(&self, ctx: &RequestContext, params: &SearchParams)
        -> SearchResult<Vec<Place>>;
}

/// Key-value store holding the last good answer per query.
///
/// Stores own serialization; `get(set(k, v)) == v` must hold field for field.
/// Entries never expire.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()>;

    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) on a miss.
    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>>;

    /// Store `places` as the answer for `params`.
    async fn cache(&self, params: &SearchParams, places: &[Place]) -> StorageResult<()> {
        self.set(&derive_key(params), places).await
    }

    /// Fetch the stored answer for `params`.
    async fn retrieve(&self, params: &SearchParams) -> StorageResult<Vec<Place>> {
        self.get(&derive_key(params)).await
    }
}

/// Successful search outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Upstream answered in time.
    Fresh(Vec<Place>),
    /// Upstream failed; this is the last good answer for the query.
    Cached(Vec<Place>),
    /// The caller went away before an answer was ready.
    Cancelled,
}

impl Answer {
    /// Places to hand back to the client; empty for `Cancelled`.
    pub fn places(&self) -> &[Place] {
        match self {
            Answer::Fresh(places) | Answer::Cached(places) => places,
            Answer::Cancelled => &[],
        }
    }

    pub fn into_places(self) -> Vec<Place> {
        match self {
            Answer::Fresh(places) | Answer::Cached(places) => places,
            Answer::Cancelled => Vec::new(),
        }
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Answer::Fresh(_) => "fresh",
            Answer::Cached(_) => "cached",
            Answer::Cancelled => "cancelled",
        }
    }
}

/// The externally visible search capability.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer>;
}

#[async_trait]
impl<T: Requester + ?Sized> Requester for Arc<T> {
    async fn request(
        &self,
        ctx: &RequestContext,
        params: &SearchParams,
    ) -> SearchResult<Vec<Place>> {
        (**self).request(ctx, params).await
    }
}

#[async_trait]
impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        (**self).set(key, places).await
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        (**self).get(key).await
    }
}

#[async_trait]
impl<T: Searcher + ?Sized> Searcher for Arc<T> {
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        (**self).search(ctx, params).await
    }
}
