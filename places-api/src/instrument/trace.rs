//! Span-per-call decorator.
//!
//! Each call opens a span named after the stage it wraps and, once the call
//! returns, records `otel.status_code` (plus `otel.status_message` on failure)
//! which the tracing-opentelemetry layer maps onto the exported span status.
//! Expected outcomes (caller gone, deadline hit, cache miss, unavailable) are
//! not failures.

use std::fmt::Display;

use async_trait::async_trait;
use places_core::{
    Answer, CacheKey, CacheStore, Classify, Place, RequestContext, Requester, SearchParams,
    SearchResult, Searcher, StorageResult,
};
use tracing::{field::Empty, Instrument, Span};

use crate::telemetry::Logger;

pub struct Traced<T> {
    inner: T,
    logger: Logger,
}

impl<T> Traced<T> {
    pub fn new(inner: T, logger: Logger) -> Self {
        Self { inner, logger }
    }
}

/// Span over a cache operation, attributed with the key.
macro_rules! key_span {
    ($logger:expr, $name:literal, $key:expr) => {
        $logger.in_scope(|| {
            tracing::info_span!(
                $name,
                cache.key = %$key,
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        })
    };
}

fn record_status<V, E>(span: &Span, result: &Result<V, E>)
where
    E: Classify + Display,
{
    match result {
        Err(err) if !err.is_expected() => {
            span.record("otel.status_code", "ERROR");
            span.record("otel.status_message", err.to_string().as_str());
        }
        _ => {
            span.record("otel.status_code", "OK");
        }
    }
}

#[async_trait]
impl<T: Requester> Requester for Traced<T> {
    async fn request(
        &self,
        ctx: &RequestContext,
        params: &SearchParams,
    ) -> SearchResult<Vec<Place>> {
        let span = self.logger.in_scope(|| {
            tracing::info_span!(
                "requester.request",
                term = %params.term,
                locale = %params.locale,
                types = %params.types_label(),
                otel.kind = "client",
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });
        let result = self
            .inner
            .request(ctx, params)
            .instrument(span.clone())
            .await;
        record_status(&span, &result);
        result
    }
}

#[async_trait]
impl<T: CacheStore> CacheStore for Traced<T> {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        let span = key_span!(self.logger, "cache.set", key);
        let result = self.inner.set(key, places).instrument(span.clone()).await;
        record_status(&span, &result);
        result
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        let span = key_span!(self.logger, "cache.get", key);
        let result = self.inner.get(key).instrument(span.clone()).await;
        record_status(&span, &result);
        result
    }
}

#[async_trait]
impl<T: Searcher> Searcher for Traced<T> {
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        let span = self.logger.in_scope(|| {
            tracing::info_span!(
                "search.service",
                term = %params.term,
                locale = %params.locale,
                types = %params.types_label(),
                search.outcome = Empty,
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });
        let result = self.inner.search(ctx, params).instrument(span.clone()).await;
        if let Ok(answer) = &result {
            span.record("search.outcome", answer.label());
        }
        record_status(&span, &result);
        result
    }
}
