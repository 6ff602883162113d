//! Structured logging decorator.
//!
//! Logs the start of every call at debug level and its outcome with the
//! elapsed time. Severity follows the error kind: expected outcomes stay at
//! debug, client faults are warnings, anything else is an error.

use std::time::Instant;

use async_trait::async_trait;
use places_core::{
    Answer, CacheKey, CacheStore, Classify, Place, RequestContext, Requester, SearchParams,
    SearchResult, Searcher, StorageResult,
};

use crate::telemetry::Logger;

pub struct Logged<T> {
    inner: T,
    logger: Logger,
}

impl<T> Logged<T> {
    pub fn new(inner: T, logger: Logger) -> Self {
        Self { inner, logger }
    }
}

/// Emit the outcome event for one call. Fields are passed through verbatim.
macro_rules! log_outcome {
    ($logger:expr, $result:expr, $start:expr, $operation:literal, $($field:tt)+) => {{
        let elapsed_ms = $start.elapsed().as_millis() as u64;
        $logger.in_scope(|| match $result {
            Ok(_) => tracing::debug!(
                operation = $operation, $($field)+, elapsed_ms, "processed"
            ),
            Err(err) if err.is_expected() => tracing::debug!(
                operation = $operation, $($field)+, elapsed_ms, error = %err, "processed"
            ),
            Err(err) if err.is_client_fault() => tracing::warn!(
                operation = $operation, $($field)+, elapsed_ms, error = %err, "rejected"
            ),
            Err(err) => tracing::error!(
                operation = $operation, $($field)+, elapsed_ms, error = %err, "failed"
            ),
        })
    }};
}

#[async_trait]
impl<T: Requester> Requester for Logged<T> {
    async fn request(
        &self,
        ctx: &RequestContext,
        params: &SearchParams,
    ) -> SearchResult<Vec<Place>> {
        let start = Instant::now();
        let types = params.types_label();
        self.logger.in_scope(|| {
            tracing::debug!(
                operation = "request",
                term = %params.term,
                locale = %params.locale,
                types = %types,
                "processing"
            )
        });

        let result = self.inner.request(ctx, params).await;

        log_outcome!(
            self.logger,
            &result,
            start,
            "request",
            term = %params.term,
            locale = %params.locale,
            types = %types
        );
        result
    }
}

#[async_trait]
impl<T: CacheStore> CacheStore for Logged<T> {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        let start = Instant::now();
        self.logger.in_scope(|| {
            tracing::debug!(
                operation = "cache",
                key = %key,
                places = places.len(),
                "processing"
            )
        });

        let result = self.inner.set(key, places).await;

        log_outcome!(self.logger, &result, start, "cache", key = %key);
        result
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        let start = Instant::now();
        self.logger
            .in_scope(|| tracing::debug!(operation = "retrieve", key = %key, "processing"));

        let result = self.inner.get(key).await;

        log_outcome!(self.logger, &result, start, "retrieve", key = %key);
        result
    }
}

#[async_trait]
impl<T: Searcher> Searcher for Logged<T> {
    async fn search(&self, ctx: &RequestContext, params: &SearchParams) -> SearchResult<Answer> {
        let start = Instant::now();
        let types = params.types_label();
        self.logger.in_scope(|| {
            tracing::debug!(
                operation = "search",
                term = %params.term,
                locale = %params.locale,
                types = %types,
                "processing"
            )
        });

        let result = self.inner.search(ctx, params).await;

        let outcome = match &result {
            Ok(answer) => answer.label(),
            Err(_) => "error",
        };
        log_outcome!(
            self.logger,
            &result,
            start,
            "search",
            term = %params.term,
            locale = %params.locale,
            types = %types,
            outcome
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use places_core::{SearchError, StorageError};
    use places_test_utils::{moscow, MockCacheStore, MockRequester};

    use super::*;
    use crate::telemetry::logger::capture::capturing;

    #[tokio::test]
    async fn test_success_logged_at_debug() {
        let (logger, buffer) = capturing();
        let logged = Logged::new(MockRequester::ok(vec![moscow()]), logger);

        let places = logged
            .request(&RequestContext::background(), &SearchParams::new("mow", "en"))
            .await
            .unwrap();

        assert_eq!(places, vec![moscow()]);
        let debug = buffer.lines_at("DEBUG");
        assert_eq!(debug.len(), 2);
        assert!(debug[1].contains("elapsed_ms"));
        assert!(debug[1].contains("term=mow"));
        assert!(buffer.lines_at("ERROR").is_empty());
    }

    #[tokio::test]
    async fn test_expected_errors_stay_at_debug() {
        for err in [SearchError::DeadlineExceeded, SearchError::Cancelled] {
            let (logger, buffer) = capturing();
            let logged = Logged::new(MockRequester::failing(err.clone()), logger);

            let result = logged
                .request(&RequestContext::background(), &SearchParams::default())
                .await;

            assert_eq!(result, Err(err));
            assert!(buffer.lines_at("ERROR").is_empty());
            assert!(buffer.lines_at("WARN").is_empty());
        }
    }

    #[tokio::test]
    async fn test_client_fault_is_warning() {
        let (logger, buffer) = capturing();
        let logged = Logged::new(
            MockRequester::failing(SearchError::client_fault("bad request")),
            logger,
        );

        let _ = logged
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert_eq!(buffer.lines_at("WARN").len(), 1);
        assert!(buffer.lines_at("ERROR").is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_error_is_error() {
        let (logger, buffer) = capturing();
        let logged = Logged::new(
            MockRequester::failing(SearchError::UnexpectedStatus(503)),
            logger,
        );

        let result = logged
            .request(&RequestContext::background(), &SearchParams::default())
            .await;

        assert_eq!(result, Err(SearchError::UnexpectedStatus(503)));
        let errors = buffer.lines_at("ERROR");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unexpected status code: 503"));
    }

    #[tokio::test]
    async fn test_cache_miss_stays_at_debug() {
        let (logger, buffer) = capturing();
        let logged = Logged::new(MockCacheStore::new(), logger);

        let result = logged.retrieve(&SearchParams::default()).await;

        assert_eq!(result, Err(StorageError::NotFound));
        assert!(buffer.lines_at("ERROR").is_empty());
        assert!(buffer.contents().contains("retrieve"));
    }
}
