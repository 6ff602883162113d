//! Error types for place search operations

use thiserror::Error;

/// Search outcome errors.
///
/// The orchestrator is the only place that decides what a kind means for the
/// caller; decorators pass these through untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Upstream rejected the query itself. Surfaced verbatim, never answered
    /// from cache.
    #[error("bad request: {0}")]
    ClientFault(String),

    /// The caller gave up.
    #[error("context canceled")]
    Cancelled,

    /// The bounded sub-context ran out of time.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// No cache entry for the query.
    #[error("cache not found")]
    CacheMiss,

    /// No fresh answer and no usable cache.
    #[error("places unavailable")]
    Unavailable,

    /// Upstream answered with a status other than 200 or 400.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// Transport, decoding or storage failure.
    #[error("{0}")]
    Unexpected(String),
}

impl SearchError {
    pub fn client_fault(message: impl Into<String>) -> Self {
        Self::ClientFault(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("cache not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("cache entry codec error: {0}")]
    Codec(String),
}

impl From<StorageError> for SearchError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => SearchError::CacheMiss,
            other => SearchError::Unexpected(other.to_string()),
        }
    }
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Result type for cache store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// How instrumentation should treat an error.
///
/// Expected outcomes are normal control flow (a caller hanging up, a timeout
/// that triggers fallback, a cache miss). They are logged at debug level and
/// never mark a span as failed.
pub trait Classify {
    fn is_expected(&self) -> bool;

    fn is_client_fault(&self) -> bool {
        false
    }
}

impl Classify for SearchError {
    fn is_expected(&self) -> bool {
        matches!(
            self,
            SearchError::Cancelled
                | SearchError::DeadlineExceeded
                | SearchError::CacheMiss
                | SearchError::Unavailable
        )
    }

    fn is_client_fault(&self) -> bool {
        matches!(self, SearchError::ClientFault(_))
    }
}

impl Classify for StorageError {
    fn is_expected(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}
