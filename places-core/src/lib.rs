//! Places Core - search domain types
//!
//! Everything the orchestrator and its collaborators agree on: place records,
//! query parameters, the cache key deriver, the error taxonomy, request
//! contexts and the capability traits (`Requester`, `CacheStore`,
//! `Searcher`). No I/O lives here.

pub mod context;
pub mod error;
pub mod key;
pub mod place;
pub mod traits;

pub use context::{CancelHandle, CancelOnDrop, RequestContext};
pub use error::{Classify, SearchError, SearchResult, StorageError, StorageResult};
pub use key::{derive_key, CacheKey, KEY_PREFIX};
pub use place::{Place, SearchParams};
pub use traits::{Answer, CacheStore, Requester, Searcher};
