//! Instrumentation decorators.
//!
//! [`Traced`] and [`Logged`] wrap any [`Requester`](places_core::Requester),
//! [`CacheStore`](places_core::CacheStore) or [`Searcher`](places_core::Searcher)
//! and implement the same trait, so they compose by plain construction:
//!
//! ```ignore
//! let requester = Logged::new(Traced::new(http, logger.clone()), logger.clone());
//! ```
//!
//! Concrete implementation innermost, tracing around it, logging outermost.
//! Neither wrapper changes results or errors.

pub mod log;
pub mod trace;

pub use log::Logged;
pub use trace::Traced;

use crate::telemetry::Logger;

/// Wrap `inner` in tracing, then logging.
pub fn instrumented<T>(inner: T, logger: &Logger) -> Logged<Traced<T>> {
    Logged::new(Traced::new(inner, logger.clone()), logger.clone())
}
