//! Search orchestration and the searcher stack built around it.

pub mod coalesce;
pub mod service;

pub use coalesce::Coalesced;
pub use service::{SearchService, SearchTimeouts};
