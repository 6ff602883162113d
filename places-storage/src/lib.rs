//! Places Storage - cache store backends
//!
//! Implementations of [`places_core::CacheStore`]:
//! - [`LmdbCacheStore`]: persistent, memory-mapped (production default)
//! - [`MemoryCacheStore`]: in-process map (tests, ephemeral deployments)
//!
//! Both encode entries with [`codec`] and never expire them.

pub mod codec;
pub mod lmdb_backend;
pub mod memory;

pub use codec::{decode_entry, encode_entry};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::MemoryCacheStore;
