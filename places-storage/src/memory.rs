//! In-process cache store.
//!
//! Keeps encoded entries in a map so it behaves exactly like the LMDB store
//! (same codec, same miss semantics) minus persistence. Used for tests and
//! for `PLACES_CACHE_BACKEND=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use places_core::{CacheKey, CacheStore, Place, StorageError, StorageResult};
use tokio::sync::RwLock;

use crate::codec::{decode_entry, encode_entry};

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        let bytes = encode_entry(places)?;
        self.entries.write().await.insert(key.clone(), bytes);
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        match self.entries.read().await.get(key) {
            Some(bytes) => decode_entry(bytes),
            None => Err(StorageError::NotFound),
        }
    }
}
