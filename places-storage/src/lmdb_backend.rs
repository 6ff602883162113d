//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep the last good answer
//! per query in a memory-mapped file, so cached answers survive restarts.
//!
//! # Layout
//!
//! A single unnamed database. Keys are the UTF-8 bytes of the [`CacheKey`],
//! values are entries encoded by [`crate::codec`]. Writes overwrite in place;
//! nothing is ever expired or deleted by the service.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads use read transactions and writes
//! use write transactions.

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use places_core::{CacheKey, CacheStore, Place, StorageError, StorageResult};

use crate::codec::{decode_entry, encode_entry};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for StorageError {
    fn from(e: LmdbCacheError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// LMDB cache store.
///
/// # Example
///
/// ```ignore
/// use places_core::{CacheStore, Place, SearchParams};
/// use places_storage::LmdbCacheStore;
///
/// let store = LmdbCacheStore::new("/tmp/places-cache", 64)?;
/// store.cache(&SearchParams::default(), &[Place::new("MOW", "Moscow", "Russia")]).await?;
/// let places = store.retrieve(&SearchParams::default()).await?;
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process; LMDB's
        // requirement is that the same path is not opened twice in one process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
        })
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        let bytes = encode_entry(places)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), &bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, key.as_bytes()) {
            Ok(Some(bytes)) => decode_entry(bytes),
            Ok(None) => Err(StorageError::NotFound),
            Err(e) => Err(LmdbCacheError::Transaction(e.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use places_core::SearchParams;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store =
            LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn entry_count(store: &LmdbCacheStore) -> u64 {
        let rtxn = store.env.read_txn().unwrap();
        store.db.len(&rtxn).unwrap()
    }

    fn moscow() -> Vec<Place> {
        vec![Place::new("MOW", "Moscow", "Russia")]
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();
        let key = CacheKey::from_raw("places:test");

        store.set(&key, &moscow()).await.expect("set should succeed");

        let places = store.get(&key).await.expect("get should succeed");
        assert_eq!(places, moscow());
        assert_eq!(entry_count(&store), 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();

        let result = store.get(&CacheKey::readiness()).await;
        assert_eq!(result, Err(StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let (store, _temp_dir) = create_test_store();
        let params = SearchParams::new("mos", "ru").with_type("city");

        store.cache(&params, &moscow()).await.expect("cache should succeed");
        let airports = vec![
            Place::new("SVO", "Sheremetyevo", "Moscow"),
            Place::new("DME", "Domodedovo", "Moscow"),
        ];
        store.cache(&params, &airports).await.expect("cache should succeed");

        assert_eq!(store.retrieve(&params).await.unwrap(), airports);
        assert_eq!(entry_count(&store), 1);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let params = SearchParams::default();

        {
            let store = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
            store.cache(&params, &moscow()).await.unwrap();
        }

        let reopened = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
        assert_eq!(reopened.retrieve(&params).await.unwrap(), moscow());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_codec_error() {
        let (store, _temp_dir) = create_test_store();
        let key = CacheKey::from_raw("places:corrupt");

        let mut wtxn = store.env.write_txn().unwrap();
        store.db.put(&mut wtxn, key.as_bytes(), b"{not a list").unwrap();
        wtxn.commit().unwrap();

        assert!(matches!(store.get(&key).await, Err(StorageError::Codec(_))));
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("Москва".to_string()),
            Just("東京 \"quoted\" \\ 🛫".to_string()),
            "\\PC{0,24}",
        ]
    }

    fn place_strategy() -> impl Strategy<Value = Place> {
        (text_strategy(), text_strategy(), text_strategy())
            .prop_map(|(identifier, title, subtitle)| Place { identifier, title, subtitle })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_round_trip(places in prop::collection::vec(place_strategy(), 0..8)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let (store, _temp_dir) = create_test_store();
            let key = CacheKey::from_raw("places:test");

            let got = runtime.block_on(async {
                store.set(&key, &places).await.unwrap();
                store.get(&key).await.unwrap()
            });
            prop_assert_eq!(got, places);
        }
    }
}
