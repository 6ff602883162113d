//! Cache entry encoding.
//!
//! An entry is the JSON array of places, nothing else: no timestamp, no
//! expiry. Both backends share this format so a store can be swapped without
//! a migration.

use places_core::{Place, StorageError, StorageResult};

pub fn encode_entry(places: &[Place]) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(places).map_err(|e| StorageError::Codec(e.to_string()))
}

pub fn decode_entry(bytes: &[u8]) -> StorageResult<Vec<Place>> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Codec(e.to_string()))
}
