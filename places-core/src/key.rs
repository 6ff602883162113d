//! Cache key derivation.
//!
//! Keys are built from a canonical encoding of [`SearchParams`]:
//!
//! - every field is length-prefixed, so a delimiter inside a value can never
//!   make two different queries encode to the same bytes;
//! - type filters are sorted, so `[city, airport]` and `[airport, city]`
//!   share an entry;
//! - the encoding is versioned and hashed with SHA-256.
//!
//! Nothing process-local (addresses, hash seeds, map order) takes part, so the
//! key for a given query is stable across restarts.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::place::SearchParams;

/// Prefix of every key produced by [`derive_key`].
pub const KEY_PREFIX: &str = "places:v1:";

/// Version tag mixed into the hashed bytes.
const ENCODING_VERSION: &[u8] = b"search-params/v1";

/// Opaque, deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key. Only used for readiness checks and tests; search keys
    /// come from [`derive_key`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key used by readiness checks. Never collides with a derived key.
    pub fn readiness() -> Self {
        Self("places:readiness".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a query.
pub fn derive_key(params: &SearchParams) -> CacheKey {
    let mut types: Vec<&str> = params.types.iter().map(String::as_str).collect();
    types.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(ENCODING_VERSION);
    write_field(&mut hasher, &params.term);
    write_field(&mut hasher, &params.locale);
    hasher.update((types.len() as u64).to_be_bytes());
    for place_type in types {
        write_field(&mut hasher, place_type);
    }

    CacheKey(format!("{}{}", KEY_PREFIX, hex::encode(hasher.finalize())))
}

fn write_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}
