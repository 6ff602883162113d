//! API Configuration Module
//!
//! Timeouts, the upstream endpoint and the cache backend. Configuration is
//! loaded from environment variables with defaults suitable for development;
//! unparsable numbers fall back to their defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Public places endpoint the service proxies by default.
pub const DEFAULT_UPSTREAM_URL: &str = "https://places.aviasales.ru/v2/places.json";

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// Which cache store backs the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Persistent LMDB store.
    Lmdb,
    /// Process-local map, lost on restart.
    Memory,
}

impl CacheBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "lmdb" => Some(Self::Lmdb),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind host.
    pub bind_host: String,

    /// Bind port.
    pub port: u16,

    /// Upstream places endpoint.
    pub upstream_url: String,

    /// Bound on the upstream call. The only deadline a search imposes.
    pub search_timeout: Duration,

    /// Bound on the fallback cache read.
    pub cache_read_timeout: Duration,

    /// Bound on the detached cache write.
    pub cache_write_timeout: Duration,

    /// Whole-request timeout enforced by the HTTP layer.
    pub server_timeout: Duration,

    pub cache_backend: CacheBackend,

    /// LMDB directory.
    pub cache_path: PathBuf,

    /// LMDB map size in megabytes.
    pub cache_max_size_mb: usize,

    /// Share one upstream call between concurrent identical searches.
    pub coalesce: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            search_timeout: Duration::from_secs(3),
            cache_read_timeout: Duration::from_secs(1),
            cache_write_timeout: Duration::from_secs(5),
            server_timeout: Duration::from_secs(30),
            cache_backend: CacheBackend::Lmdb,
            cache_path: PathBuf::from("./data/places-cache"),
            cache_max_size_mb: 64,
            coalesce: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `PLACES_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` / `PLACES_API_PORT`: Bind port (default: 8080)
    /// - `PLACES_UPSTREAM_URL`: Upstream places endpoint
    /// - `PLACES_SEARCH_TIMEOUT_MS`: Upstream deadline (default: 3000)
    /// - `PLACES_CACHE_READ_TIMEOUT_MS`: Fallback read bound (default: 1000)
    /// - `PLACES_CACHE_WRITE_TIMEOUT_MS`: Detached write bound (default: 5000)
    /// - `PLACES_SERVER_TIMEOUT_SECS`: Whole-request timeout (default: 30)
    /// - `PLACES_CACHE_BACKEND`: "lmdb" or "memory" (default: lmdb)
    /// - `PLACES_CACHE_PATH`: LMDB directory (default: ./data/places-cache)
    /// - `PLACES_CACHE_MAX_SIZE_MB`: LMDB map size (default: 64)
    /// - `PLACES_COALESCE`: "true" to coalesce identical searches (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("PLACES_API_PORT").ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        Self {
            bind_host: std::env::var("PLACES_API_BIND").unwrap_or(defaults.bind_host),
            port,
            upstream_url: std::env::var("PLACES_UPSTREAM_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.upstream_url),
            search_timeout: env_millis("PLACES_SEARCH_TIMEOUT_MS")
                .unwrap_or(defaults.search_timeout),
            cache_read_timeout: env_millis("PLACES_CACHE_READ_TIMEOUT_MS")
                .unwrap_or(defaults.cache_read_timeout),
            cache_write_timeout: env_millis("PLACES_CACHE_WRITE_TIMEOUT_MS")
                .unwrap_or(defaults.cache_write_timeout),
            server_timeout: env_parse::<u64>("PLACES_SERVER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.server_timeout),
            cache_backend: std::env::var("PLACES_CACHE_BACKEND")
                .ok()
                .and_then(|s| CacheBackend::parse(&s))
                .unwrap_or(defaults.cache_backend),
            cache_path: std::env::var("PLACES_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_max_size_mb: env_parse("PLACES_CACHE_MAX_SIZE_MB")
                .unwrap_or(defaults.cache_max_size_mb),
            coalesce: std::env::var("PLACES_COALESCE")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.coalesce),
        }
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
