//! Places Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Scripted mock requester and call-recording cache store
//! - Fixtures for common places
//! - Proptest generators for places and search parameters

// Re-export the in-memory store from its source crate
pub use places_storage::MemoryCacheStore;

// Re-export core types for convenience
pub use places_core::{
    derive_key, Answer, CacheKey, CacheStore, Place, RequestContext, Requester, SearchError,
    SearchParams, SearchResult, Searcher, StorageError, StorageResult,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::watch;

// ============================================================================
// FIXTURES
// ============================================================================

/// The single city the upstream fixture answers with.
pub fn moscow() -> Place {
    Place::new("MOW", "Moscow", "Russia")
}

pub fn moscow_airports() -> Vec<Place> {
    vec![
        Place::new("SVO", "Sheremetyevo", "Moscow"),
        Place::new("DME", "Domodedovo", "Moscow"),
        Place::new("VKO", "Vnukovo", "Moscow"),
    ]
}

/// Upstream JSON body for a Moscow city query, trimmed from a real response.
pub const UPSTREAM_MOSCOW_JSON: &str = r#"[{"main_airport_name": null, "type": "city", "country_code": "RU", "name": "Moscow", "coordinates": {"lat": 55.755786, "lon": 37.617633}, "country_name": "Russia", "weight": 1006321, "code": "MOW", "index_strings": ["defaultcity", "maskava", "moscow", "moskva"], "state_code": null, "cases": null, "country_cases": null}]"#;

// ============================================================================
// MOCK REQUESTER
// ============================================================================

type RequestFn = dyn Fn(&SearchParams) -> SearchResult<Vec<Place>> + Send + Sync;

/// Scripted requester.
///
/// Answers every call through a closure, optionally after a delay, and
/// counts calls. [`MockRequester::hanging`] never answers, which is how tests
/// drive the deadline and cancellation paths.
pub struct MockRequester {
    respond: Option<Box<RequestFn>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SearchParams>>,
}

impl MockRequester {
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&SearchParams) -> SearchResult<Vec<Place>> + Send + Sync + 'static,
    {
        Self {
            respond: Some(Box::new(respond)),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(places: Vec<Place>) -> Self {
        Self::from_fn(move |_| Ok(places.clone()))
    }

    pub fn failing(err: SearchError) -> Self {
        Self::from_fn(move |_| Err(err.clone()))
    }

    /// Never returns.
    pub fn hanging() -> Self {
        Self {
            respond: None,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SearchParams> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Requester for MockRequester {
    async fn request(
        &self,
        _ctx: &RequestContext,
        params: &SearchParams,
    ) -> SearchResult<Vec<Place>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(params.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.respond {
            Some(respond) => respond(params),
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// MOCK CACHE STORE
// ============================================================================

/// Cache store that records calls and can be told to fail.
///
/// Backed by a real [`MemoryCacheStore`] so round-trips behave like
/// production.
pub struct MockCacheStore {
    inner: MemoryCacheStore,
    get_error: Mutex<Option<StorageError>>,
    set_error: Mutex<Option<StorageError>>,
    gets: AtomicUsize,
    sets: watch::Sender<usize>,
}

impl Default for MockCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCacheStore {
    pub fn new() -> Self {
        let (sets, _) = watch::channel(0);
        Self {
            inner: MemoryCacheStore::new(),
            get_error: Mutex::new(None),
            set_error: Mutex::new(None),
            gets: AtomicUsize::new(0),
            sets,
        }
    }

    /// Store pre-populated with `places` for `params`.
    pub async fn seeded(params: &SearchParams, places: &[Place]) -> Self {
        let store = Self::new();
        store
            .inner
            .cache(params, places)
            .await
            .unwrap_or_else(|e| panic!("seeding memory store failed: {e}"));
        store
    }

    pub fn fail_gets_with(&self, err: StorageError) {
        *self.get_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    pub fn fail_sets_with(&self, err: StorageError) {
        *self.set_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls, failed ones included.
    pub fn sets(&self) -> usize {
        *self.sets.borrow()
    }

    /// Wait until at least `count` `set` calls happened. Returns `false` on
    /// timeout.
    pub async fn wait_for_sets(&self, count: usize, timeout: Duration) -> bool {
        let mut rx = self.sets.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|sets| *sets >= count))
            .await
            .map(|waited| waited.is_ok())
            .unwrap_or(false)
    }

    pub fn inner(&self) -> &MemoryCacheStore {
        &self.inner
    }
}

#[async_trait]
impl CacheStore for MockCacheStore {
    async fn set(&self, key: &CacheKey, places: &[Place]) -> StorageResult<()> {
        let forced = self
            .set_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let result = match forced {
            Some(err) => Err(err),
            None => self.inner.set(key, places).await,
        };
        self.sets.send_modify(|sets| *sets += 1);
        result
    }

    async fn get(&self, key: &CacheKey) -> StorageResult<Vec<Place>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let forced = self
            .get_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match forced {
            Some(err) => Err(err),
            None => self.inner.get(key).await,
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub fn place_strategy() -> impl Strategy<Value = Place> {
    ("[A-Z]{3}", ".{0,24}", ".{0,24}")
        .prop_map(|(identifier, title, subtitle)| Place { identifier, title, subtitle })
}

pub fn places_strategy() -> impl Strategy<Value = Vec<Place>> {
    prop::collection::vec(place_strategy(), 0..6)
}

pub fn search_params_strategy() -> impl Strategy<Value = SearchParams> {
    (
        ".{0,16}",
        prop_oneof![Just(String::new()), Just("en".to_string()), Just("ru".to_string())],
        prop::collection::vec(
            prop_oneof![
                Just("city".to_string()),
                Just("airport".to_string()),
                Just("country".to_string())
            ],
            0..4,
        ),
    )
        .prop_map(|(term, locale, types)| SearchParams { term, locale, types })
}
