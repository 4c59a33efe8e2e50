//! Shared test doubles for the lookup orchestrator: a scripted remote client
//! and a cache store that always fails.
#![allow(dead_code)]

use async_trait::async_trait;
use gazetteer::places::PlacesService;
use gazetteer::places::cache::{KeyValueStore, MemoryStore, ResponseCache, StoreError};
use gazetteer::places::client::PlacesClient;
use gazetteer::places::errors::PlacesApiError;
use gazetteer::places::models::{
    AutocompleteRequest, FieldMask, LocalizedText, LocationBias, PhotoRef, PlaceDetails,
    PlaceSummary, SearchRequest, Suggestion,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub const TTL: Duration = Duration::from_secs(60);

/// Remote client double. Counts invocations per operation and tags each
/// result with the invocation number, so tests can tell a cached payload
/// from a fresh one by its ID.
pub struct StubClient {
    pub search_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    pub photos_calls: AtomicUsize,
    pub autocomplete_calls: AtomicUsize,
    /// When set, searches fail with a transport-shaped error.
    pub fail_search: AtomicBool,
    /// When set, details lookups report the place as missing.
    pub details_missing: AtomicBool,
    gate: Option<watch::Receiver<bool>>,
}

impl StubClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// A client whose calls block until the returned sender releases them,
    /// for piling up concurrent callers deterministically.
    pub fn gated() -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Arc::new(Self::build(Some(rx))), tx)
    }

    fn build(gate: Option<watch::Receiver<bool>>) -> Self {
        Self {
            search_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            photos_calls: AtomicUsize::new(0),
            autocomplete_calls: AtomicUsize::new(0),
            fail_search: AtomicBool::new(false),
            details_missing: AtomicBool::new(false),
            gate,
        }
    }

    async fn pass_gate(&self) {
        if let Some(rx) = &self.gate {
            let mut rx = rx.clone();
            while !*rx.borrow_and_update() {
                rx.changed().await.expect("gate sender dropped");
            }
        }
    }
}

#[async_trait]
impl PlacesClient for StubClient {
    async fn search_text(&self, req: &SearchRequest) -> Result<Vec<PlaceSummary>, PlacesApiError> {
        let nth = self.search_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pass_gate().await;
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(PlacesApiError::RequestFailed(Arc::new(anyhow::anyhow!(
                "search upstream unavailable"
            ))));
        }
        Ok(vec![PlaceSummary {
            id: format!("{}-{nth}", req.query),
            display_name: Some(LocalizedText {
                text: req.query.clone(),
                language_code: None,
            }),
            formatted_address: None,
            location: None,
            rating: Some(4.0),
            types: vec!["cafe".into()],
        }])
    }

    async fn get_details(
        &self,
        place_id: &str,
        _fields: &FieldMask,
    ) -> Result<PlaceDetails, PlacesApiError> {
        let nth = self.details_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pass_gate().await;
        if self.details_missing.load(Ordering::SeqCst) {
            return Err(PlacesApiError::NotFound(place_id.to_owned()));
        }
        Ok(PlaceDetails {
            id: place_id.to_owned(),
            display_name: None,
            formatted_address: None,
            location: None,
            rating: Some(nth as f64),
            user_rating_count: None,
            types: Vec::new(),
            website_uri: None,
            international_phone_number: None,
        })
    }

    async fn get_photos(
        &self,
        place_id: &str,
        max_photos: u32,
    ) -> Result<Vec<PhotoRef>, PlacesApiError> {
        self.photos_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        Ok(vec![PhotoRef {
            name: format!("places/{place_id}/photos/1"),
            width_px: Some(640),
            height_px: Some(480),
        }]
        .into_iter()
        .take(max_photos as usize)
        .collect())
    }

    async fn autocomplete(
        &self,
        req: &AutocompleteRequest,
    ) -> Result<Vec<Suggestion>, PlacesApiError> {
        self.autocomplete_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        Ok(vec![Suggestion {
            place_id: format!("{}-1", req.input),
            description: req.input.clone(),
        }])
    }
}

/// Store double for the degraded path: every operation fails.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn setex(&self, _key: &str, _ttl: Duration, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn del(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// A service over a fresh in-memory store, returning the store too so tests
/// can inspect what was written.
pub fn service_over(client: Arc<StubClient>) -> (Arc<PlacesService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = ResponseCache::new(store.clone(), TTL);
    (Arc::new(PlacesService::new(client, cache)), store)
}

/// Spin until some cached entry's raw payload contains `needle`.
///
/// Cache population happens off the caller's path, so a test that asserts on
/// a subsequent hit waits for the spawned write to land first.
pub async fn wait_for_payload(store: &MemoryStore, needle: &str) {
    for _ in 0..1000 {
        for key in store.keys("places:*").await.unwrap() {
            if let Some(raw) = store.get(&key).await.unwrap()
                && raw.contains(needle)
            {
                return;
            }
        }
        tokio::task::yield_now().await;
    }
    panic!("no cached payload containing '{needle}' appeared");
}

/// The search from the coalescing scenario: coffee near (1, 2) within 500m.
pub fn coffee_search() -> SearchRequest {
    SearchRequest {
        query: "coffee".into(),
        location_bias: Some(LocationBias {
            latitude: 1.0,
            longitude: 2.0,
            radius: 500.0,
        }),
        max_results: Some(5),
    }
}
