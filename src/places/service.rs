//! Cache-aside orchestrator for place lookups.
//!
//! Ties the key builder, cache store, in-flight registry, and remote client
//! together. Per request: build the key, try the cache, join or start the
//! single in-flight lookup for that key, and populate the cache best-effort
//! on success. Upstream errors cross this boundary unmodified; cache-layer
//! errors never do. A forced-fresh lookup bypasses both the cache read and
//! the coalescing and overwrites the entry.
//!
//! All dependencies are constructor-injected so tests build a fresh service
//! around mock parts instead of mutating shared state.

use crate::places::cache::ResponseCache;
use crate::places::client::PlacesClient;
use crate::places::errors::PlacesApiError;
use crate::places::inflight::InflightRegistry;
use crate::places::key::cache_key;
use crate::places::models::{
    AutocompleteRequest, FieldMask, PhotoRef, PlaceDetails, PlaceSummary, SearchRequest, Suggestion,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Key parameters for a details lookup: the place plus its field mask, so a
/// narrower mask never serves a broader request from cache.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsKey<'a> {
    place_id: &'a str,
    fields: &'a FieldMask,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotosKey<'a> {
    place_id: &'a str,
    max_photos: u32,
}

pub struct PlacesService {
    client: Arc<dyn PlacesClient>,
    cache: ResponseCache,
    inflight: InflightRegistry,
}

impl PlacesService {
    pub fn new(client: Arc<dyn PlacesClient>, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            inflight: InflightRegistry::new(),
        }
    }

    pub async fn search(
        &self,
        req: &SearchRequest,
        force_fresh: bool,
    ) -> Result<Vec<PlaceSummary>, PlacesApiError> {
        let client = Arc::clone(&self.client);
        let owned = req.clone();
        self.lookup("search", req, force_fresh, move || async move {
            client.search_text(&owned).await
        })
        .await
    }

    pub async fn get_details(
        &self,
        place_id: &str,
        fields: &FieldMask,
        force_fresh: bool,
    ) -> Result<PlaceDetails, PlacesApiError> {
        let params = DetailsKey { place_id, fields };
        let client = Arc::clone(&self.client);
        let id = place_id.to_owned();
        let fields = fields.clone();
        self.lookup("details", &params, force_fresh, move || async move {
            client.get_details(&id, &fields).await
        })
        .await
    }

    pub async fn get_photos(
        &self,
        place_id: &str,
        max_photos: u32,
        force_fresh: bool,
    ) -> Result<Vec<PhotoRef>, PlacesApiError> {
        let params = PhotosKey {
            place_id,
            max_photos,
        };
        let client = Arc::clone(&self.client);
        let id = place_id.to_owned();
        self.lookup("photos", &params, force_fresh, move || async move {
            client.get_photos(&id, max_photos).await
        })
        .await
    }

    pub async fn autocomplete(
        &self,
        req: &AutocompleteRequest,
        force_fresh: bool,
    ) -> Result<Vec<Suggestion>, PlacesApiError> {
        let client = Arc::clone(&self.client);
        let owned = req.clone();
        self.lookup("autocomplete", req, force_fresh, move || async move {
            client.autocomplete(&owned).await
        })
        .await
    }

    /// The cache-aside state machine shared by every operation.
    ///
    /// Results cross the registry and the store as opaque JSON so one code
    /// path serves all four payload types; the typed form is restored at the
    /// edge. Cache writes are fire-and-forget: callers resolve as soon as the
    /// remote lookup does, and the spawned write absorbs its own failures.
    /// Deregistration happens inside the registry on settlement, success or
    /// failure alike.
    async fn lookup<P, T, F, Fut>(
        &self,
        operation: &'static str,
        params: &P,
        force_fresh: bool,
        fetch: F,
    ) -> Result<T, PlacesApiError>
    where
        P: Serialize,
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, PlacesApiError>> + Send + 'static,
    {
        let params = serde_json::to_value(params).map_err(PlacesApiError::request)?;
        let key = cache_key(operation, &params);

        if force_fresh {
            debug!(operation, key, "forced-fresh lookup");
            let result = fetch().await?;
            let value = serde_json::to_value(&result).map_err(PlacesApiError::request)?;
            let cache = self.cache.clone();
            tokio::spawn(async move { cache.write(&key, &value).await });
            return Ok(result);
        }

        if let Some(hit) = self.cache.read::<T>(&key).await {
            return Ok(hit);
        }

        let cache = self.cache.clone();
        let write_key = key.clone();
        let shared = self.inflight.join(&key, move || async move {
            let result = fetch().await?;
            let value = serde_json::to_value(&result).map_err(PlacesApiError::request)?;
            let write = value.clone();
            tokio::spawn(async move { cache.write(&write_key, &write).await });
            Ok(value)
        });

        let value = shared.await?;
        serde_json::from_value(value).map_err(PlacesApiError::request)
    }

    /// Drop every cached entry for one operation. See [`ResponseCache::purge`].
    pub async fn purge(&self, operation: &str) -> u64 {
        self.cache.purge(operation).await
    }

    /// Lookups currently in flight, for introspection.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}
