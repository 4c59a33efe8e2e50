//! Single-flight registry for in-flight remote lookups.
//!
//! Maps a cache key to the shared future of the lookup currently resolving
//! it. Concurrent callers with the same key await one shared future instead
//! of issuing duplicate remote calls. Coalescing is per-process only: it is
//! achieved by sharing a future handle, not by any cross-process lock, so a
//! multi-instance deployment deduplicates only through the shared cache.

use crate::places::errors::PlacesApiError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// The shared handle every coalesced caller awaits. The payload is the
/// opaque JSON value that also goes to the cache; the error type is `Clone`
/// so a failure reaches all waiters.
pub(crate) type SharedLookup = Shared<BoxFuture<'static, Result<Value, PlacesApiError>>>;

#[derive(Clone, Default)]
pub(crate) struct InflightRegistry {
    entries: Arc<Mutex<HashMap<String, SharedLookup>>>,
}

impl InflightRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight lookup for `key`, or start one.
    ///
    /// If an entry exists its shared future is returned and `make` is never
    /// invoked. Otherwise `make()` is wrapped so the entry is removed when it
    /// settles — fulfilled or rejected alike — then stored and returned. The
    /// unconditional removal is what keeps a transient failure from wedging
    /// the key forever.
    pub(crate) fn join<F, Fut>(&self, key: &str, make: F) -> SharedLookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, PlacesApiError>> + Send + 'static,
    {
        let mut entries = self.entries.lock().expect("inflight registry lock poisoned");
        if let Some(pending) = entries.get(key) {
            debug!(key, "joining in-flight lookup");
            return pending.clone();
        }

        let lookup = make();
        let registry = Arc::clone(&self.entries);
        let owned_key = key.to_owned();
        let shared = async move {
            let result = lookup.await;
            registry
                .lock()
                .expect("inflight registry lock poisoned")
                .remove(&owned_key);
            result
        }
        .boxed()
        .shared();

        entries.insert(key.to_owned(), shared.clone());
        shared
    }

    /// Number of lookups currently in flight.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("inflight registry lock poisoned").len()
    }
}
