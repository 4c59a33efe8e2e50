//! Cache store adapters and the error-absorbing response cache.
//!
//! The store is an optimization, not a dependency: any failure reading or
//! writing it is logged and treated as a miss, never surfaced to a caller.
//! TTL-based expiry is owned by the store itself; nothing here sweeps
//! entries on a timer.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::places::key::KEY_NAMESPACE;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error("{0}")]
    Backend(String),
}

/// The external key-value interface: JSON-encoded string values with TTL.
///
/// `keys`/`del` exist for pattern invalidation; `get`/`setex` carry the
/// cache-aside hot path.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn setex(&self, key: &str, ttl: Duration, value: String) -> Result<(), StoreError>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Cheap reachability probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend label for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Redis-backed store over a multiplexed async connection.
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn setex(&self, key: &str, ttl: Duration, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.keys(pattern).await?)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del(keys).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// In-process store used when no Redis URL is configured.
///
/// Expiry is lazy: an expired entry is dropped on the read that finds it.
/// Pattern matching supports only the trailing-`*` prefix form, which is the
/// only form this crate emits.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, (Instant, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, ref value) = *entry;
            if Instant::now() < expires_at {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove_if(key, |_, (expires_at, _)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn setex(&self, key: &str, ttl: Duration, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), (Instant::now() + ttl, value));
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let Some(prefix) = pattern.strip_suffix('*') else {
            return Err(StoreError::Backend(format!(
                "unsupported pattern '{pattern}': only trailing-* prefixes"
            )));
        };
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Degraded store used when the Redis connection cannot be established at
/// startup: always misses, discards writes. Every request becomes a live
/// lookup but nothing breaks.
pub struct NullStore;

#[async_trait]
impl KeyValueStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn setex(&self, _key: &str, _ttl: Duration, _value: String) -> Result<(), StoreError> {
        Ok(())
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn del(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Backend("cache store disabled".into()))
    }

    fn backend(&self) -> &'static str {
        "null"
    }
}

/// Typed cache facade held by the orchestrator. Clone-cheap.
///
/// Read and write absorb every store error; only `ping` exposes one, for
/// health reporting.
#[derive(Clone)]
pub struct ResponseCache {
    store: std::sync::Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: std::sync::Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Read and decode a cached value. Absent, corrupt, or unreachable all
    /// come back as `None`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding corrupt cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Best-effort write with the configured TTL.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = self.store.setex(key, self.ttl, raw).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Delete every cached entry for one operation. Returns the number of
    /// keys removed; store failures are absorbed and count as zero.
    pub async fn purge(&self, operation: &str) -> u64 {
        let pattern = format!("{KEY_NAMESPACE}:{operation}:*");
        let keys = match self.store.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern, error = %e, "cache purge scan failed");
                return 0;
            }
        };
        match self.store.del(&keys).await {
            Ok(removed) => {
                debug!(operation, removed, "cache purged");
                removed
            }
            Err(e) => {
                warn!(pattern, error = %e, "cache purge delete failed");
                0
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}
