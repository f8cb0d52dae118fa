//! TTL- and capacity-bounded response cache
//!
//! One manager per logical table, built on the storage abstraction under the
//! session owner's partition. The cache is strictly a best-effort
//! optimization: every storage or decode fault is logged and degrades to a
//! miss, never an error to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::key::CacheKey;
use crate::error::StoreResult;
use crate::storage::Store;

/// Default capacity bound per logical table
pub const DEFAULT_CAPACITY: usize = 1000;

/// Persisted envelope around an opaque payload.
///
/// `created_at` is unix microseconds; `seq` breaks same-microsecond ties so
/// eviction order stays FIFO by insertion.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    created_at: i64,
    ttl_ms: i64,
    seq: u64,
    payload: String,
}

impl CacheEntry {
    fn is_expired(&self, now_us: i64) -> bool {
        now_us > self.created_at + self.ttl_ms * 1000
    }
}

/// Cache of API responses for one logical table
pub struct CacheManager {
    store: Arc<Store>,
    owner: String,
    table: String,
    capacity: usize,
    seq: AtomicU64,
}

impl CacheManager {
    pub fn new(store: Arc<Store>, owner: &str, table: &str) -> Self {
        Self::with_capacity(store, owner, table, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: Arc<Store>, owner: &str, table: &str, capacity: usize) -> Self {
        Self {
            store,
            owner: owner.to_string(),
            table: table.to_string(),
            capacity,
            seq: AtomicU64::new(0),
        }
    }

    /// Underlying storage key for a cache key (diagnostics and tests)
    pub fn storage_key(&self, key: &CacheKey) -> String {
        format!("{}/{}", self.table, key.encode())
    }

    fn table_prefix(&self) -> String {
        format!("{}/", self.table)
    }

    /// Store a response, wholesale replacing any previous entry for the key
    /// (created_at and TTL are reset), then enforce the capacity bound.
    pub async fn cache_response(&self, key: &CacheKey, payload: &str, ttl: Duration) {
        if let Err(e) = self.try_put(key, payload, ttl) {
            log::warn!("Cache write for {} failed: {}", self.storage_key(key), e);
        }
    }

    /// Serialize `value` as JSON and cache it
    pub async fn cache_response_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(payload) => self.cache_response(key, &payload, ttl).await,
            Err(e) => log::warn!("Cache serialization for {} failed: {}", self.storage_key(key), e),
        }
    }

    /// Fetch a cached payload if present and fresh.
    ///
    /// Expiry is checked lazily at read time; a found-but-expired row is
    /// deleted as a side effect. No background timer exists.
    pub async fn get_cached(&self, key: &CacheKey) -> Option<String> {
        match self.try_get(key) {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Cache read for {} failed: {}", self.storage_key(key), e);
                None
            }
        }
    }

    /// Fetch and decode a cached JSON payload
    pub async fn get_cached_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let payload = self.get_cached(key).await?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Cached payload for {} undecodable: {}", self.storage_key(key), e);
                None
            }
        }
    }

    /// Remove a single entry by its exact key.
    ///
    /// Detail views are invalidated this way, never by prefix, so unrelated
    /// detail caches survive.
    pub async fn invalidate(&self, key: &CacheKey) {
        let sk = self.storage_key(key);
        if let Err(e) = self.store.delete(&self.owner, &sk) {
            log::warn!("Cache invalidation for {} failed: {}", sk, e);
        }
    }

    /// Remove every entry whose cache key starts with `prefix`.
    ///
    /// Mutating a listed resource invalidates all list pages whose filter
    /// could include it via [`CacheKey::resource_prefix`] or
    /// [`CacheKey::filter_prefix`].
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        match self.try_invalidate_prefix(prefix) {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Cache prefix invalidation for {} failed: {}", prefix, e);
                0
            }
        }
    }

    /// Evict oldest-first until the table is back at its capacity bound.
    ///
    /// FIFO by insertion time, deliberately not access-recency LRU: writes
    /// stay O(1) and reads never update bookkeeping. Idempotent.
    pub async fn prune_if_over_capacity(&self) -> usize {
        match self.try_prune() {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Cache prune for table {} failed: {}", self.table, e);
                0
            }
        }
    }

    /// Number of rows currently stored for this table, expired included
    pub async fn entry_count(&self) -> usize {
        self.store
            .list_keys(&self.owner, &self.table_prefix())
            .map(|keys| keys.len())
            .unwrap_or(0)
    }

    fn try_put(&self, key: &CacheKey, payload: &str, ttl: Duration) -> StoreResult<()> {
        let entry = CacheEntry {
            created_at: Utc::now().timestamp_micros(),
            ttl_ms: ttl.as_millis() as i64,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            payload: payload.to_string(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        self.store.put(&self.owner, &self.storage_key(key), &bytes)?;
        self.try_prune()?;
        Ok(())
    }

    fn try_get(&self, key: &CacheKey) -> StoreResult<Option<String>> {
        let sk = self.storage_key(key);
        let Some(bytes) = self.store.get(&self.owner, &sk)? else {
            return Ok(None);
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                // Corrupt rows are dropped, not surfaced
                log::warn!("Dropping undecodable cache row {}: {}", sk, e);
                self.store.delete(&self.owner, &sk)?;
                return Ok(None);
            }
        };

        if entry.is_expired(Utc::now().timestamp_micros()) {
            log::debug!("Cache expired: {}", sk);
            self.store.delete(&self.owner, &sk)?;
            return Ok(None);
        }

        log::debug!("Cache hit: {}", sk);
        Ok(Some(entry.payload))
    }

    fn try_invalidate_prefix(&self, prefix: &str) -> StoreResult<usize> {
        let full_prefix = format!("{}/{}", self.table, prefix);
        let keys = self.store.list_keys(&self.owner, &full_prefix)?;
        let mut removed = 0;
        for key in keys {
            if self.store.delete(&self.owner, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn try_prune(&self) -> StoreResult<usize> {
        let keys = self.store.list_keys(&self.owner, &self.table_prefix())?;
        if keys.len() <= self.capacity {
            return Ok(0);
        }

        let mut stamped: Vec<(i64, u64, String)> = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(bytes) = self.store.get(&self.owner, &key)? else {
                continue;
            };
            match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => stamped.push((entry.created_at, entry.seq, key)),
                Err(_) => {
                    // Undecodable rows evict first
                    self.store.delete(&self.owner, &key)?;
                }
            }
        }

        stamped.sort();
        let excess = stamped.len().saturating_sub(self.capacity);
        for (_, _, key) in stamped.iter().take(excess) {
            self.store.delete(&self.owner, key)?;
        }
        Ok(excess)
    }
}
