//! Cache-through fetch combining cache, retry and the connectivity gate
//!
//! The read path callers actually use: serve fresh cached data without
//! touching the network, short-circuit to cache-only when offline, otherwise
//! fetch under the retry policy and store the response.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::key::CacheKey;
use crate::cache::manager::CacheManager;
use crate::error::ApiError;
use crate::net::connectivity::ConnectivityObserver;
use crate::net::retry::{run_with_retry, RetryPolicy};

/// Cache-backed fetcher for one logical table
pub struct CachedFetcher {
    cache: CacheManager,
    policy: RetryPolicy,
    connectivity: Arc<dyn ConnectivityObserver>,
}

impl CachedFetcher {
    pub fn new(
        cache: CacheManager,
        policy: RetryPolicy,
        connectivity: Arc<dyn ConnectivityObserver>,
    ) -> Self {
        Self {
            cache,
            policy,
            connectivity,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Fetch a payload, preferring a fresh cached copy.
    ///
    /// Cache hit: returned with no network attempt. Offline miss: a
    /// `Network` error without invoking `op`. Otherwise `op` runs under the
    /// retry policy and a successful response overwrites the key.
    pub async fn fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        op: F,
    ) -> Result<String, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        if let Some(hit) = self.cache.get_cached(key).await {
            return Ok(hit);
        }

        if self.connectivity.is_offline() {
            return Err(ApiError::Network(
                "You're offline and this content isn't cached yet.".to_string(),
            ));
        }

        let fresh = run_with_retry(&self.policy, op).await?;
        self.cache.cache_response(key, &fresh, ttl).await;
        Ok(fresh)
    }
}
