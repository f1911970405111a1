//! Moka in-memory cache provider
//!
//! High-performance concurrent cache with capacity-bounded LRU-style
//! eviction and a cache-level TTL.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use capdex_domain::error::Result;
use capdex_domain::ports::{CacheEntryConfig, CacheProvider};

use crate::constants::CACHE_DEFAULT_MAX_ENTRIES;

/// Moka-based in-process cache provider
#[derive(Clone)]
pub struct MokaCacheProvider {
    cache: Cache<String, String>,
}

impl MokaCacheProvider {
    /// Create a cache with default capacity and no TTL
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_DEFAULT_MAX_ENTRIES)
            .build();
        Self { cache }
    }

    /// Create a cache with explicit capacity and TTL
    pub fn with_config(max_entries: u64, time_to_live: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(time_to_live)
            .build();
        Self { cache }
    }

    /// Number of live entries (approximate until pending tasks run)
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for MokaCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for MokaCacheProvider {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    // Moka TTL is cache-level; the per-entry config is honored by tiers
    // that support it (redis).
    async fn set_json(&self, key: &str, value: &str, _config: CacheEntryConfig) -> Result<()> {
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.cache.contains_key(key);
        self.cache.invalidate(key).await;
        Ok(existed)
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "moka"
    }
}

impl std::fmt::Debug for MokaCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheProvider")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
