//! Cache wrappers for the embedding and response tiers
//!
//! Both caches are optional from a correctness standpoint: every read path
//! treats provider failures and deserialization surprises as misses, so a
//! cold start and a broken cache behave identically.

use capdex_domain::ports::{CacheEntryConfig, CacheProvider};
use capdex_domain::value_objects::{SearchMode, Verbosity};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::status::CacheCounters;

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Embedding cache keyed by the normalized query
pub struct EmbeddingCache {
    inner: Arc<dyn CacheProvider>,
    ttl: Duration,
    /// Hit/miss counters surfaced by the status endpoint
    pub counters: CacheCounters,
}

impl EmbeddingCache {
    /// Wrap a cache provider as the embedding tier
    pub fn new(inner: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            counters: CacheCounters::default(),
        }
    }

    fn key(normalized_query: &str) -> String {
        format!("emb:{}", sha256_hex(normalized_query))
    }

    /// Look up the vector for a normalized query
    pub async fn get(&self, normalized_query: &str) -> Option<Vec<f32>> {
        let cached = self
            .inner
            .get_json(&Self::key(normalized_query))
            .await
            .ok()
            .flatten();
        match cached.and_then(|json| serde_json::from_str::<Vec<f32>>(&json).ok()) {
            Some(vector) => {
                self.counters.hit();
                Some(vector)
            }
            None => {
                self.counters.miss();
                None
            }
        }
    }

    /// Write-through after an embedding compute
    pub async fn put(&self, normalized_query: &str, vector: &[f32]) {
        if let Ok(json) = serde_json::to_string(vector) {
            let _ = self
                .inner
                .set_json(
                    &Self::key(normalized_query),
                    &json,
                    CacheEntryConfig::with_ttl(self.ttl),
                )
                .await;
        }
    }
}

/// Two-tier response cache with generation-based bulk invalidation.
///
/// Tier 1 is in-process; tier 2 (optional) is shared. Bulk invalidation
/// bumps a generation counter baked into every key, making stale entries
/// unreachable without scanning the shared tier.
pub struct ResponseCache {
    tier1: Arc<dyn CacheProvider>,
    tier2: Option<Arc<dyn CacheProvider>>,
    ttl: Duration,
    generation: AtomicU64,
    /// Hit/miss counters surfaced by the status endpoint
    pub counters: CacheCounters,
}

impl ResponseCache {
    /// Wrap one or two cache providers as the response tiers
    pub fn new(
        tier1: Arc<dyn CacheProvider>,
        tier2: Option<Arc<dyn CacheProvider>>,
        ttl: Duration,
    ) -> Self {
        Self {
            tier1,
            tier2,
            ttl,
            generation: AtomicU64::new(0),
            counters: CacheCounters::default(),
        }
    }

    /// Compute the cache key for one request shape.
    ///
    /// `options_digest` covers limit, score threshold and filters, so
    /// differently-filtered requests never share an entry.
    pub fn key(
        &self,
        normalized_query: &str,
        mode: SearchMode,
        verbosity: Verbosity,
        fingerprint: &str,
        options_digest: &str,
    ) -> String {
        let generation = self.generation.load(Ordering::Relaxed);
        let digest = sha256_hex(&format!(
            "{normalized_query}|{}|{}|{fingerprint}|{options_digest}",
            mode.as_str(),
            verbosity.as_str()
        ));
        format!("resp:g{generation}:{digest}")
    }

    /// Look up a serialized response, promoting shared-tier hits
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Ok(Some(value)) = self.tier1.get_json(key).await {
            self.counters.hit();
            return Some(value);
        }
        if let Some(tier2) = &self.tier2 {
            if let Ok(Some(value)) = tier2.get_json(key).await {
                self.counters.hit();
                let _ = self
                    .tier1
                    .set_json(key, &value, CacheEntryConfig::with_ttl(self.ttl))
                    .await;
                return Some(value);
            }
        }
        self.counters.miss();
        None
    }

    /// Store a serialized response in both tiers
    pub async fn put(&self, key: &str, value: &str) {
        let config = CacheEntryConfig::with_ttl(self.ttl);
        let _ = self.tier1.set_json(key, value, config).await;
        if let Some(tier2) = &self.tier2 {
            let _ = tier2.set_json(key, value, config).await;
        }
    }

    /// Invalidate every cached response
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use capdex_domain::error::Result;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CacheProvider for MapCache {
        async fn get_json(&self, key: &str) -> Result<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
        async fn set_json(&self, key: &str, value: &str, _c: CacheEntryConfig) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }
        async fn clear(&self) -> Result<()> {
            self.entries.lock().unwrap().clear();
            Ok(())
        }
        fn provider_name(&self) -> &str {
            "map"
        }
    }

    #[tokio::test]
    async fn embedding_cache_roundtrip() {
        let cache = EmbeddingCache::new(Arc::new(MapCache::default()), Duration::from_secs(60));
        assert!(cache.get("buy shoes").await.is_none());
        cache.put("buy shoes", &[0.5, 0.5]).await;
        assert_eq!(cache.get("buy shoes").await, Some(vec![0.5, 0.5]));
        let stats = cache.counters.snapshot();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn generation_bump_makes_entries_unreachable() {
        let cache = ResponseCache::new(
            Arc::new(MapCache::default()),
            None,
            Duration::from_secs(60),
        );
        let key = cache.key("q", SearchMode::ToolsOnly, Verbosity::Full, "fp", "opts");
        cache.put(&key, "{}").await;
        assert_eq!(cache.get(&key).await, Some("{}".to_string()));

        cache.invalidate_all();
        let fresh_key = cache.key("q", SearchMode::ToolsOnly, Verbosity::Full, "fp", "opts");
        assert_ne!(key, fresh_key);
        assert!(cache.get(&fresh_key).await.is_none());
    }

    #[tokio::test]
    async fn verbosity_is_part_of_the_key() {
        let cache = ResponseCache::new(
            Arc::new(MapCache::default()),
            None,
            Duration::from_secs(60),
        );
        let full = cache.key("q", SearchMode::ToolsOnly, Verbosity::Full, "fp", "opts");
        let minimal = cache.key("q", SearchMode::ToolsOnly, Verbosity::Minimal, "fp", "opts");
        assert_ne!(full, minimal);
    }

    #[tokio::test]
    async fn shared_tier_hits_are_promoted() {
        let tier1 = Arc::new(MapCache::default());
        let tier2 = Arc::new(MapCache::default());
        let cache = ResponseCache::new(tier1.clone(), Some(tier2.clone()), Duration::from_secs(60));
        let key = cache.key("q", SearchMode::ToolsOnly, Verbosity::Full, "fp", "opts");

        tier2
            .set_json(&key, "{\"warm\":true}", CacheEntryConfig::default())
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, Some("{\"warm\":true}".to_string()));
        assert_eq!(
            tier1.get_json(&key).await.unwrap(),
            Some("{\"warm\":true}".to_string())
        );
    }
}
