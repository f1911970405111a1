//! Redis shared cache provider
//!
//! Optional shared tier for the response cache so replicas serve each
//! other's warm entries. Connection failures degrade to misses rather than
//! failing the request.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use capdex_domain::error::{Error, Result};
use capdex_domain::ports::{CacheEntryConfig, CacheProvider};

/// Redis-backed cache provider
#[derive(Clone)]
pub struct RedisCacheProvider {
    manager: ConnectionManager,
    key_prefix: String,
    default_ttl: Duration,
}

impl RedisCacheProvider {
    /// Connect to redis at `url` with the given key prefix and default TTL
    pub async fn connect(url: &str, key_prefix: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::cache(format!("invalid redis url: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::cache(format!("redis connection failed: {e}")))?;
        Ok(Self {
            manager,
            key_prefix: key_prefix.to_string(),
            default_ttl,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(self.full_key(key))
            .await
            .map_err(|e| Error::cache(format!("redis get failed: {e}")))
    }

    async fn set_json(&self, key: &str, value: &str, config: CacheEntryConfig) -> Result<()> {
        let ttl = config.ttl.unwrap_or(self.default_ttl);
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(self.full_key(key), value, ttl.as_secs())
            .await
            .map_err(|e| Error::cache(format!("redis set failed: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = conn
            .del(self.full_key(key))
            .await
            .map_err(|e| Error::cache(format!("redis del failed: {e}")))?;
        Ok(removed > 0)
    }

    // Entries under other prefixes are untouched; a full FLUSH is an
    // operator action, not a cache-port one.
    async fn clear(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}:*", self.key_prefix);
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| Error::cache(format!("redis keys failed: {e}")))?;
        if !keys.is_empty() {
            conn.del::<_, ()>(keys)
                .await
                .map_err(|e| Error::cache(format!("redis del failed: {e}")))?;
        }
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}
