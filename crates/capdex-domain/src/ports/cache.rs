//! Cache provider port

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Per-entry cache options
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheEntryConfig {
    /// Entry time-to-live; `None` uses the cache's default
    pub ttl: Option<Duration>,
}

impl CacheEntryConfig {
    /// Entry config with an explicit TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// Contract for cache back-ends.
///
/// Values are serialized JSON strings; a cold miss must always be
/// recoverable by recomputing, so failures here degrade rather than abort
/// the request.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch a cached JSON value
    async fn get_json(&self, key: &str) -> Result<Option<String>>;

    /// Store a JSON value
    async fn set_json(&self, key: &str, value: &str, config: CacheEntryConfig) -> Result<()>;

    /// Remove one entry; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Implementation name for diagnostics
    fn provider_name(&self) -> &str;
}
