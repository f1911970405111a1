//! Null cache provider
//!
//! Stores nothing. Used when a cache tier is disabled and in tests that
//! exercise cold-start behavior.

use async_trait::async_trait;
use capdex_domain::error::Result;
use capdex_domain::ports::{CacheEntryConfig, CacheProvider};

/// Cache provider that never stores anything
#[derive(Debug, Default, Clone)]
pub struct NullCacheProvider;

impl NullCacheProvider {
    /// Create a null cache provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheProvider for NullCacheProvider {
    async fn get_json(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set_json(&self, _key: &str, _value: &str, _config: CacheEntryConfig) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}
