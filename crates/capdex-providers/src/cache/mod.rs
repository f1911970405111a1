//! Cache providers
//!
//! Moka backs the in-process tiers; redis is the optional shared response
//! tier. Null is for wiring where a tier is disabled; both caches are
//! optional from a correctness standpoint.

#[cfg(feature = "cache-moka")]
mod moka;
mod null;
#[cfg(feature = "cache-redis")]
mod redis;

#[cfg(feature = "cache-moka")]
pub use moka::MokaCacheProvider;
pub use null::NullCacheProvider;
#[cfg(feature = "cache-redis")]
pub use redis::RedisCacheProvider;
