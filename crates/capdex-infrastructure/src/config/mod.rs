//! Configuration loading and types

/// Configuration loader
pub mod loader;
/// Configuration types
pub mod types;

pub use loader::ConfigLoader;
pub use types::{
    AppConfig, AuthConfig, CacheConfig, EmbeddingConfig, FeedbackConfig, IndexConfig,
    LimitsConfig, LoggingConfig, ServerConfig,
};
