//! Configuration types
//!
//! Nested structs with serde defaults so a bare deployment starts with
//! sensible values; every field can be overridden from TOML or `CAPDEX_*`
//! environment variables, and the handful of flat variable names the
//! deployment surface documents (`EMBEDDING_MODEL`, `INDEX_DIR`, ...) are
//! overlaid by the loader.

use capdex_domain::constants;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// Logging setup
    pub logging: LoggingConfig,
    /// Auth gate
    pub auth: AuthConfig,
    /// Embedding back-end
    pub embedding: EmbeddingConfig,
    /// Index persistence and rebuild
    pub index: IndexConfig,
    /// Cache tiers
    pub cache: CacheConfig,
    /// Admission and pipeline limits
    pub limits: LimitsConfig,
    /// Feedback ranking
    pub feedback: FeedbackConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8460,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-formatted lines
    pub json_format: bool,
    /// Optional rolling log file path
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_output: None,
        }
    }
}

/// Auth gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    /// Expected token issuer
    pub jwt_issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Supplied by deployment configuration; with no secret set,
            // only API-key callers can authenticate.
            jwt_secret: String::new(),
            jwt_issuer: "capdex".to_string(),
        }
    }
}

/// Embedding back-end configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier; changing it forces a full rebuild on next start
    pub model: String,
    /// Vector dimensionality; must match the model
    pub dimension: usize,
    /// Seed of the fallback projection matrix
    pub fallback_seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "AllMiniLML6V2".to_string(),
            dimension: 384,
            fallback_seed: 0x5eed,
        }
    }
}

/// Index persistence and rebuild configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Snapshot directory; unset disables persistence
    pub dir: Option<PathBuf>,
    /// Documents per embedding batch during a rebuild
    pub rebuild_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: None,
            rebuild_batch_size: constants::DEFAULT_REBUILD_BATCH_SIZE,
        }
    }
}

/// Cache tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Embedding cache TTL in seconds
    pub embedding_ttl_seconds: u64,
    /// Response cache TTL in seconds
    pub response_ttl_seconds: u64,
    /// Max entries per in-process cache
    pub max_entries: u64,
    /// Optional shared response tier (redis URL)
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_ttl_seconds: constants::DEFAULT_EMBEDDING_CACHE_TTL_SECS,
            response_ttl_seconds: constants::DEFAULT_RESPONSE_CACHE_TTL_SECS,
            max_entries: 10_000,
            redis_url: None,
        }
    }
}

/// Admission and pipeline limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Default admissions per identity per minute
    pub rate_limit_default_per_minute: u32,
    /// Burst capacity on top of the steady rate
    pub rate_limit_burst: u32,
    /// Request deadline in milliseconds
    pub request_timeout_ms: u64,
    /// Index over-fetch multiplier
    pub over_fetch_factor: usize,
    /// Keyword fallback candidate bound
    pub keyword_scan_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_default_per_minute: constants::DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_burst: constants::DEFAULT_RATE_LIMIT_BURST,
            request_timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT_MS,
            over_fetch_factor: constants::DEFAULT_OVER_FETCH_FACTOR,
            keyword_scan_limit: constants::DEFAULT_KEYWORD_SCAN_LIMIT,
        }
    }
}

/// Feedback ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Seconds between boost recomputations
    pub refresh_seconds: u64,
    /// Lower boost bound
    pub boost_min: f64,
    /// Upper boost bound
    pub boost_max: f64,
    /// Empirical click probability per rank (rank 1 first); empty uses the
    /// `1/log2(rank+1)` formula
    pub position_bias: Vec<f64>,
    /// Log window in days
    pub window_days: u32,
    /// Retained search records
    pub log_capacity: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: constants::DEFAULT_FEEDBACK_REFRESH_SECS,
            boost_min: constants::DEFAULT_BOOST_MIN,
            boost_max: constants::DEFAULT_BOOST_MAX,
            position_bias: Vec::new(),
            window_days: 30,
            log_capacity: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = AppConfig::default();
        assert_eq!(config.cache.embedding_ttl_seconds, 86_400);
        assert_eq!(config.cache.response_ttl_seconds, 3_600);
        assert_eq!(config.limits.over_fetch_factor, 3);
        assert_eq!(config.limits.request_timeout_ms, 5_000);
        assert_eq!(config.feedback.refresh_seconds, 900);
        assert!((config.feedback.boost_min - -0.1).abs() < 1e-12);
        assert!((config.feedback.boost_max - 0.2).abs() < 1e-12);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
