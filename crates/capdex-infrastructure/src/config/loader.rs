//! Configuration loader
//!
//! Merges, in override order: struct defaults, a TOML file, nested
//! `CAPDEX_*` environment variables, and finally the flat variable names
//! the deployment surface documents (`EMBEDDING_MODEL`, `INDEX_DIR`, ...).

use crate::config::types::AppConfig;
use capdex_domain::error::{Error, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment prefix for nested keys (e.g. `CAPDEX_SERVER_PORT`)
const CONFIG_ENV_PREFIX: &str = "CAPDEX";

/// Default config file name looked up in the working directory
const DEFAULT_CONFIG_FILENAME: &str = "capdex.toml";

/// Configuration loader service
#[derive(Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader using the default file lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from all sources
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        let path = self
            .config_path
            .clone()
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILENAME)));
        if let Some(path) = path {
            if path.exists() {
                info!("loading configuration from {}", path.display());
                figment = figment.merge(Toml::file(&path));
            }
        }

        figment = figment.merge(Env::prefixed(&format!("{CONFIG_ENV_PREFIX}_")).split("_"));

        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| Error::config_with_source("failed to extract configuration", e))?;

        apply_flat_env_overrides(&mut config)?;
        validate(&config)?;
        Ok(config)
    }
}

/// Overlay the documented flat environment variables.
fn apply_flat_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(model) = env::var("EMBEDDING_MODEL") {
        config.embedding.model = model;
    }
    if let Ok(value) = env::var("EMBEDDING_DIMENSION") {
        config.embedding.dimension = parse_env("EMBEDDING_DIMENSION", &value)?;
    }
    if let Ok(dir) = env::var("INDEX_DIR") {
        config.index.dir = Some(PathBuf::from(dir));
    }
    if let Ok(value) = env::var("RESPONSE_CACHE_TTL_SECONDS") {
        config.cache.response_ttl_seconds = parse_env("RESPONSE_CACHE_TTL_SECONDS", &value)?;
    }
    if let Ok(value) = env::var("EMBEDDING_CACHE_TTL_SECONDS") {
        config.cache.embedding_ttl_seconds = parse_env("EMBEDDING_CACHE_TTL_SECONDS", &value)?;
    }
    if let Ok(value) = env::var("RATE_LIMIT_DEFAULT_PER_MINUTE") {
        config.limits.rate_limit_default_per_minute =
            parse_env("RATE_LIMIT_DEFAULT_PER_MINUTE", &value)?;
    }
    if let Ok(value) = env::var("RATE_LIMIT_BURST") {
        config.limits.rate_limit_burst = parse_env("RATE_LIMIT_BURST", &value)?;
    }
    if let Ok(value) = env::var("REQUEST_TIMEOUT_MS") {
        config.limits.request_timeout_ms = parse_env("REQUEST_TIMEOUT_MS", &value)?;
    }
    if let Ok(value) = env::var("OVER_FETCH_FACTOR") {
        config.limits.over_fetch_factor = parse_env("OVER_FETCH_FACTOR", &value)?;
    }
    if let Ok(value) = env::var("FEEDBACK_REFRESH_SECONDS") {
        config.feedback.refresh_seconds = parse_env("FEEDBACK_REFRESH_SECONDS", &value)?;
    }
    if let Ok(value) = env::var("BOOST_BOUNDS") {
        let (min, max) = parse_boost_bounds(&value)?;
        config.feedback.boost_min = min;
        config.feedback.boost_max = max;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid value for {name}: '{value}'")))
}

/// Accepts `[-0.1, 0.2]` or `-0.1,0.2`.
fn parse_boost_bounds(value: &str) -> Result<(f64, f64)> {
    let trimmed = value.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(Error::config(format!(
            "BOOST_BOUNDS must be two floats, got '{value}'"
        )));
    }
    let min: f64 = parse_env("BOOST_BOUNDS", parts[0])?;
    let max: f64 = parse_env("BOOST_BOUNDS", parts[1])?;
    if min > max {
        return Err(Error::config("BOOST_BOUNDS min must not exceed max"));
    }
    Ok((min, max))
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.embedding.dimension == 0 {
        return Err(Error::config("embedding.dimension must be positive"));
    }
    if config.limits.rate_limit_default_per_minute == 0 {
        return Err(Error::config(
            "limits.rate_limit_default_per_minute must be positive",
        ));
    }
    if config.limits.request_timeout_ms == 0 {
        return Err(Error::config("limits.request_timeout_ms must be positive"));
    }
    if config.limits.over_fetch_factor == 0 {
        return Err(Error::config("limits.over_fetch_factor must be positive"));
    }
    if config.feedback.boost_min > config.feedback.boost_max {
        return Err(Error::config(
            "feedback.boost_min must not exceed feedback.boost_max",
        ));
    }
    Ok(())
}
