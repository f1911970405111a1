//! Runtime status shared between the pipeline and the controller
//!
//! The controller records rebuild outcomes here; the status endpoint reads
//! them without touching controller internals. In-flight requests are never
//! affected by a failed rebuild; it only shows up in this report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

/// Hit/miss counters for one cache
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    /// Record a hit
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss
    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters as (hits, misses, hit_rate)
    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

/// Serializable cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

/// Mutable rebuild status written by the invalidation controller
#[derive(Debug, Default)]
pub struct RuntimeStatus {
    stale: AtomicBool,
    last_rebuild: RwLock<Option<DateTime<Utc>>>,
    last_rebuild_error: RwLock<Option<String>>,
}

impl RuntimeStatus {
    /// Create a fresh status record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful rebuild
    pub fn record_rebuild_success(&self, at: DateTime<Utc>) {
        self.stale.store(false, Ordering::Relaxed);
        if let Ok(mut last) = self.last_rebuild.write() {
            *last = Some(at);
        }
        if let Ok(mut err) = self.last_rebuild_error.write() {
            *err = None;
        }
    }

    /// Record a failed rebuild; indexes keep serving their previous state
    pub fn record_rebuild_failure(&self, error: String) {
        self.stale.store(true, Ordering::Relaxed);
        if let Ok(mut err) = self.last_rebuild_error.write() {
            *err = Some(error);
        }
    }

    /// True while indexes lag the registry
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Relaxed)
    }

    /// When the last successful rebuild finished
    pub fn last_rebuild(&self) -> Option<DateTime<Utc>> {
        self.last_rebuild.read().ok().and_then(|v| *v)
    }

    /// The last rebuild error, if the most recent rebuild failed
    pub fn last_rebuild_error(&self) -> Option<String> {
        self.last_rebuild_error.read().ok().and_then(|v| v.clone())
    }
}

/// The `/search/status` report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatusReport {
    /// Vectors in the services index
    pub services_index_size: usize,
    /// Vectors in the tools index
    pub tools_index_size: usize,
    /// Vectors in the workflow index
    pub workflows_index_size: usize,
    /// Embedding back-end bound at startup (`primary` or `fallback`)
    pub embedding_backend: String,
    /// Embedding model identifier
    pub embedding_model: String,
    /// When the last successful rebuild finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rebuild_at: Option<DateTime<Utc>>,
    /// True while indexes lag the registry
    pub index_stale: bool,
    /// The last rebuild error, when one is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rebuild_error: Option<String>,
    /// Embedding cache statistics
    pub embedding_cache: CacheStats,
    /// Response cache statistics
    pub response_cache: CacheStats,
}
