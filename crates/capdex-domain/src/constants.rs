//! Domain-wide defaults and limits
//!
//! Values here are the contract-level defaults; deployment configuration may
//! override most of them (see the infrastructure config types).

/// Default number of results returned when the caller does not set a limit
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Largest accepted `limit` value
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 10_000;

/// Multiplier applied to `limit` when querying an index, to leave headroom
/// for policy filtering
pub const DEFAULT_OVER_FETCH_FACTOR: usize = 3;

/// Default minimum similarity score
pub const DEFAULT_MIN_SCORE: f64 = 0.0;

/// Embedding cache time-to-live in seconds (24h)
pub const DEFAULT_EMBEDDING_CACHE_TTL_SECS: u64 = 86_400;

/// Response cache time-to-live in seconds (1h)
pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 3_600;

/// Default per-identity admission quota per minute
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Default burst capacity on top of the steady refill rate
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;

/// Default request deadline in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Lower bound of the feedback boost factor
pub const DEFAULT_BOOST_MIN: f64 = -0.1;

/// Upper bound of the feedback boost factor
pub const DEFAULT_BOOST_MAX: f64 = 0.2;

/// Seconds between feedback boost recomputations
pub const DEFAULT_FEEDBACK_REFRESH_SECS: u64 = 900;

/// Upper bound on candidates examined by the keyword fallback scan
pub const DEFAULT_KEYWORD_SCAN_LIMIT: usize = 500;

/// Batch size used when streaming registry rows through the embedder during
/// a full rebuild
pub const DEFAULT_REBUILD_BATCH_SIZE: usize = 32;

/// Scope that lets a caller see deprecated services in search results
pub const SCOPE_INCLUDE_DEPRECATED: &str = "include_deprecated";
