//! Provider-level constants

/// Default maximum entries held by an in-process cache
pub const CACHE_DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Dimensions of the default fastembed model (AllMiniLML6V2)
pub const EMBEDDING_DIMENSION_FASTEMBED_DEFAULT: usize = 384;

/// Queue depth of the fastembed actor channel
pub const FASTEMBED_ACTOR_QUEUE: usize = 100;

/// Capacity of the registry event bus broadcast channel
pub const EVENT_BUS_CAPACITY: usize = 1_024;
