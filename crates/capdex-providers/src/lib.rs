//! CAPDEX provider implementations
//!
//! Concrete adapters behind the domain ports: embedding back-ends (fastembed
//! primary, deterministic term-frequency fallback), the in-memory vector
//! index with snapshot import/export, cache providers (moka, redis, null)
//! and the in-process registry event bus.

/// Shared provider constants
pub mod constants;

/// Cache providers
pub mod cache;
/// Embedding providers
pub mod embedding;
/// Registry event bus
pub mod events;
/// Vector index providers
pub mod vector_index;
