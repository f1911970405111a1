//! CAPDEX infrastructure layer
//!
//! Cross-cutting technical concerns: configuration loading, logging setup,
//! the auth & rate-limit gate, the in-memory registry projection and
//! feedback store, index snapshot persistence, the buffered audit writer,
//! component health, and the bootstrap that wires the whole runtime.

/// Buffered audit writer
pub mod audit;
/// Auth & rate-limit gate
pub mod auth;
/// Runtime wiring
pub mod bootstrap;
/// Configuration loading and types
pub mod config;
/// In-memory feedback store
pub mod feedback;
/// Component health aggregation
pub mod health;
/// Structured logging with tracing
pub mod logging;
/// Registry store and projection
pub mod registry;
/// Index snapshot persistence
pub mod snapshot;

pub use bootstrap::{build_runtime, Runtime};
pub use config::AppConfig;
