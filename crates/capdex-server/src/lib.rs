//! CAPDEX HTTP server
//!
//! axum routes, handlers and middleware over the search runtime. The
//! library surface exists so integration tests can drive the exact router
//! the binary serves.

/// API error envelope
pub mod error;
/// Request/response DTOs
pub mod dto;
/// Request handlers
pub mod handlers;
/// Auth & rate-limit middleware
pub mod middleware;
/// Route table
pub mod routes;
/// Shared handler state
pub mod state;

pub use routes::app;
pub use state::AppState;
