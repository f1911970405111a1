//! Request handlers

/// Selection feedback
pub mod feedback;
/// Liveness and readiness
pub mod health;
/// Semantic search
pub mod search;
/// Neighboring services
pub mod similar;
/// Search subsystem status
pub mod status;
