//! Shared handler state

use capdex_application::SearchService;
use capdex_infrastructure::audit::AuditWriter;
use capdex_infrastructure::auth::AuthGate;
use capdex_infrastructure::bootstrap::Runtime;
use std::sync::Arc;
use std::time::Duration;

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// The search pipeline aggregate
    pub search: Arc<SearchService>,
    /// The auth & rate-limit gate
    pub gate: Arc<AuthGate>,
    /// Fire-and-forget audit writer
    pub audit: AuditWriter,
    /// Request deadline
    pub request_timeout: Duration,
}

impl AppState {
    /// Borrow the relevant pieces of a wired runtime
    pub fn from_runtime(runtime: &Runtime) -> Self {
        Self {
            search: runtime.search.clone(),
            gate: runtime.gate.clone(),
            audit: runtime.audit.clone(),
            request_timeout: runtime.request_timeout,
        }
    }
}

/// Per-request correlation context injected by the middleware
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id echoed in error envelopes and logs
    pub request_id: String,
}
