//! Liveness and readiness handler
//!
//! Unauthenticated: load balancers probe this before any credential exists.

use axum::extract::State;
use axum::Json;
use capdex_infrastructure::health::HealthReport;

use crate::state::AppState;

/// `GET /api/v1/health`
pub async fn health_get(State(state): State<AppState>) -> Json<HealthReport> {
    let mut components = vec![("api", true)];
    components.extend(state.search.component_health().await);
    Json(HealthReport::from_components(components))
}
