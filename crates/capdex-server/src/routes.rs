//! Route table

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{feedback, health, search, similar, status};
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Build the application router.
///
/// Everything under `/api/v1/search` sits behind the auth & rate-limit
/// middleware; `/api/v1/health` stays open for probes.
pub fn app(state: AppState) -> Router {
    let gated = Router::new()
        .route("/api/v1/search", get(search::search_get).post(search::search_post))
        .route("/api/v1/search/feedback", post(feedback::feedback_post))
        .route("/api/v1/search/status", get(status::status_get))
        .route("/api/v1/search/similar/:service_id", get(similar::similar_get))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(gated)
        .route("/api/v1/health", get(health::health_get))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
