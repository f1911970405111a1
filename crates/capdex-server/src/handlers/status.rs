//! Search subsystem status handler

use axum::extract::State;
use axum::{Extension, Json};
use capdex_application::status::SearchStatusReport;

use crate::state::{AppState, RequestContext};

/// `GET /api/v1/search/status`
pub async fn status_get(
    State(state): State<AppState>,
    Extension(_ctx): Extension<RequestContext>,
) -> Json<SearchStatusReport> {
    Json(state.search.status_report().await)
}
