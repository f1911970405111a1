//! Selection feedback handler

use axum::extract::State;
use axum::{Extension, Json};
use capdex_domain::entities::CallerIdentity;
use serde_json::{json, Value};

use crate::dto::FeedbackBody;
use crate::error::ApiError;
use crate::state::{AppState, RequestContext};

/// `POST /api/v1/search/feedback`
pub async fn feedback_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<Value>, ApiError> {
    state
        .search
        .record_selection(
            &caller,
            &body.search_id,
            body.position,
            body.selected_id,
            body.satisfaction,
        )
        .await
        .map_err(|e| ApiError::from_domain(e, &ctx.request_id))?;

    Ok(Json(json!({
        "status": "recorded",
        "search_id": body.search_id,
    })))
}
