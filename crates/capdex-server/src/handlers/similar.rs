//! Neighboring services handler

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use capdex_application::response::SimilarServicesResponse;
use capdex_domain::constants::DEFAULT_SEARCH_LIMIT;
use capdex_domain::entities::CallerIdentity;

use crate::dto::SimilarParams;
use crate::error::ApiError;
use crate::state::{AppState, RequestContext};

/// `GET /api/v1/search/similar/{service_id}`
pub async fn similar_get(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(ctx): Extension<RequestContext>,
    Path(service_id): Path<i64>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarServicesResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 100);
    state
        .search
        .similar_services(&caller, service_id, limit)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_domain(e, &ctx.request_id))
}
