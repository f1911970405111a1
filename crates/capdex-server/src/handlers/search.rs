//! Semantic search handler
//!
//! `GET`/`POST /api/v1/search`. Both verbs accept the same field names;
//! GET uses query-string parameters with repeated keys for lists.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::Query;
use capdex_application::SearchResponse;
use capdex_domain::entities::CallerIdentity;
use capdex_domain::error::Error;

use crate::dto::SearchParams;
use crate::error::ApiError;
use crate::state::{AppState, RequestContext};

/// `GET /api/v1/search`
pub async fn search_get(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(state, caller, ctx, params).await
}

/// `POST /api/v1/search`
pub async fn search_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(ctx): Extension<RequestContext>,
    Json(params): Json<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(state, caller, ctx, params).await
}

async fn run_search(
    state: AppState,
    caller: CallerIdentity,
    ctx: RequestContext,
    params: SearchParams,
) -> Result<Json<SearchResponse>, ApiError> {
    let request = params.into_request(&ctx.request_id)?;

    // The deadline covers the whole pipeline; feedback and audit writes are
    // buffered and survive an abort.
    match tokio::time::timeout(state.request_timeout, state.search.search(&caller, &request)).await
    {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(e)) => Err(ApiError::from_domain(e, &ctx.request_id)),
        Err(_) => Err(ApiError::from_domain(
            Error::timeout("search deadline expired"),
            &ctx.request_id,
        )),
    }
}
