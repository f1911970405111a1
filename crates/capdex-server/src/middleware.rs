//! Auth & rate-limit middleware
//!
//! Runs in front of every search endpoint: resolves exactly one credential
//! (bearer token, `X-API-Key` header or `api_key` query parameter) into a
//! caller identity, admits the request through the token bucket, emits the
//! api-request audit record, and stamps the rate-limit headers onto every
//! admitted response.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use capdex_infrastructure::audit::AuditRecord;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, RequestContext};

/// Credential extraction + admission for the search surface
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let endpoint = request.uri().path().to_string();

    let bearer = match bearer_token(&request) {
        Ok(token) => token,
        Err(message) => {
            let api = ApiError::new(crate::error::ErrorCode::Unauthenticated, message, &request_id);
            state.audit.push(AuditRecord::new(
                &request_id,
                "anonymous",
                &endpoint,
                "rejected_auth",
                api.code.status().as_u16(),
            ));
            return Err(api);
        }
    };
    let api_key = api_key_credential(&request);

    let caller = match state.gate.authenticate(bearer.as_deref(), api_key.as_deref()) {
        Ok(caller) => caller,
        Err(e) => {
            let api = ApiError::from_domain(e, &request_id);
            state.audit.push(AuditRecord::new(
                &request_id,
                "anonymous",
                &endpoint,
                "rejected_auth",
                api.code.status().as_u16(),
            ));
            return Err(api);
        }
    };

    let decision = match state.gate.admit(&caller) {
        Ok(decision) => decision,
        Err(e) => {
            let api = ApiError::from_domain(e, &request_id);
            state.audit.push(AuditRecord::new(
                &request_id,
                caller.bucket_key(),
                &endpoint,
                "rejected_rate_limit",
                api.code.status().as_u16(),
            ));
            return Err(api);
        }
    };

    state.audit.push(AuditRecord::new(
        &request_id,
        caller.bucket_key(),
        &endpoint,
        "admitted",
        200,
    ));

    request.extensions_mut().insert(caller);
    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        header_value(decision.limit.to_string()),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        header_value(decision.remaining.to_string()),
    );
    headers.insert(
        "X-RateLimit-Reset",
        header_value(decision.reset_secs.to_string()),
    );
    headers.insert("X-Request-Id", header_value(request_id));
    Ok(response)
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// `Authorization: Bearer <token>`; a non-Bearer scheme is an error
fn bearer_token(request: &Request) -> Result<Option<String>, &'static str> {
    let Some(value) = request.headers().get("authorization") else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| "authorization header is not valid UTF-8")?;
    match value.strip_prefix("Bearer ") {
        Some(token) => Ok(Some(token.to_string())),
        None => Err("authorization header must use the Bearer scheme"),
    }
}

/// `X-API-Key` header, or `api_key` query parameter
fn api_key_credential(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get("x-api-key") {
        if let Ok(key) = value.to_str() {
            return Some(key.to_string());
        }
    }
    let query = request.uri().query()?;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("api_key=") {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
