//! API error envelope
//!
//! `{ "error": "<kind>", "code": "<STABLE_CODE>", "message": "...",
//! "request_id": "..." }`. The code is stable across versions, the
//! message may change. Internal failure detail stays in the server logs;
//! the caller sees a generic message and the correlation id.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use capdex_domain::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request failed validation
    ValidationError,
    /// The removed `agents_only` mode was requested
    InvalidSearchMode,
    /// No usable credential was presented
    Unauthenticated,
    /// The caller is not allowed
    Forbidden,
    /// The resource does not exist
    NotFound,
    /// Admission quota exceeded
    RateLimited,
    /// The request deadline expired
    Timeout,
    /// A back-end is down and no degraded path exists
    DependencyUnavailable,
    /// Unexpected server failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::InvalidSearchMode => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error` field: the §7 kind string
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError | Self::InvalidSearchMode => "validation",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::DependencyUnavailable => "dependency_unavailable",
            Self::InternalError => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Structured error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error kind
    pub error: String,
    /// Stable code
    pub code: ErrorCode,
    /// Human-readable message; may change between versions
    pub message: String,
    /// Correlation id also present in server logs
    pub request_id: String,
    /// Seconds to wait before retrying (rate limiting only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Build an error with the code's default kind
    pub fn new(code: ErrorCode, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            error: code.kind().to_string(),
            code,
            message: message.into(),
            request_id: request_id.into(),
            retry_after_secs: None,
        }
    }

    /// Map a domain error into the envelope.
    ///
    /// Internal kinds are logged with detail and surfaced generically.
    pub fn from_domain(error: Error, request_id: &str) -> Self {
        match error {
            Error::Validation { message } => {
                if message.contains("agents_only") {
                    Self::new(ErrorCode::InvalidSearchMode, message, request_id)
                } else {
                    Self::new(ErrorCode::ValidationError, message, request_id)
                }
            }
            Error::Unauthenticated { message } => {
                Self::new(ErrorCode::Unauthenticated, message, request_id)
            }
            Error::Forbidden { message } => Self::new(ErrorCode::Forbidden, message, request_id),
            Error::NotFound { resource } => Self::new(
                ErrorCode::NotFound,
                format!("{resource} not found"),
                request_id,
            ),
            Error::RateLimited { retry_after_secs } => {
                let mut api = Self::new(
                    ErrorCode::RateLimited,
                    format!("rate limit exceeded, retry after {retry_after_secs}s"),
                    request_id,
                );
                api.retry_after_secs = Some(retry_after_secs);
                api
            }
            Error::Timeout { message } => Self::new(ErrorCode::Timeout, message, request_id),
            Error::DependencyUnavailable { message } => {
                Self::new(ErrorCode::DependencyUnavailable, message, request_id)
            }
            other => {
                tracing::error!(request_id, error = %other, "internal error");
                Self::new(ErrorCode::InternalError, "internal error", request_id)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let retry_after = self.retry_after_secs;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
