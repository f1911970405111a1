//! Request DTOs
//!
//! The search surface accepts GET (query-string, repeated list params) and
//! POST (JSON body) with the same field names; both deserialize into
//! [`SearchParams`] and validate into the application request.

use capdex_application::SearchRequest;
use capdex_domain::value_objects::{SearchMode, Verbosity};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};

/// Wire-format search parameters
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchParams {
    /// Query text (required)
    pub query: Option<String>,
    /// Result cap, 1..=100
    pub limit: Option<usize>,
    /// Minimum final score, 0..=1
    pub min_score: Option<f64>,
    /// Search mode (default `tools_only`)
    pub search_mode: Option<String>,
    /// Response verbosity (`full`, `compact`, `minimal`)
    pub response_mode: Option<String>,
    /// Attach the orchestration block
    pub include_orchestration: Option<bool>,
    /// Domain filter
    pub domains: Vec<String>,
    /// Capability substring filter
    pub capabilities: Vec<String>,
    /// Service ids to exclude
    pub exclude_services: Vec<i64>,
    /// Minimum service version
    pub min_version: Option<String>,
}

impl SearchParams {
    /// Validate into an application request
    pub fn into_request(self, request_id: &str) -> Result<SearchRequest, ApiError> {
        let query = self.query.unwrap_or_default();
        if query.is_empty() {
            return Err(ApiError::new(
                ErrorCode::ValidationError,
                "query is required",
                request_id,
            ));
        }

        let mode = match self.search_mode.as_deref() {
            None => SearchMode::default(),
            Some(raw) => SearchMode::parse(raw)
                .map_err(|e| ApiError::from_domain(e, request_id))?,
        };
        let verbosity = match self.response_mode.as_deref() {
            None => Verbosity::default(),
            Some(raw) => Verbosity::parse(raw)
                .map_err(|e| ApiError::from_domain(e, request_id))?,
        };

        let mut request = SearchRequest::with_query(query);
        if let Some(limit) = self.limit {
            request.limit = limit;
        }
        if let Some(min_score) = self.min_score {
            request.min_score = min_score;
        }
        request.mode = mode;
        request.verbosity = verbosity;
        request.include_orchestration = self.include_orchestration.unwrap_or(false);
        request.domains = self.domains;
        request.capabilities = self.capabilities;
        request.exclude_services = self.exclude_services;
        request.min_version = self.min_version;

        request
            .validate()
            .map_err(|e| ApiError::from_domain(e, request_id))?;
        Ok(request)
    }
}

/// Body of `POST /api/v1/search/feedback`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackBody {
    /// The search id from a prior response's metadata
    pub search_id: String,
    /// 1-based position of the selected result
    pub position: usize,
    /// Service or tool id at that position
    pub selected_id: i64,
    /// Milliseconds the caller took to select (recorded but unused)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_time_ms: Option<u64>,
    /// Whether the caller was satisfied with the selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<bool>,
}

/// Query parameters of `GET /api/v1/search/similar/{service_id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimilarParams {
    /// Result cap, defaults to 10
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_params_use_defaults() {
        let params = SearchParams {
            query: Some("buy shoes".into()),
            ..Default::default()
        };
        let request = params.into_request("r1").unwrap();
        assert_eq!(request.limit, 10);
        assert_eq!(request.mode, SearchMode::ToolsOnly);
        assert_eq!(request.verbosity, Verbosity::Full);
        assert!(!request.include_orchestration);
    }

    #[test]
    fn missing_query_is_a_validation_error() {
        let err = SearchParams::default().into_request("r1").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn agents_only_is_rejected_with_invalid_search_mode() {
        let params = SearchParams {
            query: Some("q".into()),
            search_mode: Some("agents_only".into()),
            ..Default::default()
        };
        let err = params.into_request("r1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSearchMode);
    }

    #[test]
    fn unknown_response_mode_is_rejected() {
        let params = SearchParams {
            query: Some("q".into()),
            response_mode: Some("huge".into()),
            ..Default::default()
        };
        assert!(params.into_request("r1").is_err());
    }

    #[test]
    fn list_params_flow_through() {
        let params = SearchParams {
            query: Some("q".into()),
            domains: vec!["retail".into()],
            exclude_services: vec![4, 5],
            ..Default::default()
        };
        let request = params.into_request("r1").unwrap();
        assert_eq!(request.domains, vec!["retail".to_string()]);
        assert_eq!(request.exclude_services, vec![4, 5]);
    }
}
