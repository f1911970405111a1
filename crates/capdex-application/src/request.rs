//! Search request shape and validation

use capdex_domain::constants::{
    DEFAULT_MIN_SCORE, DEFAULT_SEARCH_LIMIT, MAX_QUERY_CHARS, MAX_SEARCH_LIMIT,
};
use capdex_domain::error::{Error, Result};
use capdex_domain::value_objects::{SearchMode, Verbosity};

/// A validated search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query text, 1..=10000 chars
    pub query: String,
    /// Result cap, 1..=100
    pub limit: usize,
    /// Minimum final score, 0..=1
    pub min_score: f64,
    /// Which index(es) to consult
    pub mode: SearchMode,
    /// Response size tier
    pub verbosity: Verbosity,
    /// Attach the integration/agent-protocol block to each result
    pub include_orchestration: bool,
    /// Keep only services tagged with one of these domains
    pub domains: Vec<String>,
    /// Keep only services advertising a capability containing one of these
    /// substrings
    pub capabilities: Vec<String>,
    /// Drop these service ids
    pub exclude_services: Vec<i64>,
    /// Keep only services at or above this dotted version
    pub min_version: Option<String>,
}

impl SearchRequest {
    /// A request with defaults for everything but the query
    pub fn with_query<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
            mode: SearchMode::default(),
            verbosity: Verbosity::default(),
            include_orchestration: false,
            domains: Vec::new(),
            capabilities: Vec::new(),
            exclude_services: Vec::new(),
            min_version: None,
        }
    }

    /// Validate bounds; returns the request untouched on success
    pub fn validate(&self) -> Result<()> {
        if self.query.is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        let chars = self.query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(Error::validation(format!(
                "query length {chars} exceeds maximum of {MAX_QUERY_CHARS} characters"
            )));
        }
        if self.limit < 1 || self.limit > MAX_SEARCH_LIMIT {
            return Err(Error::validation(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(Error::validation("min_score must be between 0 and 1"));
        }
        Ok(())
    }
}
