//! Feedback store port

use crate::entities::feedback::{SearchQueryRecord, UserSelectionRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Append-only log of searches and user selections.
///
/// `log_selection` validates against the recorded search: an unknown search
/// id, an out-of-range position, or an id that names neither the tool nor
/// the service returned at that position is a validation error.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Record an executed search; the record's `search_id` must be unique
    async fn log_search(&self, record: SearchQueryRecord) -> Result<()>;

    /// Validate and record a user selection against a prior search
    async fn log_selection(
        &self,
        search_id: &str,
        position: usize,
        selected_id: i64,
        caller: &str,
        satisfied: Option<bool>,
    ) -> Result<UserSelectionRecord>;

    /// Search records newer than `since`, for boost recomputation
    async fn searches_since(&self, since: DateTime<Utc>) -> Result<Vec<SearchQueryRecord>>;

    /// Selection records newer than `since`, for boost recomputation
    async fn selections_since(&self, since: DateTime<Utc>) -> Result<Vec<UserSelectionRecord>>;
}
