//! Append-only feedback records
//!
//! Search-query records capture what was returned; selection records capture
//! what the caller picked. Both are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of entity a boost target points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A service
    Service,
    /// A tool
    Tool,
}

/// One returned result position.
///
/// Tool results carry both ids: a selection may name either the tool or its
/// owning service, and a click is evidence for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnedTarget {
    /// Service at this position (owning service, for tool hits)
    pub service_id: i64,
    /// Tool at this position, when the hit was a tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<i64>,
}

impl ReturnedTarget {
    /// A pure service result
    pub fn service(service_id: i64) -> Self {
        Self {
            service_id,
            tool_id: None,
        }
    }

    /// A tool result with its owning service
    pub fn tool(service_id: i64, tool_id: i64) -> Self {
        Self {
            service_id,
            tool_id: Some(tool_id),
        }
    }

    /// True when `id` names either entity at this position
    pub fn matches(&self, id: i64) -> bool {
        self.service_id == id || self.tool_id == Some(id)
    }

    /// The boost targets this position contributes evidence for
    pub fn boost_targets(&self) -> impl Iterator<Item = (TargetKind, i64)> {
        std::iter::once((TargetKind::Service, self.service_id))
            .chain(self.tool_id.map(|t| (TargetKind::Tool, t)))
    }
}

/// Append-only record of one executed search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryRecord {
    /// Opaque search id handed back to the caller
    pub search_id: String,
    /// Raw query text
    pub query: String,
    /// Hash of the normalized query
    pub normalized_query_hash: String,
    /// Caller bucket key (user or key id)
    pub caller: String,
    /// Search mode used
    pub mode: String,
    /// Verbosity used
    pub verbosity: String,
    /// Returned targets in rank order (position 1 first)
    pub returned: Vec<ReturnedTarget>,
    /// Wall-clock processing time in milliseconds
    pub response_time_ms: u64,
    /// When the search ran
    pub timestamp: DateTime<Utc>,
}

/// Append-only record of one user selection against a prior search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSelectionRecord {
    /// The search this selection refers to
    pub search_id: String,
    /// 1-based position of the selected result
    pub position: usize,
    /// The full target at the selected position
    pub target: ReturnedTarget,
    /// The id the caller actually named (service or tool)
    pub selected_id: i64,
    /// Caller bucket key
    pub caller: String,
    /// Optional satisfaction flag supplied by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied: Option<bool>,
    /// When the selection was recorded
    pub timestamp: DateTime<Utc>,
}
