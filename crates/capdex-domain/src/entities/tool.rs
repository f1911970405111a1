//! Tool entity
//!
//! A tool is an invocable operation belonging to exactly one service. Tools
//! are embedded and searched separately from their owning service.

use super::service::ServiceId;
use serde::{Deserialize, Serialize};

/// Stable integer identifier of a tool
pub type ToolId = i64;

/// The registry permits `example_calls` to be either a JSON mapping or a
/// JSON sequence (or absent). The distinction is observable: the embedding
/// document emits mapping keys but only a count for sequences, so the shape
/// is preserved rather than coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleCalls {
    /// Named examples: name -> example payload
    Mapping(serde_json::Map<String, serde_json::Value>),
    /// Anonymous ordered examples
    Sequence(Vec<serde_json::Value>),
}

impl ExampleCalls {
    /// Number of examples regardless of shape
    pub fn len(&self) -> usize {
        match self {
            Self::Mapping(m) => m.len(),
            Self::Sequence(s) => s.len(),
        }
    }

    /// True when no examples are present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An invocable operation owned by a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Stable integer id
    pub id: ToolId,
    /// Owning service id; a tool cannot exist without its service
    pub service_id: ServiceId,
    /// Tool name, unique within the owning service
    pub name: String,
    /// What the tool does; the main embedding text
    pub description: String,
    /// JSON schema of the tool's input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
    /// JSON schema of the tool's output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Example invocations; mapping and sequence shapes both occur
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_calls: Option<ExampleCalls>,
    /// Endpoint pattern relative to the service's base endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_pattern: Option<String>,
    /// Whether the tool itself is enabled
    pub is_active: bool,
    /// Tool version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}
