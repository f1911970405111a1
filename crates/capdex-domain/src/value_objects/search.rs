//! Search-related value objects

use crate::entities::feedback::TargetKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which index(es) a search consults and how results compose.
///
/// The historical `agents_only` mode is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Search the tools index; resolve each hit's owning service
    ToolsOnly,
    /// Search both indexes; interleave by final score
    AgentsAndTools,
    /// Search the derived co-invocation index; degrades to tools when empty
    Workflows,
    /// Search services, scoring capability entries individually
    Capabilities,
}

impl SearchMode {
    /// Parse a wire-format mode string
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "tools_only" => Ok(Self::ToolsOnly),
            "agents_and_tools" => Ok(Self::AgentsAndTools),
            "workflows" => Ok(Self::Workflows),
            "capabilities" => Ok(Self::Capabilities),
            "agents_only" => Err(Error::validation(
                "search_mode 'agents_only' is no longer supported",
            )),
            other => Err(Error::validation(format!("unknown search_mode '{other}'"))),
        }
    }

    /// Wire-format string of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolsOnly => "tools_only",
            Self::AgentsAndTools => "agents_and_tools",
            Self::Workflows => "workflows",
            Self::Capabilities => "capabilities",
        }
    }
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::ToolsOnly
    }
}

/// Caller-chosen response size tier. `full` ⊇ `compact` ⊇ `minimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Complete schemas and example calls
    Full,
    /// Schemas and long example calls omitted
    Compact,
    /// Name, id, description snippet and score only
    Minimal,
}

impl Verbosity {
    /// Parse a wire-format verbosity string
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "minimal" => Ok(Self::Minimal),
            other => Err(Error::validation(format!("unknown response_mode '{other}'"))),
        }
    }

    /// Wire-format string of this verbosity
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Compact => "compact",
            Self::Minimal => "minimal",
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Full
    }
}

/// A raw similarity hit from a vector index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredHit {
    /// Domain id of the hit
    pub id: i64,
    /// Kind of entity the id refers to
    pub kind: TargetKind,
    /// Cosine similarity in `[0, 1]`
    pub similarity: f64,
}
