//! Service entity and its satellite records
//!
//! A service is the unit of registration: a named, versioned endpoint with a
//! description, capability list, domain tags and optional integration /
//! agent-protocol metadata. Tools hang off services (see
//! [`crate::entities::tool`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable integer identifier of a service
pub type ServiceId = i64;

/// What kind of thing a registered service is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Plain HTTP/REST API
    Api,
    /// LLM-backed agent operated inside the organization
    InternalAgent,
    /// LLM-backed agent operated by a third party
    ExternalAgent,
    /// Enterprise service bus endpoint
    EsbEndpoint,
    /// Legacy system wrapped for discovery
    Legacy,
    /// Standalone microservice
    Microservice,
}

impl ServiceKind {
    /// Agents are distinguished from plain APIs for mode composition
    pub fn is_agent(&self) -> bool {
        matches!(self, Self::InternalAgent | Self::ExternalAgent)
    }
}

/// Registration lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Live and discoverable
    Active,
    /// Temporarily withdrawn from discovery
    Inactive,
    /// Still invocable but slated for removal
    Deprecated,
}

/// Who may discover a service, before policy predicates run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone, including anonymous callers
    Public,
    /// Any caller with a resolved identity
    OrgWide,
    /// Any authenticated caller (the default)
    Internal,
    /// Only callers passing the attached policy predicates
    Restricted,
}

/// A named action a service advertises
///
/// Capability descriptions contribute text to the owning service's embedding
/// document and are scored individually in `capabilities` search mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name, unique within the service
    pub name: String,
    /// What the capability does
    pub description: String,
}

/// Runtime integration metadata, zero-or-one per service
///
/// Enrichment only: never participates in similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDetails {
    /// Access protocol (http, grpc, esb, ...)
    pub access_protocol: String,
    /// Base endpoint tools are invoked relative to
    pub base_endpoint: String,
    /// Authentication method the service expects
    pub auth_method: String,
    /// Opaque authentication configuration
    #[serde(default)]
    pub auth_config: HashMap<String, serde_json::Value>,
    /// Advisory rate-limit hints for callers
    #[serde(default)]
    pub rate_limit_hints: HashMap<String, serde_json::Value>,
    /// ESB routing metadata when the service is an ESB endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esb_routing: Option<HashMap<String, serde_json::Value>>,
    /// Health check endpoint, if the service exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_endpoint: Option<String>,
}

/// Agent interaction metadata, zero-or-one per service
///
/// Only meaningful for agent kinds. Enrichment only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProtocol {
    /// Message protocol the agent speaks
    pub message_protocol: String,
    /// Protocol version
    pub protocol_version: String,
    /// Whether the agent supports streamed responses
    #[serde(default)]
    pub supports_streaming: bool,
    /// Whether the agent supports asynchronous invocation
    #[serde(default)]
    pub supports_async: bool,
    /// Whether the agent supports batch invocation
    #[serde(default)]
    pub supports_batch: bool,
    /// Free-form response style hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_style: Option<String>,
}

/// A registered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Stable integer id
    pub id: ServiceId,
    /// Unique name
    pub name: String,
    /// What the service does; the main embedding text
    pub description: String,
    /// Kind of service
    pub kind: ServiceKind,
    /// Lifecycle status
    pub status: ServiceStatus,
    /// Visibility gate evaluated before policy predicates
    pub visibility: Visibility,
    /// Service version string (dotted numeric components compare)
    pub version: String,
    /// Invocation endpoint
    pub endpoint: String,
    /// Capabilities advertised by the service
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Domain tags used for filtering and embedding
    #[serde(default)]
    pub domains: Vec<String>,
    /// Optional interaction modes (sync, async, batch, ...)
    #[serde(default)]
    pub interaction_modes: Vec<String>,
    /// Ids of access policies attached to this service
    #[serde(default)]
    pub policy_ids: Vec<i64>,
    /// When the service was deprecated, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
    /// Human-readable deprecation notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_notice: Option<String>,
    /// Suggested invocation timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Suggested retry count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<u32>,
    /// Free-form success criteria for orchestrators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
}

impl Service {
    /// Deprecated services stay in the indexes so scope-holding callers can
    /// still discover them; the policy filter hides them from everyone else.
    /// Only inactive services leave the indexes entirely.
    pub fn is_indexable(&self) -> bool {
        matches!(
            self.status,
            ServiceStatus::Active | ServiceStatus::Deprecated
        )
    }

    /// Compare this service's version against a dotted minimum.
    ///
    /// Components are compared numerically left to right; missing components
    /// count as zero. Non-numeric components compare as zero.
    pub fn version_at_least(&self, min: &str) -> bool {
        let parse = |v: &str| -> Vec<u64> {
            v.split('.')
                .map(|c| c.trim().parse::<u64>().unwrap_or(0))
                .collect()
        };
        let have = parse(&self.version);
        let want = parse(min);
        let len = have.len().max(want.len());
        for i in 0..len {
            let h = have.get(i).copied().unwrap_or(0);
            let w = want.get(i).copied().unwrap_or(0);
            if h != w {
                return h > w;
            }
        }
        true
    }
}
