//! Response shaping
//!
//! Turns enriched, ranked candidates into the wire envelope at the caller's
//! chosen verbosity. Shaping is pure and only ever removes detail: the id
//! and rank sequence of a response is identical across verbosity tiers.

use capdex_domain::entities::service::{AgentProtocol, Capability, IntegrationDetails, ServiceKind};
use capdex_domain::entities::Tool;
use capdex_domain::value_objects::{ServiceBundle, Verbosity};
use serde::{Deserialize, Serialize};

/// Characters kept by the minimal-tier description snippet
const SNIPPET_CHARS: usize = 160;

/// Service fields surfaced in a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceView {
    /// Service id
    pub id: i64,
    /// Service name
    pub name: String,
    /// Full description (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Description snippet (minimal tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// Service kind (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ServiceKind>,
    /// Service version (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Invocation endpoint (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Capabilities (full/compact tiers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
    /// Domain tags (full/compact tiers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    /// Deprecation notice (full tier, deprecated services only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_notice: Option<String>,
}

/// Tool fields surfaced in a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolView {
    /// Tool id
    pub id: i64,
    /// Tool name
    pub name: String,
    /// Full description (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Description snippet (minimal tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// Input schema (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
    /// Output schema (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Example calls (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_calls: Option<serde_json::Value>,
    /// Endpoint pattern (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_pattern: Option<String>,
    /// Tool version (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

/// Integration fields surfaced in the orchestration block.
///
/// `auth_config` is deliberately never serialized out; it may carry
/// credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationView {
    /// Base endpoint for invocation
    pub base_endpoint: String,
    /// Authentication method the service expects
    pub auth_method: String,
    /// Access protocol (full/compact tiers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_protocol: Option<String>,
    /// Advisory rate-limit hints (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_hints: Option<serde_json::Value>,
    /// Health check endpoint (full tier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_endpoint: Option<String>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Owning / matched service
    pub service: ServiceView,
    /// The matched tool, for tool-index hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_tool: Option<ToolView>,
    /// The best-scoring capability, for capabilities mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_capability: Option<Capability>,
    /// Final score after feedback boost
    pub score: f64,
    /// Raw semantic similarity
    pub semantic_score: f64,
    /// Boost applied on top of the semantic score
    pub feedback_boost: f64,
    /// 1-based rank position
    pub rank: usize,
    /// `1 - score`
    pub distance: f64,
    /// Orchestration block (only with `include_orchestration`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_details: Option<IntegrationView>,
    /// Orchestration block (only with `include_orchestration`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_protocol: Option<AgentProtocol>,
}

/// Response metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Opaque id for feedback correlation
    pub search_id: String,
    /// Wall-clock processing time
    pub processing_time_ms: u64,
    /// Whether this response came from the response cache
    pub cache_hit: bool,
    /// `primary` or `fallback`
    pub embedding_backend: String,
    /// `vector` or `keyword`
    pub search_backend: String,
    /// Set when a mode degraded into another one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
}

/// The search response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Echo of the query text
    pub query: String,
    /// Mode the search actually used
    pub search_mode: String,
    /// Ranked results
    pub results: Vec<SearchResult>,
    /// Number of results returned
    pub total_results: usize,
    /// Response metadata
    pub metadata: SearchMetadata,
}

/// Response of the similar-services endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarServicesResponse {
    /// The anchor service
    pub service_id: i64,
    /// Neighboring services, best first
    pub results: Vec<SearchResult>,
    /// Number of results returned
    pub total_results: usize,
}

/// First `SNIPPET_CHARS` characters of a description
fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Shape a service for one verbosity tier
pub fn shape_service(bundle: &ServiceBundle, verbosity: Verbosity) -> ServiceView {
    let service = &bundle.service;
    match verbosity {
        Verbosity::Minimal => ServiceView {
            id: service.id,
            name: service.name.clone(),
            description: None,
            short_description: Some(snippet(&service.description)),
            kind: None,
            version: None,
            endpoint: None,
            capabilities: Vec::new(),
            domains: Vec::new(),
            deprecation_notice: None,
        },
        Verbosity::Compact => ServiceView {
            id: service.id,
            name: service.name.clone(),
            description: Some(service.description.clone()),
            short_description: None,
            kind: Some(service.kind),
            version: Some(service.version.clone()),
            endpoint: None,
            capabilities: service.capabilities.clone(),
            domains: service.domains.clone(),
            deprecation_notice: None,
        },
        Verbosity::Full => ServiceView {
            id: service.id,
            name: service.name.clone(),
            description: Some(service.description.clone()),
            short_description: None,
            kind: Some(service.kind),
            version: Some(service.version.clone()),
            endpoint: Some(service.endpoint.clone()),
            capabilities: service.capabilities.clone(),
            domains: service.domains.clone(),
            deprecation_notice: service.deprecation_notice.clone(),
        },
    }
}

/// Shape a tool for one verbosity tier
pub fn shape_tool(tool: &Tool, verbosity: Verbosity) -> ToolView {
    match verbosity {
        Verbosity::Minimal => ToolView {
            id: tool.id,
            name: tool.name.clone(),
            description: None,
            short_description: Some(snippet(&tool.description)),
            input_schema: None,
            output_schema: None,
            example_calls: None,
            endpoint_pattern: None,
            tool_version: None,
        },
        Verbosity::Compact => ToolView {
            id: tool.id,
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            short_description: None,
            input_schema: None,
            output_schema: None,
            example_calls: None,
            endpoint_pattern: tool.endpoint_pattern.clone(),
            tool_version: tool.tool_version.clone(),
        },
        Verbosity::Full => ToolView {
            id: tool.id,
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            short_description: None,
            input_schema: tool.input_schema.clone(),
            output_schema: tool.output_schema.clone(),
            example_calls: tool
                .example_calls
                .as_ref()
                .map(|e| serde_json::to_value(e).unwrap_or(serde_json::Value::Null)),
            endpoint_pattern: tool.endpoint_pattern.clone(),
            tool_version: tool.tool_version.clone(),
        },
    }
}

/// Shape the integration half of the orchestration block
pub fn shape_integration(
    integration: &IntegrationDetails,
    verbosity: Verbosity,
) -> IntegrationView {
    match verbosity {
        Verbosity::Minimal => IntegrationView {
            base_endpoint: integration.base_endpoint.clone(),
            auth_method: integration.auth_method.clone(),
            access_protocol: None,
            rate_limit_hints: None,
            health_endpoint: None,
        },
        Verbosity::Compact => IntegrationView {
            base_endpoint: integration.base_endpoint.clone(),
            auth_method: integration.auth_method.clone(),
            access_protocol: Some(integration.access_protocol.clone()),
            rate_limit_hints: None,
            health_endpoint: None,
        },
        Verbosity::Full => IntegrationView {
            base_endpoint: integration.base_endpoint.clone(),
            auth_method: integration.auth_method.clone(),
            access_protocol: Some(integration.access_protocol.clone()),
            rate_limit_hints: if integration.rate_limit_hints.is_empty() {
                None
            } else {
                serde_json::to_value(&integration.rate_limit_hints).ok()
            },
            health_endpoint: integration.health_endpoint.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdex_domain::entities::service::{Service, ServiceStatus, Visibility};
    use serde_json::json;

    fn bundle() -> ServiceBundle {
        ServiceBundle {
            service: Service {
                id: 1,
                name: "PaymentsHub".into(),
                description: "central payment processing".into(),
                kind: ServiceKind::Api,
                status: ServiceStatus::Active,
                visibility: Visibility::Internal,
                version: "2.1".into(),
                endpoint: "https://pay.internal".into(),
                capabilities: vec![Capability {
                    name: "charge".into(),
                    description: "charge a card".into(),
                }],
                domains: vec!["finance".into()],
                interaction_modes: vec![],
                policy_ids: vec![],
                deprecated_at: None,
                deprecation_notice: None,
                timeout_ms: None,
                retry_policy: None,
                success_criteria: None,
            },
            integration: Some(IntegrationDetails {
                access_protocol: "http".into(),
                base_endpoint: "https://pay.internal/api".into(),
                auth_method: "oauth2".into(),
                auth_config: [("client_secret".to_string(), json!("sssh"))].into(),
                rate_limit_hints: Default::default(),
                esb_routing: None,
                health_endpoint: None,
            }),
            agent_protocol: None,
            policies: vec![],
            tools: vec![],
        }
    }

    fn tool() -> Tool {
        Tool {
            id: 10,
            service_id: 1,
            name: "charge_card".into(),
            description: "charge a payment card".into(),
            input_schema: Some(json!({"type": "object"})),
            output_schema: Some(json!({"type": "object"})),
            example_calls: None,
            endpoint_pattern: Some("/charge".into()),
            is_active: true,
            tool_version: Some("1".into()),
        }
    }

    #[test]
    fn compact_drops_schemas_but_keeps_description() {
        let view = shape_tool(&tool(), Verbosity::Compact);
        assert!(view.input_schema.is_none());
        assert!(view.output_schema.is_none());
        assert!(view.example_calls.is_none());
        assert_eq!(view.description.as_deref(), Some("charge a payment card"));
    }

    #[test]
    fn full_keeps_schemas() {
        let view = shape_tool(&tool(), Verbosity::Full);
        assert!(view.input_schema.is_some());
        assert!(view.output_schema.is_some());
    }

    #[test]
    fn minimal_service_is_a_snippet_only() {
        let view = shape_service(&bundle(), Verbosity::Minimal);
        assert!(view.description.is_none());
        assert!(view.short_description.is_some());
        assert!(view.capabilities.is_empty());
        assert!(view.endpoint.is_none());
    }

    #[test]
    fn verbosity_strictly_shrinks_serialized_size() {
        let b = bundle();
        let full = serde_json::to_string(&shape_service(&b, Verbosity::Full)).unwrap();
        let compact = serde_json::to_string(&shape_service(&b, Verbosity::Compact)).unwrap();
        let minimal = serde_json::to_string(&shape_service(&b, Verbosity::Minimal)).unwrap();
        assert!(full.len() > compact.len());
        assert!(compact.len() > minimal.len());
    }

    #[test]
    fn auth_config_never_leaves_the_process() {
        let b = bundle();
        for verbosity in [Verbosity::Full, Verbosity::Compact, Verbosity::Minimal] {
            let view = shape_integration(b.integration.as_ref().unwrap(), verbosity);
            let json = serde_json::to_string(&view).unwrap();
            assert!(!json.contains("client_secret"));
            assert!(!json.contains("sssh"));
        }
    }

    #[test]
    fn snippet_truncates_long_text() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.chars().count() <= SNIPPET_CHARS + 1);
    }
}
