//! Embedding document composition
//!
//! Builds the normalized text a service or tool is embedded from. The
//! composition is part of the observable contract: the same registry state
//! must always produce the same documents, or rebuilds would not converge.

use capdex_domain::entities::{ExampleCalls, Tool};
use capdex_domain::normalize::normalize_text;
use capdex_domain::value_objects::ServiceBundle;

/// Compose the embedding document for a service.
///
/// Name, description, capability descriptions in order, domain tags in
/// order, then interaction modes.
pub fn service_document(bundle: &ServiceBundle) -> String {
    let service = &bundle.service;
    let mut parts: Vec<String> = vec![service.name.clone(), service.description.clone()];
    for capability in &service.capabilities {
        parts.push(format!("{}: {}", capability.name, capability.description));
    }
    parts.extend(service.domains.iter().cloned());
    parts.extend(service.interaction_modes.iter().cloned());
    normalize_text(&parts.join(". "))
}

/// Compose the embedding document for a tool.
///
/// Tool name, description, owning service name, then example-call keys when
/// `example_calls` is a mapping. A sequence contributes only its count;
/// the shapes are not unified, so the divergence stays observable.
pub fn tool_document(tool: &Tool, service_name: &str) -> String {
    let mut parts: Vec<String> = vec![
        tool.name.clone(),
        tool.description.clone(),
        service_name.to_string(),
    ];
    match &tool.example_calls {
        Some(ExampleCalls::Mapping(map)) => {
            parts.extend(map.keys().cloned());
        }
        Some(ExampleCalls::Sequence(seq)) => {
            parts.push(format!("{} example(s)", seq.len()));
        }
        None => {}
    }
    normalize_text(&parts.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdex_domain::entities::service::{
        Capability, Service, ServiceKind, ServiceStatus, Visibility,
    };
    use serde_json::json;

    fn service_bundle() -> ServiceBundle {
        ServiceBundle {
            service: Service {
                id: 1,
                name: "ShoesAgent".into(),
                description: "Footwear shopping assistant".into(),
                kind: ServiceKind::InternalAgent,
                status: ServiceStatus::Active,
                visibility: Visibility::Internal,
                version: "1.0".into(),
                endpoint: "https://shoes.internal".into(),
                capabilities: vec![Capability {
                    name: "product_search".into(),
                    description: "find footwear products".into(),
                }],
                domains: vec!["retail".into()],
                interaction_modes: vec!["sync".into()],
                policy_ids: vec![],
                deprecated_at: None,
                deprecation_notice: None,
                timeout_ms: None,
                retry_policy: None,
                success_criteria: None,
            },
            integration: None,
            agent_protocol: None,
            policies: vec![],
            tools: vec![],
        }
    }

    fn tool_with(example_calls: Option<ExampleCalls>) -> Tool {
        Tool {
            id: 10,
            service_id: 1,
            name: "product_search".into(),
            description: "search the catalog".into(),
            input_schema: None,
            output_schema: None,
            example_calls,
            endpoint_pattern: None,
            is_active: true,
            tool_version: None,
        }
    }

    #[test]
    fn service_document_includes_relations_in_order() {
        let doc = service_document(&service_bundle());
        assert_eq!(
            doc,
            "shoesagent. footwear shopping assistant. product_search: \
             find footwear products. retail. sync"
        );
    }

    #[test]
    fn service_with_no_relations_still_has_a_document() {
        let mut bundle = service_bundle();
        bundle.service.capabilities.clear();
        bundle.service.domains.clear();
        bundle.service.interaction_modes.clear();
        let doc = service_document(&bundle);
        assert_eq!(doc, "shoesagent. footwear shopping assistant");
    }

    #[test]
    fn mapping_examples_contribute_keys() {
        let mapping = serde_json::from_value(json!({"by_color": {}, "by_size": {}})).unwrap();
        let doc = tool_document(&tool_with(Some(mapping)), "ShoesAgent");
        assert!(doc.contains("by_color"));
        assert!(doc.contains("by_size"));
        assert!(!doc.contains("example(s)"));
    }

    #[test]
    fn sequence_examples_contribute_only_a_count() {
        let sequence = serde_json::from_value(json!([{"q": 1}, {"q": 2}])).unwrap();
        let doc = tool_document(&tool_with(Some(sequence)), "ShoesAgent");
        assert!(doc.contains("2 example(s)"));
        assert!(!doc.contains("\"q\""));
    }

    #[test]
    fn absent_examples_contribute_nothing() {
        let doc = tool_document(&tool_with(None), "ShoesAgent");
        assert_eq!(doc, "product_search. search the catalog. shoesagent");
    }
}
