//! Registry bundles
//!
//! Bundles are owned value objects assembled from one registry snapshot.
//! The hot path never chases lazy references: a request pins a single
//! [`RegistrySnapshot`] and clones bundles out of it, which is what gives
//! every search request a consistent view of the registry.

use crate::entities::identity::{ApiKey, User, UserId};
use crate::entities::policy::AccessPolicy;
use crate::entities::service::{AgentProtocol, IntegrationDetails, Service, ServiceId};
use crate::entities::tool::{Tool, ToolId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A service with everything needed for enrichment and policy evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBundle {
    /// The service itself
    pub service: Service,
    /// Integration details, when registered
    pub integration: Option<IntegrationDetails>,
    /// Agent protocol, when registered
    pub agent_protocol: Option<AgentProtocol>,
    /// Policies attached to the service
    pub policies: Vec<AccessPolicy>,
    /// Active tools owned by the service
    pub tools: Vec<Tool>,
}

/// A tool together with its owning service bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBundle {
    /// The tool itself
    pub tool: Tool,
    /// The owning service, fully enriched
    pub service: ServiceBundle,
}

/// The full read-side projection of the registry.
///
/// Derived state (indexes, caches) must be reconstructible from this at any
/// time. Maps are ordered so iteration order is stable across rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Services by id
    pub services: BTreeMap<ServiceId, Service>,
    /// Integration details by owning service id
    pub integrations: BTreeMap<ServiceId, IntegrationDetails>,
    /// Agent protocols by owning service id
    pub agent_protocols: BTreeMap<ServiceId, AgentProtocol>,
    /// Tools by id
    pub tools: BTreeMap<ToolId, Tool>,
    /// Policies by id
    pub policies: BTreeMap<i64, AccessPolicy>,
    /// Users by id
    pub users: BTreeMap<UserId, User>,
    /// API keys by id
    pub api_keys: BTreeMap<i64, ApiKey>,
}

impl RegistrySnapshot {
    /// Assemble the bundle for one service, if it exists
    pub fn service_bundle(&self, id: ServiceId) -> Option<ServiceBundle> {
        let service = self.services.get(&id)?.clone();
        let policies = service
            .policy_ids
            .iter()
            .filter_map(|pid| self.policies.get(pid).cloned())
            .collect();
        let tools = self
            .tools
            .values()
            .filter(|t| t.service_id == id && t.is_active)
            .cloned()
            .collect();
        Some(ServiceBundle {
            integration: self.integrations.get(&id).cloned(),
            agent_protocol: self.agent_protocols.get(&id).cloned(),
            policies,
            tools,
            service,
        })
    }

    /// Assemble the bundle for one tool, if it exists
    pub fn tool_bundle(&self, id: ToolId) -> Option<ToolBundle> {
        let tool = self.tools.get(&id)?.clone();
        let service = self.service_bundle(tool.service_id)?;
        Some(ToolBundle { tool, service })
    }

    /// Indexable services (active or deprecated) with their relations, in
    /// id order
    pub fn indexable_service_bundles(&self) -> Vec<ServiceBundle> {
        self.services
            .values()
            .filter(|s| s.is_indexable())
            .filter_map(|s| self.service_bundle(s.id))
            .collect()
    }

    /// Active tools of indexable services, in id order
    pub fn indexable_tool_bundles(&self) -> Vec<ToolBundle> {
        self.tools
            .values()
            .filter(|t| t.is_active)
            .filter_map(|t| self.tool_bundle(t.id))
            .filter(|b| b.service.service.is_indexable())
            .collect()
    }

    /// Attribute keys referenced by any loaded policy.
    ///
    /// The caller fingerprint hashes only these keys, so callers differing in
    /// irrelevant attributes share response-cache entries.
    pub fn policy_attribute_keys(&self) -> BTreeSet<String> {
        self.policies
            .values()
            .flat_map(|p| p.referenced_attribute_keys().map(str::to_string))
            .collect()
    }

    /// Find an API key record by the hex digest of its secret
    pub fn api_key_by_hash(&self, key_hash: &str) -> Option<&ApiKey> {
        self.api_keys.values().find(|k| k.key_hash == key_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::service::{ServiceKind, ServiceStatus, Visibility};

    fn snapshot_with_service_and_tool() -> RegistrySnapshot {
        let mut snap = RegistrySnapshot::default();
        snap.services.insert(
            1,
            Service {
                id: 1,
                name: "shoes".into(),
                description: "footwear shopping".into(),
                kind: ServiceKind::InternalAgent,
                status: ServiceStatus::Active,
                visibility: Visibility::Internal,
                version: "1.0".into(),
                endpoint: "https://shoes.internal".into(),
                capabilities: vec![],
                domains: vec![],
                interaction_modes: vec![],
                policy_ids: vec![],
                deprecated_at: None,
                deprecation_notice: None,
                timeout_ms: None,
                retry_policy: None,
                success_criteria: None,
            },
        );
        snap.tools.insert(
            10,
            Tool {
                id: 10,
                service_id: 1,
                name: "product_search".into(),
                description: "search the catalog".into(),
                input_schema: None,
                output_schema: None,
                example_calls: None,
                endpoint_pattern: None,
                is_active: true,
                tool_version: None,
            },
        );
        snap
    }

    #[test]
    fn tool_bundle_carries_owning_service() {
        let snap = snapshot_with_service_and_tool();
        let bundle = snap.tool_bundle(10).unwrap();
        assert_eq!(bundle.service.service.id, 1);
        assert_eq!(bundle.tool.name, "product_search");
    }

    #[test]
    fn inactive_tools_drop_out_of_bundles() {
        let mut snap = snapshot_with_service_and_tool();
        snap.tools.get_mut(&10).unwrap().is_active = false;
        let bundle = snap.service_bundle(1).unwrap();
        assert!(bundle.tools.is_empty());
        assert!(snap.indexable_tool_bundles().is_empty());
    }

    #[test]
    fn tools_of_inactive_services_are_not_indexable() {
        let mut snap = snapshot_with_service_and_tool();
        snap.services.get_mut(&1).unwrap().status = ServiceStatus::Inactive;
        assert!(snap.indexable_tool_bundles().is_empty());
        assert!(snap.indexable_service_bundles().is_empty());
    }

    #[test]
    fn deprecated_services_stay_indexable() {
        let mut snap = snapshot_with_service_and_tool();
        snap.services.get_mut(&1).unwrap().status = ServiceStatus::Deprecated;
        assert_eq!(snap.indexable_service_bundles().len(), 1);
        assert_eq!(snap.indexable_tool_bundles().len(), 1);
    }
}
