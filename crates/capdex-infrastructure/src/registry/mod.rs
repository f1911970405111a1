//! Registry store and projection
//!
//! Holds the read-side projection behind an `ArcSwap`: readers pin one
//! immutable snapshot for the whole request, writers clone-mutate-swap.
//! Every mutation publishes the matching [`RegistryEvent`] so the
//! invalidation controller can keep derived state consistent.
//!
//! Mutations arrive from the admin surface (out of scope here) and from
//! tests; this crate exposes no mutation endpoint over the wire.

use arc_swap::ArcSwap;
use capdex_domain::entities::policy::AccessPolicy;
use capdex_domain::entities::service::{AgentProtocol, IntegrationDetails, Service, ServiceId};
use capdex_domain::entities::tool::{Tool, ToolId};
use capdex_domain::entities::{ApiKey, User};
use capdex_domain::events::RegistryEvent;
use capdex_domain::ports::RegistryReader;
use capdex_domain::value_objects::RegistrySnapshot;
use capdex_providers::events::RegistryEventBus;
use std::sync::Arc;

/// The registry projection store
pub struct RegistryStore {
    state: ArcSwap<RegistrySnapshot>,
    bus: RegistryEventBus,
}

impl RegistryStore {
    /// Create an empty store publishing onto `bus`
    pub fn new(bus: RegistryEventBus) -> Self {
        Self {
            state: ArcSwap::from_pointee(RegistrySnapshot::default()),
            bus,
        }
    }

    /// Create a store pre-filled with a snapshot (cold start from the
    /// system of record)
    pub fn with_snapshot(snapshot: RegistrySnapshot, bus: RegistryEventBus) -> Self {
        Self {
            state: ArcSwap::from_pointee(snapshot),
            bus,
        }
    }

    /// The event bus mutations publish onto
    pub fn bus(&self) -> &RegistryEventBus {
        &self.bus
    }

    fn mutate<F: FnOnce(&mut RegistrySnapshot)>(&self, f: F) {
        let mut next = RegistrySnapshot::clone(&self.state.load());
        f(&mut next);
        self.state.store(Arc::new(next));
    }

    /// Create or replace a service
    pub fn upsert_service(&self, service: Service) {
        let id = service.id;
        let created = !self.state.load().services.contains_key(&id);
        self.mutate(|s| {
            s.services.insert(id, service);
        });
        self.bus.publish(if created {
            RegistryEvent::ServiceCreated(id)
        } else {
            RegistryEvent::ServiceUpdated(id)
        });
    }

    /// Delete a service; owned tools cascade with their own events
    pub fn remove_service(&self, id: ServiceId) {
        let tool_ids: Vec<ToolId> = self
            .state
            .load()
            .tools
            .values()
            .filter(|t| t.service_id == id)
            .map(|t| t.id)
            .collect();
        self.mutate(|s| {
            s.services.remove(&id);
            s.integrations.remove(&id);
            s.agent_protocols.remove(&id);
            s.tools.retain(|_, t| t.service_id != id);
        });
        self.bus.publish(RegistryEvent::ServiceDeleted(id));
        for tool_id in tool_ids {
            self.bus.publish(RegistryEvent::ToolDeleted(tool_id));
        }
    }

    /// Create or replace a tool
    pub fn upsert_tool(&self, tool: Tool) {
        let id = tool.id;
        let created = !self.state.load().tools.contains_key(&id);
        self.mutate(|s| {
            s.tools.insert(id, tool);
        });
        self.bus.publish(if created {
            RegistryEvent::ToolCreated(id)
        } else {
            RegistryEvent::ToolUpdated(id)
        });
    }

    /// Delete a tool
    pub fn remove_tool(&self, id: ToolId) {
        self.mutate(|s| {
            s.tools.remove(&id);
        });
        self.bus.publish(RegistryEvent::ToolDeleted(id));
    }

    /// Attach or replace integration details for a service
    pub fn set_integration(&self, service_id: ServiceId, integration: IntegrationDetails) {
        self.mutate(|s| {
            s.integrations.insert(service_id, integration);
        });
        self.bus.publish(RegistryEvent::ServiceUpdated(service_id));
    }

    /// Attach or replace an agent protocol for a service
    pub fn set_agent_protocol(&self, service_id: ServiceId, protocol: AgentProtocol) {
        self.mutate(|s| {
            s.agent_protocols.insert(service_id, protocol);
        });
        self.bus.publish(RegistryEvent::ServiceUpdated(service_id));
    }

    /// Create or replace an access policy
    pub fn upsert_policy(&self, policy: AccessPolicy) {
        let id = policy.id;
        self.mutate(|s| {
            s.policies.insert(id, policy);
        });
        self.bus.publish(RegistryEvent::PolicyChanged(id));
    }

    /// Delete an access policy
    pub fn remove_policy(&self, id: i64) {
        self.mutate(|s| {
            s.policies.remove(&id);
        });
        self.bus.publish(RegistryEvent::PolicyChanged(id));
    }

    /// Create or replace a user; no derived state depends on users
    pub fn upsert_user(&self, user: User) {
        self.mutate(|s| {
            s.users.insert(user.id, user);
        });
    }

    /// Create or replace an API key
    pub fn upsert_api_key(&self, key: ApiKey) {
        self.mutate(|s| {
            s.api_keys.insert(key.id, key);
        });
    }
}

impl RegistryReader for RegistryStore {
    fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.state.load_full()
    }
}
