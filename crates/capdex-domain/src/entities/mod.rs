//! Registry entities
//!
//! The read-side shapes of everything the admin surface registers: services,
//! their tools, integration metadata, access policies and caller identities.

/// Append-only feedback records
pub mod feedback;
/// Caller identities and API keys
pub mod identity;
/// Access policies and predicates
pub mod policy;
/// Services, capabilities, integration details, agent protocols
pub mod service;
/// Tools owned by services
pub mod tool;

pub use feedback::{SearchQueryRecord, UserSelectionRecord};
pub use identity::{ApiKey, CallerIdentity, User};
pub use policy::{AccessPolicy, AttributeMatch, PolicyPredicate};
pub use service::{
    AgentProtocol, Capability, IntegrationDetails, Service, ServiceKind, ServiceStatus, Visibility,
};
pub use tool::{ExampleCalls, Tool};
