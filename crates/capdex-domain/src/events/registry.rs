//! Registry mutation events
//!
//! Published whenever the admin surface mutates the registry; the
//! invalidation controller turns them into embedding/index/cache work.
//! Indexes and caches are derived state, so every event carries only ids;
//! consumers re-read current truth from the registry snapshot.

use crate::entities::service::ServiceId;
use crate::entities::tool::ToolId;
use serde::{Deserialize, Serialize};

/// A single registry mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "id")]
pub enum RegistryEvent {
    /// A service was created
    ServiceCreated(ServiceId),
    /// A service's text, capabilities, domains, interaction modes or status
    /// changed
    ServiceUpdated(ServiceId),
    /// A service was deleted
    ServiceDeleted(ServiceId),
    /// A tool was created
    ToolCreated(ToolId),
    /// A tool's text or activation changed
    ToolUpdated(ToolId),
    /// A tool was deleted
    ToolDeleted(ToolId),
    /// An access policy changed; indexes are unaffected, caches are not
    PolicyChanged(i64),
}
