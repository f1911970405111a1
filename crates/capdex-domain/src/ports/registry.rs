//! Registry reader port

use crate::value_objects::RegistrySnapshot;
use std::sync::Arc;

/// Read access to the registry projection.
///
/// `snapshot` hands out an immutable view; a request pins one snapshot and
/// performs every enrichment read against it; that is the whole
/// read-isolation story, with no transaction machinery on the hot path.
pub trait RegistryReader: Send + Sync {
    /// The current consistent view of the registry
    fn snapshot(&self) -> Arc<RegistrySnapshot>;
}
