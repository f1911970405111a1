//! Value objects shared across layers

/// Registry bundles used for enrichment
pub mod bundle;
/// Semantic embedding value object
pub mod embedding;
/// Search modes, verbosity and scored hits
pub mod search;
/// Persisted index snapshot shapes
pub mod snapshot;

pub use bundle::{RegistrySnapshot, ServiceBundle, ToolBundle};
pub use embedding::Embedding;
pub use search::{ScoredHit, SearchMode, Verbosity};
pub use snapshot::{IndexSnapshot, IndexSnapshotMeta};
