//! Index snapshot persistence port

use crate::error::Result;
use crate::value_objects::IndexSnapshot;
use async_trait::async_trait;

/// Persists and restores index snapshots by logical index name
/// (`services`, `tools`).
///
/// `load` must validate integrity (checksum) and compatibility (embedding
/// model, dimension) and return `Ok(None)` when no snapshot exists;
/// incompatible or corrupt snapshots are errors so the caller schedules a
/// full rebuild.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot under the given index name
    async fn save(&self, index_name: &str, snapshot: &IndexSnapshot) -> Result<()>;

    /// Load the snapshot for the given index name, validated against the
    /// currently configured model and dimension
    async fn load(
        &self,
        index_name: &str,
        expected_model: &str,
        expected_dimension: usize,
    ) -> Result<Option<IndexSnapshot>>;
}
