//! Vector index port

use crate::error::Result;
use crate::value_objects::IndexSnapshot;
use async_trait::async_trait;

/// Contract for an ANN structure over vectors with stable integer ids.
///
/// Similarity is cosine over unit vectors. `search` is safe under concurrent
/// readers; writes are serialized by the invalidation controller, and a
/// reader observes either the pre-write or post-write state, never a partial
/// one.
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert a vector under a new id; replaces any existing vector for `id`
    async fn add(&self, id: i64, vector: Vec<f32>) -> Result<()>;

    /// Replace the vector stored for `id`; inserts when absent
    async fn update(&self, id: i64, vector: Vec<f32>) -> Result<()>;

    /// Remove the vector stored for `id`; a no-op when absent
    async fn remove(&self, id: i64) -> Result<()>;

    /// Top-`k` most similar ids, best first, with similarity in `[0, 1]`
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f64)>>;

    /// The stored vector for `id`, if present
    async fn vector_of(&self, id: i64) -> Result<Option<Vec<f32>>>;

    /// Number of stored vectors
    async fn len(&self) -> usize;

    /// True when the index holds no vectors
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every stored vector
    async fn clear(&self) -> Result<()>;

    /// Export the full index contents for persistence
    async fn export_snapshot(&self, embedding_model: &str) -> Result<IndexSnapshot>;

    /// Replace the index contents from a snapshot, atomically
    async fn import_snapshot(&self, snapshot: IndexSnapshot) -> Result<()>;
}
