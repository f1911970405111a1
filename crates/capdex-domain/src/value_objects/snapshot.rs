//! Persisted index snapshot shapes
//!
//! A snapshot is only loadable when its metadata matches the running
//! configuration; any mismatch forces a full rebuild from the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata persisted next to an index's vector data (`meta.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshotMeta {
    /// Identifier of the embedding model the vectors came from
    pub embedding_model: String,
    /// Vector dimensionality
    pub dimension: usize,
    /// Number of vectors in the snapshot
    pub vector_count: usize,
    /// SHA-256 hex digest of the vector bytes
    pub checksum: String,
    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
}

/// A fully materialized index snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    /// Snapshot metadata
    pub meta: IndexSnapshotMeta,
    /// Domain id at each index position
    pub ids: Vec<i64>,
    /// Row-major vector data, `ids.len() * meta.dimension` values
    pub vectors: Vec<f32>,
}

impl IndexSnapshot {
    /// SHA-256 hex digest over row-major vector data, little-endian f32
    /// bytes. Export and load both use this, so the two sides can never
    /// disagree on the byte layout.
    pub fn checksum_of(vectors: &[f32]) -> String {
        let mut hasher = Sha256::new();
        for value in vectors {
            hasher.update(value.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Assemble a snapshot, computing the checksum from the data
    pub fn assemble(
        embedding_model: &str,
        dimension: usize,
        ids: Vec<i64>,
        vectors: Vec<f32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            meta: IndexSnapshotMeta {
                embedding_model: embedding_model.to_string(),
                dimension,
                vector_count: ids.len(),
                checksum: Self::checksum_of(&vectors),
                created_at,
            },
            ids,
            vectors,
        }
    }
}
