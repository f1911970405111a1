//! Index snapshot persistence
//!
//! Filesystem layout per logical index under the configured directory:
//!
//! ```text
//! <dir>/<index>/vectors.bin   row-major little-endian f32 data
//! <dir>/<index>/id_map.json   position -> domain id
//! <dir>/<index>/meta.json     model, dimension, count, checksum, created_at
//! ```
//!
//! `load` verifies the checksum and that the snapshot was produced by the
//! currently configured model and dimension; any mismatch is an error so
//! the caller schedules a full rebuild.

use async_trait::async_trait;
use capdex_domain::error::{Error, Result};
use capdex_domain::ports::SnapshotStore;
use capdex_domain::value_objects::{IndexSnapshot, IndexSnapshotMeta};
use std::path::{Path, PathBuf};
use tracing::debug;

const VECTORS_FILE: &str = "vectors.bin";
const ID_MAP_FILE: &str = "id_map.json";
const META_FILE: &str = "meta.json";

/// Filesystem-backed snapshot store
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    /// Create a store rooted at `root` (created on first save)
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn index_dir(&self, index_name: &str) -> PathBuf {
        self.root.join(index_name)
    }
}

fn vectors_to_bytes(vectors: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vectors.len() * 4);
    for value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_vectors(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::vector_index("vector data is not f32-aligned"));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn save(&self, index_name: &str, snapshot: &IndexSnapshot) -> Result<()> {
        let dir = self.index_dir(index_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io_with_source("failed to create snapshot directory", e))?;

        tokio::fs::write(dir.join(VECTORS_FILE), vectors_to_bytes(&snapshot.vectors))
            .await
            .map_err(|e| Error::io_with_source("failed to write vector data", e))?;
        tokio::fs::write(dir.join(ID_MAP_FILE), serde_json::to_vec(&snapshot.ids)?)
            .await
            .map_err(|e| Error::io_with_source("failed to write id map", e))?;
        tokio::fs::write(
            dir.join(META_FILE),
            serde_json::to_vec_pretty(&snapshot.meta)?,
        )
        .await
        .map_err(|e| Error::io_with_source("failed to write snapshot metadata", e))?;

        debug!(index = index_name, count = snapshot.meta.vector_count, "snapshot persisted");
        Ok(())
    }

    async fn load(
        &self,
        index_name: &str,
        expected_model: &str,
        expected_dimension: usize,
    ) -> Result<Option<IndexSnapshot>> {
        let dir = self.index_dir(index_name);
        let meta_path = dir.join(META_FILE);
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta_bytes = tokio::fs::read(&meta_path)
            .await
            .map_err(|e| Error::io_with_source("failed to read snapshot metadata", e))?;
        let meta: IndexSnapshotMeta = serde_json::from_slice(&meta_bytes)?;

        if meta.embedding_model != expected_model {
            return Err(Error::vector_index(format!(
                "snapshot was built with model '{}', configured model is '{expected_model}'",
                meta.embedding_model
            )));
        }
        if meta.dimension != expected_dimension {
            return Err(Error::vector_index(format!(
                "snapshot dimension {} does not match configured dimension {expected_dimension}",
                meta.dimension
            )));
        }

        let id_bytes = tokio::fs::read(dir.join(ID_MAP_FILE))
            .await
            .map_err(|e| Error::io_with_source("failed to read id map", e))?;
        let ids: Vec<i64> = serde_json::from_slice(&id_bytes)?;

        let vector_bytes = tokio::fs::read(dir.join(VECTORS_FILE))
            .await
            .map_err(|e| Error::io_with_source("failed to read vector data", e))?;
        let vectors = bytes_to_vectors(&vector_bytes)?;

        if ids.len() != meta.vector_count || vectors.len() != ids.len() * meta.dimension {
            return Err(Error::vector_index("snapshot data does not match metadata"));
        }
        let checksum = IndexSnapshot::checksum_of(&vectors);
        if checksum != meta.checksum {
            return Err(Error::vector_index(format!(
                "snapshot checksum mismatch for index '{index_name}'"
            )));
        }

        Ok(Some(IndexSnapshot { meta, ids, vectors }))
    }
}
