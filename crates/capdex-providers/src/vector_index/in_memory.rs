//! In-memory vector index
//!
//! Brute-force cosine search over unit vectors with a bounded min-heap for
//! top-k selection. A single `RwLock` gives the single-writer /
//! multi-reader discipline the index contract requires: a reader sees the
//! state before or after any write, never a partial row.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::RwLock;

use capdex_domain::error::{Error, Result};
use capdex_domain::ports::VectorIndexProvider;
use capdex_domain::value_objects::{Embedding, IndexSnapshot, IndexSnapshotMeta};

struct IndexInner {
    /// Row-major vector data, `ids.len() * dimension` values
    vectors: Vec<f32>,
    /// Domain id at each row position
    ids: Vec<i64>,
    /// id -> row position
    position_of: HashMap<i64, usize>,
}

/// In-memory ANN index over stable integer ids
pub struct InMemoryVectorIndex {
    dimension: usize,
    inner: RwLock<IndexInner>,
}

impl InMemoryVectorIndex {
    /// Create an empty index for vectors of the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: RwLock::new(IndexInner {
                vectors: Vec::new(),
                ids: Vec::new(),
                position_of: HashMap::new(),
            }),
        }
    }

    /// The dimension this index accepts
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::vector_index(format!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    fn upsert(&self, id: i64, vector: Vec<f32>) -> Result<()> {
        self.check_dimension(&vector)?;
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        match inner.position_of.get(&id).copied() {
            Some(pos) => {
                let start = pos * self.dimension;
                inner.vectors[start..start + self.dimension].copy_from_slice(&vector);
            }
            None => {
                let pos = inner.ids.len();
                inner.ids.push(id);
                inner.vectors.extend_from_slice(&vector);
                inner.position_of.insert(id, pos);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryVectorIndex {
    async fn add(&self, id: i64, vector: Vec<f32>) -> Result<()> {
        self.upsert(id, vector)
    }

    async fn update(&self, id: i64, vector: Vec<f32>) -> Result<()> {
        self.upsert(id, vector)
    }

    async fn remove(&self, id: i64) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        let Some(pos) = inner.position_of.remove(&id) else {
            return Ok(());
        };
        let last = inner.ids.len() - 1;
        // Swap-remove: move the last row into the vacated slot
        if pos != last {
            let moved_id = inner.ids[last];
            let (dst, src) = (pos * self.dimension, last * self.dimension);
            for i in 0..self.dimension {
                inner.vectors[dst + i] = inner.vectors[src + i];
            }
            inner.ids[pos] = moved_id;
            inner.position_of.insert(moved_id, pos);
        }
        inner.ids.truncate(last);
        inner.vectors.truncate(last * self.dimension);
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f64)>> {
        self.check_dimension(vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;

        // Min-heap for top-k selection: O(n log k) instead of O(n log n)
        let mut heap: BinaryHeap<ScoredItem> = BinaryHeap::with_capacity(k + 1);
        for (pos, id) in inner.ids.iter().enumerate() {
            let start = pos * self.dimension;
            let row = &inner.vectors[start..start + self.dimension];
            let similarity = Embedding::unit_similarity(vector, row);
            if heap.len() < k {
                heap.push(ScoredItem {
                    score: similarity,
                    id: *id,
                });
            } else if let Some(min) = heap.peek() {
                if similarity > min.score {
                    heap.pop();
                    heap.push(ScoredItem {
                        score: similarity,
                        id: *id,
                    });
                }
            }
        }

        let mut items: Vec<ScoredItem> = heap.into_iter().collect();
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Ok(items.into_iter().map(|i| (i.id, i.score)).collect())
    }

    async fn vector_of(&self, id: i64) -> Result<Option<Vec<f32>>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        Ok(inner.position_of.get(&id).map(|pos| {
            let start = pos * self.dimension;
            inner.vectors[start..start + self.dimension].to_vec()
        }))
    }

    async fn len(&self) -> usize {
        self.inner.read().map(|i| i.ids.len()).unwrap_or(0)
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        inner.vectors.clear();
        inner.ids.clear();
        inner.position_of.clear();
        Ok(())
    }

    async fn export_snapshot(&self, embedding_model: &str) -> Result<IndexSnapshot> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        Ok(IndexSnapshot {
            meta: IndexSnapshotMeta {
                embedding_model: embedding_model.to_string(),
                dimension: self.dimension,
                vector_count: inner.ids.len(),
                checksum: IndexSnapshot::checksum_of(&inner.vectors),
                created_at: Utc::now(),
            },
            ids: inner.ids.clone(),
            vectors: inner.vectors.clone(),
        })
    }

    async fn import_snapshot(&self, snapshot: IndexSnapshot) -> Result<()> {
        if snapshot.meta.dimension != self.dimension {
            return Err(Error::vector_index(format!(
                "snapshot dimension {} does not match index dimension {}",
                snapshot.meta.dimension, self.dimension
            )));
        }
        if snapshot.ids.len() * self.dimension != snapshot.vectors.len() {
            return Err(Error::vector_index(
                "snapshot vector data does not match id count",
            ));
        }
        let position_of = snapshot
            .ids
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::vector_index("index lock poisoned"))?;
        inner.vectors = snapshot.vectors;
        inner.ids = snapshot.ids;
        inner.position_of = position_of;
        Ok(())
    }
}

/// Scored item for heap-based top-k selection.
///
/// Reverse ordering so `BinaryHeap` acts as a min-heap.
#[derive(PartialEq)]
struct ScoredItem {
    score: f64,
    id: i64,
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let mut v = v;
        Embedding::l2_normalize(&mut v);
        v
    }

    #[tokio::test]
    async fn add_and_search_ranks_by_similarity() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.0])).await.unwrap();
        index.add(2, unit(vec![0.0, 1.0])).await.unwrap();
        index.add(3, unit(vec![1.0, 0.2])).await.unwrap();

        let hits = index.search(&unit(vec![1.0, 0.0]), 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 3);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[tokio::test]
    async fn update_replaces_the_vector() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.0])).await.unwrap();
        index.update(1, unit(vec![0.0, 1.0])).await.unwrap();

        let hits = index.search(&unit(vec![0.0, 1.0]), 1).await.unwrap();
        assert_eq!(hits[0].0, 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn remove_swaps_last_row_in() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.0])).await.unwrap();
        index.add(2, unit(vec![0.0, 1.0])).await.unwrap();
        index.add(3, unit(vec![-1.0, 0.0])).await.unwrap();
        index.remove(1).await.unwrap();

        assert_eq!(index.len().await, 2);
        assert!(index.vector_of(1).await.unwrap().is_none());
        // Remaining ids still searchable at correct positions
        let hits = index.search(&unit(vec![0.0, 1.0]), 1).await.unwrap();
        assert_eq!(hits[0].0, 2);
        let hits = index.search(&unit(vec![-1.0, 0.0]), 1).await.unwrap();
        assert_eq!(hits[0].0, 3);
    }

    #[tokio::test]
    async fn remove_missing_id_is_a_noop() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.0])).await.unwrap();
        index.remove(99).await.unwrap();
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = InMemoryVectorIndex::new(3);
        assert!(index.add(1, vec![1.0, 0.0]).await.is_err());
        assert!(index.search(&[1.0], 5).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_roundtrip_preserves_search_results() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.1])).await.unwrap();
        index.add(2, unit(vec![0.3, 1.0])).await.unwrap();
        index.add(3, unit(vec![0.9, 0.9])).await.unwrap();
        let query = unit(vec![1.0, 0.5]);
        let before = index.search(&query, 3).await.unwrap();

        let snapshot = index.export_snapshot("test-model").await.unwrap();
        assert_eq!(snapshot.meta.vector_count, 3);

        let restored = InMemoryVectorIndex::new(2);
        restored.import_snapshot(snapshot).await.unwrap();
        let after = restored.search(&query, 3).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn import_rejects_wrong_dimension() {
        let index = InMemoryVectorIndex::new(2);
        index.add(1, unit(vec![1.0, 0.0])).await.unwrap();
        let snapshot = index.export_snapshot("m").await.unwrap();

        let other = InMemoryVectorIndex::new(3);
        assert!(other.import_snapshot(snapshot).await.is_err());
    }

    #[tokio::test]
    async fn ties_break_by_ascending_id() {
        let index = InMemoryVectorIndex::new(2);
        index.add(9, unit(vec![1.0, 0.0])).await.unwrap();
        index.add(4, unit(vec![1.0, 0.0])).await.unwrap();
        let hits = index.search(&unit(vec![1.0, 0.0]), 2).await.unwrap();
        assert_eq!(hits[0].0, 4);
        assert_eq!(hits[1].0, 9);
    }
}
