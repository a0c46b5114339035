//! HNSW vector index for similarity search
//!
//! The index lives in memory and is rebuilt from SQLite when a store is
//! opened; SQLite remains the source of truth. Points are keyed by the
//! chunk's row id.
//!
//! # HNSW Parameters
//!
//! - **M**: bi-directional links per node (16)
//! - **efConstruction**: candidate list size while building (200)
//! - **efSearch**: candidate list size while querying, passed per search

use hnsw_rs::prelude::*;
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 1_000_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Row id outside the index's key space
    #[error("Invalid chunk id: {0}")]
    InvalidId(i64),
}

/// Cosine HNSW index over chunk embeddings
pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    len: usize,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            hnsw: new_hnsw(),
            len: 0,
        }
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert the embedding of chunk `id`
    pub fn add(&mut self, id: i64, embedding: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(embedding)?;
        let point_id = usize::try_from(id).map_err(|_| VectorIndexError::InvalidId(id))?;

        let embedding_vec = embedding.to_vec();
        self.hnsw.insert((&embedding_vec, point_id));
        self.len += 1;
        Ok(())
    }

    /// The `k` nearest chunks as `(id, similarity)`, most similar first
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(i64, f32)>, VectorIndexError> {
        self.check_dimension(query)?;
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<(i64, f32)> = self
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            .filter_map(|neighbour| {
                // cosine distance -> similarity
                i64::try_from(neighbour.d_id).ok().map(|id| (id, 1.0 - neighbour.distance))
            })
            .collect();
        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(results)
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every vector
    pub fn clear(&mut self) {
        self.hnsw = new_hnsw();
        self.len = 0;
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn new_hnsw() -> Hnsw<'static, f32, DistCosine> {
    let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);
    Hnsw::<'static, f32, DistCosine>::new(
        DEFAULT_M,
        DEFAULT_MAX_ELEMENTS,
        nb_layer,
        DEFAULT_EF_CONSTRUCTION,
        DistCosine {},
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new(3);
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0], 3, 64).unwrap().is_empty());
    }

    #[test]
    fn test_ranked_by_cosine_similarity() {
        let mut index = VectorIndex::new(3);
        index.add(1, &[1.0, 0.0, 0.0]).unwrap();
        index.add(2, &[0.0, 1.0, 0.0]).unwrap();
        index.add(3, &[0.7071, 0.7071, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3, 64).unwrap();

        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 3, 2]);
        assert!(results[0].1 > 0.99);
        assert!(results[1].1 > 0.5);
        assert!(results[2].1 < 0.1);
    }

    #[test]
    fn test_k_limits_results() {
        let mut index = VectorIndex::new(2);
        for id in 1..=10 {
            index.add(id, &[1.0, id as f32]).unwrap();
        }
        assert_eq!(index.len(), 10);
        assert_eq!(index.search(&[1.0, 1.0], 3, 64).unwrap().len(), 3);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new(384);
        assert!(matches!(
            index.add(1, &[0.1; 128]),
            Err(VectorIndexError::DimensionMismatch { expected: 384, actual: 128 })
        ));
        assert!(index.search(&[0.1; 3], 1, 64).is_err());
    }

    #[test]
    fn test_negative_id_rejected() {
        let mut index = VectorIndex::new(2);
        assert!(matches!(index.add(-1, &[1.0, 0.0]), Err(VectorIndexError::InvalidId(-1))));
    }

    #[test]
    fn test_clear() {
        let mut index = VectorIndex::new(2);
        index.add(1, &[1.0, 0.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 1, 64).unwrap().is_empty());
    }
}
