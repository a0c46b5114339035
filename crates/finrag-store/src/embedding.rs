//! Embedding models for text vectorization
//!
//! Chunks and queries must be embedded by the same model for similarity
//! scores to mean anything; the store records the dimension per collection
//! and rejects vectors of any other size.
//!
//! # Models
//!
//! - **MockEmbeddingModel**: hashed bag-of-words vectors, deterministic and
//!   offline; texts that share words score as similar
//! - **OpenAiEmbeddingModel**: hosted embeddings (see [`crate::openai`])
//!
//! # Examples
//!
//! ```rust
//! use finrag_store::embedding::{EmbeddingModel, MockEmbeddingModel};
//!
//! let model = MockEmbeddingModel::new(384);
//! let embedding = model.embed("Operating margin improved").unwrap();
//! assert_eq!(embedding.len(), 384);
//! assert_eq!(embedding, model.embed("Operating margin improved").unwrap());
//! ```

use xxhash_rust::xxh3::xxh3_64_with_seed;
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding service could not be reached or refused the request
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The embedding service answered with something unusable
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// A vector came back with the wrong size
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Dimension received
        actual: usize,
    },
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts; order of the output matches the input
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}

impl<T: EmbeddingModel + ?Sized> EmbeddingModel for Box<T> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Deterministic hashed bag-of-words embeddings for tests and offline use
///
/// Each lowercase word is hashed to a signed bucket; the result is
/// normalized to unit length. Text without any word characters falls back
/// to hashing the whole string.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
}

impl MockEmbeddingModel {
    /// Create a new mock embedding model
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_with_seed(text: &str, seed: u64) -> u64 {
        xxh3_64_with_seed(text.as_bytes(), seed)
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase);

        let mut any = false;
        for word in words {
            any = true;
            let hash = Self::hash_with_seed(&word, 0);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        if !any {
            for (i, value) in embedding.iter_mut().enumerate() {
                let hash = Self::hash_with_seed(text, i as u64);
                *value = (hash as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32;
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-bag-of-words"
    }
}

/// Cosine similarity in `[-1, 1]`
///
/// Vectors of different lengths, or with a zero vector on either side,
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| (dot + x * y, na + x * x, nb + y * y));

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
