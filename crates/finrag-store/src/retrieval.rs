//! The `retrieve_context` tool

use crate::embedding::EmbeddingModel;
use crate::{SqliteStore, StoreError};
use finrag_domain::traits::ContextRetriever;
use finrag_domain::RetrievedChunk;
use tracing::debug;

/// Chunks returned per query unless the caller asks otherwise
pub const DEFAULT_K: usize = 3;

/// Embeds a query and looks up its nearest chunks
pub struct Retriever<E: EmbeddingModel> {
    store: SqliteStore,
    model: E,
}

impl<E: EmbeddingModel> Retriever<E> {
    /// Create a retriever; `model` must match the store's dimension
    pub fn new(store: SqliteStore, model: E) -> Result<Self, StoreError> {
        if model.dimension() != store.dimension() {
            return Err(StoreError::InvalidData(format!(
                "model {} produces {}-dimensional vectors but collection '{}' holds {}",
                model.model_name(),
                model.dimension(),
                store.collection(),
                store.dimension()
            )));
        }
        Ok(Self { store, model })
    }

    /// Underlying store
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Embedding model
    pub fn model(&self) -> &E {
        &self.model
    }
}

impl<E: EmbeddingModel> ContextRetriever for Retriever<E> {
    type Error = StoreError;

    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, Self::Error> {
        let embedding = self.model.embed(query)?;
        let results = self.store.similarity_search(&embedding, k)?;
        debug!(query, k, hits = results.len(), "retrieved context");
        Ok(results)
    }
}

/// Render retrieved chunks as the tool's text output
///
/// Each chunk becomes `Source: {metadata}\nContent: {content}`, blocks
/// separated by a blank line.
pub fn serialize_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let metadata = serde_json::to_string(&chunk.metadata).unwrap_or_default();
            format!("Source: {}\nContent: {}", metadata, chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockEmbeddingModel;
    use finrag_domain::ChunkMetadata;

    fn chunk(name: &str, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: format!("/raw/{}", name),
                source_name: name.to_string(),
                document_chunk_index: 0,
                total_chunks_in_document: 1,
                file_format: ".md".to_string(),
                chunk_index: Some(4),
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_serialize_context() {
        let text = serialize_context(&[chunk("a.md", "First."), chunk("b.md", "Second.")]);
        let blocks: Vec<&str> = text.split("\n\n").collect();

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("Source: {\"source\":\"/raw/a.md\""));
        assert!(blocks[0].ends_with("\nContent: First."));
        assert!(blocks[1].contains("\"source_name\":\"b.md\""));
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize_context(&[]), "");
    }

    #[test]
    fn test_dimension_must_match() {
        let store = SqliteStore::open(":memory:", "docs", 8).unwrap();
        assert!(Retriever::new(store, MockEmbeddingModel::new(16)).is_err());
    }
}
