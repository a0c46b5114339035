//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the agent and its
//! collaborators. Implementations live in other crates.

use crate::chat::{ChatMessage, ChatTurn, ToolSpec};
use crate::record::ChunkMetadata;
use serde::{Deserialize, Serialize};

/// A stored chunk returned by a similarity lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Contextualized chunk text
    pub content: String,

    /// Provenance metadata stored with the chunk
    pub metadata: ChunkMetadata,

    /// Cosine similarity to the query (higher is closer)
    pub score: f32,
}

/// Nearest-neighbour lookup over ingested chunks
///
/// Implemented by the storage layer (finrag-store)
pub trait ContextRetriever {
    /// Error type for retrieval operations
    type Error;

    /// Return up to `k` chunks closest to `query`, best first
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, Self::Error>;
}

/// Trait for chat model operations
///
/// Implemented by the infrastructure layer (finrag-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Send the conversation and the available tools, get the next turn
    fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatTurn, Self::Error>;

    /// Name of the model serving requests
    fn model_name(&self) -> &str;
}
