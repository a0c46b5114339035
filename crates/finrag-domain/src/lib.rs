//! finrag Domain Layer
//!
//! Core data model shared by every finrag crate. It defines the values that
//! flow through the ingestion pipeline and the trait seams that the
//! infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **SourceFile**: a path plus its processing lane (text or audio)
//! - **ConvertedDocument**: format-agnostic structured text produced by a converter
//! - **ChunkRecord**: contextualized chunk text plus provenance metadata, the unit
//!   handed to the vector store
//! - **Traits**: converters, token counters, context retrievers and chat models
//!
//! ## Architecture
//!
//! - Pure data and pure functions only; no I/O happens in this crate
//! - Infrastructure implementations live in `finrag-ingest`, `finrag-store`
//!   and `finrag-llm`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chat;
pub mod document;
pub mod format;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use chat::{ChatMessage, ChatRole, ChatTurn, ToolCall, ToolSpec};
pub use document::{ConvertedDocument, DocItem, ItemLabel};
pub use format::{DocumentKind, SourceFile, AUDIO_EXTENSIONS, TEXT_EXTENSIONS};
pub use record::{ChunkMetadata, ChunkRecord};
pub use traits::RetrievedChunk;
