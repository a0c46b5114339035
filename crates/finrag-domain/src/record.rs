//! Chunk records handed to the vector store

use serde::{Deserialize, Serialize};

/// Provenance and position of a chunk within its source document
///
/// Serializes to the flat mapping the vector store persists:
/// `source`, `source_name`, `document_chunk_index`,
/// `total_chunks_in_document`, `file_format` and, once assigned, the
/// run-wide `chunk_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Full path of the source file
    pub source: String,

    /// File name of the source file
    pub source_name: String,

    /// 0-based position of the chunk within its document
    pub document_chunk_index: usize,

    /// Number of chunks produced for the document
    pub total_chunks_in_document: usize,

    /// Extension of the source file, including the leading dot
    pub file_format: String,

    /// 0-based position of the chunk across the whole run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

/// A chunk ready for embedding and storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Contextualized chunk text (heading ancestry + chunk text)
    pub content: String,

    /// Provenance metadata
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    /// Metadata as a flat JSON object
    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.metadata).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chunk_index: Option<usize>) -> ChunkRecord {
        ChunkRecord {
            content: "Annual Report\nRevenue grew.".to_string(),
            metadata: ChunkMetadata {
                source: "/raw/report.pdf".to_string(),
                source_name: "report.pdf".to_string(),
                document_chunk_index: 1,
                total_chunks_in_document: 2,
                file_format: ".pdf".to_string(),
                chunk_index,
            },
        }
    }

    #[test]
    fn test_metadata_keys() {
        let json = record(Some(7)).metadata_json();
        let object = json.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "chunk_index",
                "document_chunk_index",
                "file_format",
                "source",
                "source_name",
                "total_chunks_in_document",
            ]
        );
        assert_eq!(object["chunk_index"], 7);
    }

    #[test]
    fn test_global_index_omitted_when_unassigned() {
        let json = record(None).metadata_json();
        assert!(json.get("chunk_index").is_none());
        assert_eq!(json["total_chunks_in_document"], 2);
    }

    #[test]
    fn test_metadata_parses_without_global_index() {
        let metadata: ChunkMetadata = serde_json::from_str(
            r#"{"source":"a","source_name":"a","document_chunk_index":0,"total_chunks_in_document":1,"file_format":".md"}"#,
        )
        .unwrap();
        assert!(metadata.chunk_index.is_none());
    }
}
