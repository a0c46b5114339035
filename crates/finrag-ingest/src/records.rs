//! Chunk records with provenance metadata

use crate::chunking::Chunk;
use finrag_domain::{ChunkMetadata, ChunkRecord, SourceFile};

/// Assembles storage records from one file's chunks
pub struct RecordBuilder;

impl RecordBuilder {
    /// One record per chunk, indexed 0..n within the file
    ///
    /// The chunk sequence is fully materialized before this is called, so
    /// `total_chunks_in_document` is known for every record.
    pub fn build<F>(file: &SourceFile, chunks: &[Chunk], contextualize: F) -> Vec<ChunkRecord>
    where
        F: Fn(&Chunk) -> String,
    {
        let total = chunks.len();
        let source = file.path().to_string_lossy().into_owned();
        let source_name = file.name();
        let file_format = file.extension();

        chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| ChunkRecord {
                content: contextualize(chunk),
                metadata: ChunkMetadata {
                    source: source.clone(),
                    source_name: source_name.clone(),
                    document_chunk_index: index,
                    total_chunks_in_document: total,
                    file_format: file_format.clone(),
                    chunk_index: None,
                },
            })
            .collect()
    }
}

/// Number records across a whole run in output order
pub fn assign_global_indices(records: &mut [ChunkRecord]) {
    for (index, record) in records.iter_mut().enumerate() {
        record.metadata.chunk_index = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            headings: vec!["Notes".to_string()],
            token_count: 1,
            oversized: false,
        }
    }

    #[test]
    fn test_indices_and_totals() {
        let file = SourceFile::classify("/data/q3/Notes.MD");
        let records = RecordBuilder::build(&file, &[chunk("a"), chunk("b"), chunk("c")], |c| {
            format!("Notes\n{}", c.text)
        });

        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.metadata.document_chunk_index, i);
            assert_eq!(record.metadata.total_chunks_in_document, 3);
            assert_eq!(record.metadata.source, "/data/q3/Notes.MD");
            assert_eq!(record.metadata.source_name, "Notes.MD");
            assert_eq!(record.metadata.file_format, ".MD");
            assert_eq!(record.metadata.chunk_index, None);
        }
        assert_eq!(records[1].content, "Notes\nb");
    }

    #[test]
    fn test_no_chunks_no_records() {
        let records = RecordBuilder::build(&SourceFile::classify("empty.txt"), &[], |c| c.text.clone());
        assert!(records.is_empty());
    }

    #[test]
    fn test_global_indices_follow_output_order() {
        let a = RecordBuilder::build(&SourceFile::classify("a.md"), &[chunk("1"), chunk("2")], |c| c.text.clone());
        let b = RecordBuilder::build(&SourceFile::classify("b.md"), &[chunk("3")], |c| c.text.clone());
        let mut all: Vec<ChunkRecord> = a.into_iter().chain(b).collect();

        assert_global(&mut all);
    }

    fn assert_global(records: &mut [ChunkRecord]) {
        assign_global_indices(records);
        let indices: Vec<Option<usize>> = records.iter().map(|r| r.metadata.chunk_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(records[2].metadata.document_chunk_index, 0);
    }
}
