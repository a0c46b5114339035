//! finrag Ingest
//!
//! Turns a directory of financial documents into chunk records ready for
//! embedding.
//!
//! # Overview
//!
//! Each file is classified by extension, converted into a structured
//! [`ConvertedDocument`](finrag_domain::ConvertedDocument), split by the
//! [`HybridChunker`] into token-bounded chunks and wrapped in
//! [`ChunkRecord`](finrag_domain::ChunkRecord)s carrying provenance metadata.
//!
//! # Architecture
//!
//! ```text
//! Directory → discover → classify → ConverterSet → HybridChunker → RecordBuilder → IngestReport
//!                                    (generic | audio)
//! ```
//!
//! # Key Features
//!
//! - **Two conversion lanes**: structural parsing for PDF/DOCX/Markdown/HTML/text,
//!   external speech-to-text for audio; both built lazily, once per run
//! - **Hybrid chunking**: heading-aware, token-bounded, with peer merging
//! - **Failure isolation**: a file that fails is recorded in the summary and
//!   the run carries on
//! - **Reproducible numbering**: files are processed in sorted path order
//!
//! # Example Usage
//!
//! ```no_run
//! use finrag_ingest::{IngestConfig, IngestPipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = IngestPipeline::new(IngestConfig::default())?;
//! let report = pipeline.run("./raw_documents").await?;
//!
//! println!("Succeeded: {}", report.summary.succeeded);
//! for (filename, failure) in &report.summary.failed {
//!     println!("{}: {}", filename, failure);
//! }
//! println!("Records: {}", report.records.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod config;
mod types;
mod convert;
mod tokenizer;
mod chunking;
mod records;
mod discovery;
mod pipeline;


pub use error::{ChunkingError, ConvertError, IngestError};
pub use config::{AsrOptions, IngestConfig, DEFAULT_TOKENIZER_ID};
pub use types::{
    FailureKind, FileFailure, FileOutcome, IngestReport, ProcessingResult, ProcessingStatus,
    RunSummary,
};
pub use convert::{AudioConverter, ConverterSet, DocumentConverter, GenericConverter};
pub use tokenizer::{load_tokenizer, HfTokenizer, TokenCounter, WordTokenizer};
pub use chunking::{Chunk, HybridChunker};
pub use records::{assign_global_indices, RecordBuilder};
pub use discovery::discover_files;
pub use pipeline::IngestPipeline;
