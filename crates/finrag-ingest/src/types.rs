//! Per-file outcomes and run summaries

use crate::error::{ChunkingError, ConvertError};
use crate::records::assign_global_indices;
use finrag_domain::{ChunkRecord, DocumentKind};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Why a file was dropped from the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// The file vanished between discovery and processing
    FileNotFound,
    /// A required external tool is not installed
    MissingDependency,
    /// The converter rejected the file
    ConversionError,
    /// The converted document could not be chunked
    ChunkingError,
    /// Processing exceeded the per-file time limit
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::FileNotFound => "file not found",
            FailureKind::MissingDependency => "missing dependency",
            FailureKind::ConversionError => "conversion error",
            FailureKind::ChunkingError => "chunking error",
            FailureKind::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// A failure attributed to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

impl FileFailure {
    /// Create a failure
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<ConvertError> for FileFailure {
    fn from(err: ConvertError) -> Self {
        let kind = match &err {
            ConvertError::FileNotFound(_) => FailureKind::FileNotFound,
            ConvertError::MissingDependency { .. } => FailureKind::MissingDependency,
            ConvertError::Conversion(_) | ConvertError::Io(_) => FailureKind::ConversionError,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ChunkingError> for FileFailure {
    fn from(err: ChunkingError) -> Self {
        Self::new(FailureKind::ChunkingError, err.to_string())
    }
}

/// Terminal state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Converted and chunked
    Success,
    /// Dropped from the run
    Failed(FileFailure),
}

/// Outcome of processing one file; never modified once built
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    /// File name
    pub filename: String,

    /// Full path
    pub source: PathBuf,

    /// Extension with leading dot
    pub file_format: String,

    /// Processing lane
    pub kind: DocumentKind,

    /// Success or failure
    pub status: ProcessingStatus,

    /// Characters of converted text
    pub content_length: Option<usize>,

    /// Chunks produced
    pub chunk_count: Option<usize>,

    /// Timestamped transcript segments (audio only)
    pub timestamp_segments: Option<usize>,

    /// Markdown export written in convert mode
    pub output_path: Option<PathBuf>,

    /// Wall-clock processing time
    pub elapsed_ms: u64,
}

impl ProcessingResult {
    /// Whether the file succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.status, ProcessingStatus::Success)
    }

    /// Failure details, if any
    pub fn failure(&self) -> Option<&FileFailure> {
        match &self.status {
            ProcessingStatus::Success => None,
            ProcessingStatus::Failed(failure) => Some(failure),
        }
    }
}

/// Result of [`IngestPipeline::process_file`](crate::IngestPipeline::process_file)
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Per-file result
    pub result: ProcessingResult,
    /// Records produced (empty on failure)
    pub records: Vec<ChunkRecord>,
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files discovered
    pub total_files: usize,
    /// Files that produced records
    pub succeeded: usize,
    /// `(filename, failure)` per failed file, in processing order
    pub failed: Vec<(String, FileFailure)>,
    /// Records produced across all files
    pub total_records: usize,
}

impl RunSummary {
    /// Number of failed files
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Whether the input directory held no files at all
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records in output order, globally indexed
    pub records: Vec<ChunkRecord>,
    /// One result per discovered file, in processing order
    pub results: Vec<ProcessingResult>,
    /// Aggregate counts
    pub summary: RunSummary,
}

impl IngestReport {
    /// Report for a directory with no files
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fold per-file outcomes (in sorted order) into a report
    pub fn from_outcomes(outcomes: Vec<FileOutcome>) -> Self {
        let mut report = Self::default();
        report.summary.total_files = outcomes.len();

        for outcome in outcomes {
            match outcome.result.failure() {
                Some(failure) => report
                    .summary
                    .failed
                    .push((outcome.result.filename.clone(), failure.clone())),
                None => report.summary.succeeded += 1,
            }
            report.records.extend(outcome.records);
            report.results.push(outcome.result);
        }

        assign_global_indices(&mut report.records);
        report.summary.total_records = report.records.len();
        report
    }
}
