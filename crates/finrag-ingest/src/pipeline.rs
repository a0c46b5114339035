//! Batch ingestion pipeline
//!
//! Drives discovery, classification, conversion, chunking and record
//! building over a directory. Every per-file error is caught at the file
//! boundary and recorded in the run summary; only an unusable input
//! directory aborts a run.

use crate::chunking::HybridChunker;
use crate::config::IngestConfig;
use crate::convert::ConverterSet;
use crate::discovery::discover_files;
use crate::error::IngestError;
use crate::records::RecordBuilder;
use crate::tokenizer::{load_tokenizer, TokenCounter, WordTokenizer};
use crate::types::{
    FailureKind, FileFailure, FileOutcome, IngestReport, ProcessingResult, ProcessingStatus,
};
use finrag_domain::{ChunkRecord, ConvertedDocument, SourceFile};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Statistics and records for a file that made it through
struct Processed {
    content_length: usize,
    timestamp_segments: usize,
    records: Vec<ChunkRecord>,
}

/// Ingestion pipeline with run-scoped converters and chunker
pub struct IngestPipeline {
    config: IngestConfig,
    converters: Arc<ConverterSet>,
    chunker: Arc<HybridChunker>,
}

impl IngestPipeline {
    /// Create a pipeline with the standard converters and configured tokenizer
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate().map_err(IngestError::Config)?;
        let tokenizer = load_tokenizer(&config)?;
        let converters = ConverterSet::new(config.asr.clone());
        Self::with_components(config, converters, tokenizer)
    }

    /// Create a pipeline for [`convert_directory`](Self::convert_directory) only
    ///
    /// Export never chunks, so no tokenizer is fetched; `run` on this
    /// pipeline measures chunks in words.
    pub fn exporter(config: IngestConfig) -> Result<Self, IngestError> {
        let converters = ConverterSet::new(config.asr.clone());
        Self::with_components(config, converters, Arc::new(WordTokenizer))
    }

    /// Create a pipeline from explicit converters and tokenizer
    pub fn with_components(
        config: IngestConfig,
        converters: ConverterSet,
        tokenizer: Arc<dyn TokenCounter>,
    ) -> Result<Self, IngestError> {
        config.validate().map_err(IngestError::Config)?;
        let chunker = HybridChunker::new(tokenizer, config.max_tokens, config.merge_peers);
        Ok(Self {
            config,
            converters: Arc::new(converters),
            chunker: Arc::new(chunker),
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Chunker shared by every file in a run
    pub fn chunker(&self) -> &HybridChunker {
        &self.chunker
    }

    /// Converters shared by every file in a run
    pub fn converters(&self) -> &ConverterSet {
        &self.converters
    }

    /// Ingest every file under `root`
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        let root = root.as_ref();
        let files = discover_files(root, self.config.recursive)?;

        if files.is_empty() {
            warn!("No files found in {}", root.display());
            return Ok(IngestReport::empty());
        }

        info!(
            "Processing {} file(s) from {} (max_tokens={}, tokenizer={}, concurrency={})",
            files.len(),
            root.display(),
            self.config.max_tokens,
            self.chunker.tokenizer().name(),
            self.config.concurrency
        );

        // buffered() yields in input order, so indices match the sorted traversal
        let outcomes: Vec<FileOutcome> = stream::iter(files)
            .map(|path| self.process_file(path))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let report = IngestReport::from_outcomes(outcomes);
        info!(
            "Run complete: {}/{} file(s) succeeded, {} record(s)",
            report.summary.succeeded, report.summary.total_files, report.summary.total_records
        );
        Ok(report)
    }

    /// Process one file; never fails, errors become a failed result
    pub async fn process_file(&self, path: PathBuf) -> FileOutcome {
        let started = Instant::now();
        debug!(path = %path.display(), "discovered");

        let file = SourceFile::classify(path);
        debug!(file = %file.name(), kind = %file.kind(), "classified");

        let converters = Arc::clone(&self.converters);
        let chunker = Arc::clone(&self.chunker);
        let task_file = file.clone();
        let processed = self
            .blocking(move || process_blocking(&converters, &chunker, &task_file))
            .await;

        match processed {
            Ok(processed) => {
                let chunk_count = processed.records.len();
                info!("✓ {} → {} chunk(s)", file.name(), chunk_count);
                let result = ProcessingResult {
                    status: ProcessingStatus::Success,
                    content_length: Some(processed.content_length),
                    chunk_count: Some(chunk_count),
                    timestamp_segments: (processed.timestamp_segments > 0)
                        .then_some(processed.timestamp_segments),
                    ..base_result(&file, started)
                };
                FileOutcome {
                    result,
                    records: processed.records,
                }
            }
            Err(failure) => self.failed(&file, failure, started),
        }
    }

    /// Convert every file under `root` and write markdown exports to `output_dir`
    ///
    /// The directory layout under `root` is mirrored. A file exports to
    /// `<stem>.md` unless a sibling shares its stem, in which case every file
    /// of that stem keeps its extension (`report.pdf.md`, `report.txt.md`).
    pub async fn convert_directory(
        &self,
        root: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<ProcessingResult>, IngestError> {
        let root = root.as_ref();
        let output_dir = output_dir.as_ref();
        let files = discover_files(root, self.config.recursive)?;
        if files.is_empty() {
            warn!("No files found in {}", root.display());
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(output_dir).await?;
        let targets = export_targets(root, output_dir, &files);

        let mut results = Vec::with_capacity(files.len());
        for (path, target) in files.into_iter().zip(targets) {
            let started = Instant::now();
            let file = SourceFile::classify(path);
            let converters = Arc::clone(&self.converters);
            let task_file = file.clone();
            let converted = self
                .blocking(move || converters.convert(&task_file).map_err(FileFailure::from))
                .await;

            let result = match converted {
                Ok(document) => match write_export(&target, &document).await {
                    Ok(()) => {
                        info!("✓ {} → {}", file.name(), target.display());
                        exported_result(&file, &document, target, started)
                    }
                    Err(e) => {
                        let failure = FileFailure::new(
                            FailureKind::ConversionError,
                            format!("failed to write {}: {}", target.display(), e),
                        );
                        self.failed(&file, failure, started).result
                    }
                },
                Err(failure) => self.failed(&file, failure, started).result,
            };
            results.push(result);
        }

        Ok(results)
    }

    /// Run per-file work on a blocking thread under the configured timeout
    ///
    /// A panic or timeout becomes a failure for that file only.
    async fn blocking<T, F>(&self, work: F) -> Result<T, FileFailure>
    where
        F: FnOnce() -> Result<T, FileFailure> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(work);
        let joined = match self.config.file_timeout() {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(FileFailure::new(
                        FailureKind::Timeout,
                        format!("processing exceeded {}s", limit.as_secs()),
                    ))
                }
            },
            None => handle.await,
        };

        joined.map_err(|join_error| {
            FileFailure::new(
                FailureKind::ConversionError,
                format!("worker task failed: {}", join_error),
            )
        })?
    }

    fn failed(&self, file: &SourceFile, failure: FileFailure, started: Instant) -> FileOutcome {
        warn!("✗ {}: {}", file.name(), failure);
        FileOutcome {
            result: ProcessingResult {
                status: ProcessingStatus::Failed(failure),
                ..base_result(file, started)
            },
            records: Vec::new(),
        }
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("config", &self.config)
            .field("converters", &self.converters)
            .field("chunker", &self.chunker)
            .finish()
    }
}

/// Convert, chunk and build records on a blocking thread
fn process_blocking(
    converters: &ConverterSet,
    chunker: &HybridChunker,
    file: &SourceFile,
) -> Result<Processed, FileFailure> {
    let document = converters.convert(file)?;
    debug!(file = %file.name(), items = document.items.len(), "converted");

    let chunks = chunker.chunk(&document)?;
    debug!(file = %file.name(), chunks = chunks.len(), "chunked");

    let records = RecordBuilder::build(file, &chunks, |chunk| chunker.contextualize(chunk));
    debug!(file = %file.name(), records = records.len(), "recorded");

    Ok(Processed {
        content_length: document.content_length(),
        timestamp_segments: document.timestamp_segments(),
        records,
    })
}

fn base_result(file: &SourceFile, started: Instant) -> ProcessingResult {
    ProcessingResult {
        filename: file.name(),
        source: file.path().to_path_buf(),
        file_format: file.extension(),
        kind: file.kind(),
        status: ProcessingStatus::Success,
        content_length: None,
        chunk_count: None,
        timestamp_segments: None,
        output_path: None,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

/// Export path for each discovered file, in the same order
fn export_targets(root: &Path, output_dir: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    let relative: Vec<&Path> = files
        .iter()
        .map(|path| path.strip_prefix(root).unwrap_or(path.as_path()))
        .collect();

    let mut stems: HashMap<PathBuf, usize> = HashMap::new();
    for path in &relative {
        *stems.entry(path.with_extension("")).or_default() += 1;
    }

    relative
        .iter()
        .map(|path| {
            let name = if stems.get(&path.with_extension("")).copied().unwrap_or(0) > 1 {
                let mut name = path.as_os_str().to_os_string();
                name.push(".md");
                PathBuf::from(name)
            } else {
                path.with_extension("md")
            };
            output_dir.join(name)
        })
        .collect()
}

async fn write_export(target: &Path, document: &ConvertedDocument) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, document.to_markdown()).await
}

fn exported_result(
    file: &SourceFile,
    document: &ConvertedDocument,
    target: PathBuf,
    started: Instant,
) -> ProcessingResult {
    let segments = document.timestamp_segments();
    ProcessingResult {
        content_length: Some(document.content_length()),
        timestamp_segments: (segments > 0).then_some(segments),
        output_path: Some(target),
        ..base_result(file, started)
    }
}
