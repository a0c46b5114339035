//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use finrag_domain::RetrievedChunk;
use finrag_ingest::{IngestReport, ProcessingResult, RunSummary};
use finrag_llm::AgentAnswer;
use finrag_store::IndexStats;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const PREVIEW_CHARS: usize = 80;

/// Output formatter.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the per-file results and summary of an ingestion run.
    pub fn ingest_report(&self, report: &IngestReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "summary": report.summary,
                "results": report.results,
            }))?),
            OutputFormat::Table => {
                if report.summary.is_empty() {
                    return Ok(self.warning("No files found"));
                }
                Ok(format!(
                    "{}\n\n{}",
                    self.results_table(&report.results),
                    self.run_summary(&report.summary)
                ))
            }
        }
    }

    /// Format the results of a Markdown export.
    pub fn conversion_results(&self, results: &[ProcessingResult]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
            OutputFormat::Table => {
                if results.is_empty() {
                    return Ok(self.warning("No files found"));
                }
                let mut builder = Builder::default();
                builder.push_record(["File", "Status", "Output"]);
                for result in results {
                    let output = result
                        .output_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    builder.push_record([result.filename.clone(), self.status_cell(result), output]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format the aggregate counts of a run.
    pub fn run_summary(&self, summary: &RunSummary) -> String {
        let mut lines = vec![
            self.success(&format!(
                "Successfully processed: {}/{} documents",
                summary.succeeded, summary.total_files
            )),
            self.success(&format!("Total chunks created: {}", summary.total_records)),
        ];
        if !summary.failed.is_empty() {
            lines.push(self.error(&format!("Failed documents ({}):", summary.failed_count())));
            for (filename, failure) in &summary.failed {
                lines.push(format!("   - {}: {}", filename, failure));
            }
        }
        lines.join("\n")
    }

    /// Format what was written to the store.
    pub fn index_stats(&self, stats: &IndexStats, collection: &str) -> String {
        let mut message = format!("Stored {} chunk(s) in '{}'", stats.records_added, collection);
        if stats.sources_replaced > 0 {
            message.push_str(&format!(
                " (replaced {} chunk(s) from {} re-ingested source(s))",
                stats.chunks_removed, stats.sources_replaced
            ));
        }
        self.success(&message)
    }

    /// Format retrieved chunks.
    pub fn search_results(&self, chunks: &[RetrievedChunk]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(chunks)?),
            OutputFormat::Table => {
                if chunks.is_empty() {
                    return Ok(self.colorize("No matching chunks found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["#", "Score", "Source", "Chunk", "Content"]);
                for (rank, chunk) in chunks.iter().enumerate() {
                    builder.push_record([
                        (rank + 1).to_string(),
                        format!("{:.3}", chunk.score),
                        chunk.metadata.source_name.clone(),
                        format!(
                            "{}/{}",
                            chunk.metadata.document_chunk_index + 1,
                            chunk.metadata.total_chunks_in_document
                        ),
                        preview(&chunk.content, PREVIEW_CHARS),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format an answer for non-streamed output.
    pub fn answer(&self, answer: &AgentAnswer) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "answer": answer.text,
                "sources": answer.sources,
            }))?),
            OutputFormat::Table => Ok(answer.text.clone()),
        }
    }

    /// Format stored sources with their chunk counts.
    pub fn sources(&self, sources: &[(String, usize)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<serde_json::Value> = sources
                    .iter()
                    .map(|(source, chunks)| serde_json::json!({ "source": source, "chunks": chunks }))
                    .collect();
                Ok(serde_json::to_string_pretty(&entries)?)
            }
            OutputFormat::Table => {
                if sources.is_empty() {
                    return Ok(self.colorize("No documents stored.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Source", "Chunks"]);
                for (source, chunks) in sources {
                    builder.push_record([source.clone(), chunks.to_string()]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format the label printed before an answer.
    pub fn agent_label(&self) -> String {
        self.colorize("Agent: ", "cyan")
    }

    fn results_table(&self, results: &[ProcessingResult]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["File", "Lane", "Status", "Chunks", "Chars", "Time"]);
        for result in results {
            builder.push_record([
                result.filename.clone(),
                result.kind.to_string(),
                self.status_cell(result),
                optional(result.chunk_count),
                optional(result.content_length),
                format!("{:.1}s", result.elapsed_ms as f64 / 1000.0),
            ]);
        }
        self.render(builder)
    }

    fn status_cell(&self, result: &ProcessingResult) -> String {
        match result.failure() {
            None => self.colorize("ok", "green"),
            Some(failure) => self.colorize(&failure.kind.to_string(), "red"),
        }
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn optional(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// First `max` characters of `text` on one line.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_domain::{ChunkMetadata, DocumentKind};
    use finrag_ingest::{FailureKind, FileFailure, ProcessingStatus};
    use std::path::PathBuf;

    fn result(name: &str, status: ProcessingStatus) -> ProcessingResult {
        let ok = matches!(status, ProcessingStatus::Success);
        ProcessingResult {
            filename: name.to_string(),
            source: PathBuf::from("/raw").join(name),
            file_format: ".pdf".to_string(),
            kind: DocumentKind::Text,
            status,
            content_length: ok.then_some(1200),
            chunk_count: ok.then_some(3),
            timestamp_segments: None,
            output_path: None,
            elapsed_ms: 1530,
        }
    }

    fn report() -> IngestReport {
        let failure = FileFailure::new(FailureKind::ConversionError, "no text content extracted");
        IngestReport {
            records: Vec::new(),
            results: vec![
                result("10k.pdf", ProcessingStatus::Success),
                result("scan.pdf", ProcessingStatus::Failed(failure.clone())),
            ],
            summary: RunSummary {
                total_files: 2,
                succeeded: 1,
                failed: vec![("scan.pdf".to_string(), failure)],
                total_records: 3,
            },
        }
    }

    fn chunk() -> RetrievedChunk {
        RetrievedChunk {
            content: "Annual Report\nNet revenue grew 12% year over year, driven by subscription growth in all regions and a one-off licensing deal.".to_string(),
            metadata: ChunkMetadata {
                source: "/raw/10k.pdf".to_string(),
                source_name: "10k.pdf".to_string(),
                document_chunk_index: 0,
                total_chunks_in_document: 3,
                file_format: ".pdf".to_string(),
                chunk_index: Some(0),
            },
            score: 0.8731,
        }
    }

    #[test]
    fn test_ingest_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.ingest_report(&report()).unwrap();

        assert!(output.contains("10k.pdf"));
        assert!(output.contains("conversion error"));
        assert!(output.contains("✓ Successfully processed: 1/2 documents"));
        assert!(output.contains("✓ Total chunks created: 3"));
        assert!(output.contains("✗ Failed documents (1):"));
        assert!(output.contains("   - scan.pdf: "));
    }

    #[test]
    fn test_ingest_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.ingest_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["summary"]["succeeded"], 1);
        assert_eq!(value["results"][0]["filename"], "10k.pdf");
        assert_eq!(value["results"][0]["status"]["status"], "success");
    }

    #[test]
    fn test_empty_run() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.ingest_report(&IngestReport::empty()).unwrap();
        assert_eq!(output, "⚠ No files found");
    }

    #[test]
    fn test_search_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.search_results(&[chunk()]).unwrap();

        assert!(output.contains("Score"));
        assert!(output.contains("0.873"));
        assert!(output.contains("1/3"));
        assert!(output.contains("Annual Report Net revenue"));
        assert!(output.contains('…'));
    }

    #[test]
    fn test_search_empty_and_json() {
        let table = Formatter::new(OutputFormat::Table, false);
        assert!(table.search_results(&[]).unwrap().contains("No matching chunks"));

        let json = Formatter::new(OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&json.search_results(&[chunk()]).unwrap()).unwrap();
        assert_eq!(value[0]["metadata"]["source_name"], "10k.pdf");
    }

    #[test]
    fn test_answer_json_carries_sources() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let answer = AgentAnswer {
            text: "Revenue grew 12%.".to_string(),
            sources: vec![chunk()],
        };
        let value: serde_json::Value = serde_json::from_str(&formatter.answer(&answer).unwrap()).unwrap();
        assert_eq!(value["answer"], "Revenue grew 12%.");
        assert_eq!(value["sources"][0]["score"].as_f64().map(|s| s > 0.87), Some(true));
    }

    #[test]
    fn test_index_stats_message() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let stats = IndexStats {
            records_added: 7,
            sources_replaced: 1,
            chunks_removed: 4,
        };
        assert_eq!(
            formatter.index_stats(&stats, "my_documents"),
            "✓ Stored 7 chunk(s) in 'my_documents' (replaced 4 chunk(s) from 1 re-ingested source(s))"
        );
    }

    #[test]
    fn test_sources_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.sources(&[("/raw/10k.pdf".to_string(), 12)]).unwrap();
        assert!(output.contains("/raw/10k.pdf"));
        assert!(output.contains("12"));
        assert!(formatter.sources(&[]).unwrap().contains("No documents stored"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.agent_label(), "Agent: ");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short\ntext", 80), "short text");
        let long = "word ".repeat(40);
        assert_eq!(preview(&long, 20), "word word word word…");
    }
}
