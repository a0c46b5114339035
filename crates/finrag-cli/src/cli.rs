//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// finrag - Ask questions about your financial documents.
#[derive(Debug, Parser)]
#[command(name = "finrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.finrag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API key for the embedding and chat endpoints
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert, chunk, embed and store every document in a directory
    Ingest(IngestArgs),

    /// Export every document in a directory as Markdown
    Convert(ConvertArgs),

    /// Retrieve the chunks closest to a query
    Search(SearchArgs),

    /// Ask one question
    Ask(AskArgs),

    /// List stored sources
    Sources,

    /// Remove every stored chunk from the collection
    Clear(ClearArgs),

    /// Interactive question-answering session (default)
    Chat,
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Directory of raw documents
    #[arg(env = "RAW_DOCUMENTS_DIR")]
    pub dir: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum tokens per chunk
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Files converted at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-file time limit in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Measure chunks in words instead of fetching the configured tokenizer
    #[arg(long)]
    pub count_words: bool,

    /// Chunk only; do not embed or store anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the convert command.
#[derive(Debug, Parser)]
pub struct ConvertArgs {
    /// Directory of raw documents
    #[arg(env = "RAW_DOCUMENTS_DIR")]
    pub dir: PathBuf,

    /// Directory the Markdown files are written to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

/// Arguments for the search command.
#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Number of chunks to return
    #[arg(short)]
    pub k: Option<usize>,
}

/// Arguments for the ask command.
#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Print the answer at once instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}

impl AskArgs {
    /// The question as one string
    pub fn text(&self) -> String {
        self.question.join(" ")
    }
}

/// Arguments for the clear command.
#[derive(Debug, Parser)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}
