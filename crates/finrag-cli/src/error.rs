//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion error
    #[error("Ingestion error: {0}")]
    Ingest(#[from] finrag_ingest::IngestError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] finrag_store::StoreError),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] finrag_store::EmbeddingError),

    /// Chat model error
    #[error("{0}")]
    Llm(#[from] finrag_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Line editor error
    #[error("Line editor error: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No API key available
    #[error("No API key found. Set {0} or pass --api-key.")]
    MissingApiKey(String),

    /// Every file in the run failed
    #[error("All {0} file(s) failed to process")]
    NothingIngested(usize),
}
