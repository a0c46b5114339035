//! Error types for ingestion

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting a single file
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The file disappeared between discovery and conversion
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An external tool the converter needs is not installed
    #[error("Missing dependency: {tool} not found ({hint})")]
    MissingDependency {
        /// Program that could not be started
        tool: String,
        /// What the operator should install
        hint: String,
    },

    /// The converter rejected or failed on the file's content
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Reading the file or scratch space failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while chunking a converted document
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// The document violates a structural invariant
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// Run-level errors; per-file problems never surface here
#[derive(Error, Debug)]
pub enum IngestError {
    /// The input directory is missing or not a directory
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error outside per-file processing (e.g. creating the export directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
