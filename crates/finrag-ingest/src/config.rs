//! Configuration for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tokenizer used when none is configured explicitly
pub const DEFAULT_TOKENIZER_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Speech recognition settings, fixed when the audio converter is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrOptions {
    /// Program used to decode audio to 16 kHz mono WAV
    pub ffmpeg_program: String,

    /// Whisper command-line program
    pub whisper_program: String,

    /// Whisper model tier
    pub model: String,

    /// Spoken language hint; auto-detected when unset
    pub language: Option<String>,
}

impl Default for AsrOptions {
    fn default() -> Self {
        Self {
            ffmpeg_program: "ffmpeg".to_string(),
            whisper_program: "whisper".to_string(),
            model: "turbo".to_string(),
            language: None,
        }
    }
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,

    /// Merge adjacent undersized chunks from the same section
    pub merge_peers: bool,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Hugging Face model whose tokenizer measures chunk budgets
    pub tokenizer_id: String,

    /// Local `tokenizer.json` for `tokenizer_id`; fetched from the hub when unset
    pub tokenizer_path: Option<PathBuf>,

    /// Measure chunks in Unicode words instead of `tokenizer_id` tokens
    pub count_words: bool,

    /// Files converted at the same time (1 = strictly sequential)
    pub concurrency: usize,

    /// Upper bound on conversion + chunking time per file (seconds)
    pub file_timeout_secs: Option<u64>,

    /// Audio transcription settings
    pub asr: AsrOptions,
}

impl IngestConfig {
    /// Get the per-file timeout as a Duration
    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.file_timeout_secs == Some(0) {
            return Err("file_timeout_secs must be greater than 0".to_string());
        }
        if self.tokenizer_id.trim().is_empty() {
            return Err("tokenizer_id cannot be empty".to_string());
        }
        if self.asr.model.trim().is_empty() {
            return Err("asr.model cannot be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            merge_peers: true,
            recursive: false,
            tokenizer_id: DEFAULT_TOKENIZER_ID.to_string(),
            tokenizer_path: None,
            count_words: false,
            concurrency: 1,
            file_timeout_secs: None,
            asr: AsrOptions::default(),
        }
    }
}
