//! Configuration management for the CLI.
//!
//! Read from `~/.finrag/config.toml`; every section and field is optional.

use crate::error::{CliError, Result};
use finrag_ingest::IngestConfig;
use finrag_store::openai::{DEFAULT_BATCH_SIZE, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL};
use finrag_store::DEFAULT_COLLECTION;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion pipeline settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Vector store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Chat model settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Which embedding model fills the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible embeddings endpoint
    OpenAi,
    /// Offline hashed bag-of-words vectors
    Mock,
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file (default: ~/.finrag/finrag.db)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Collection the chunks are stored in
    pub collection: String,

    /// Embedding provider
    pub embedding: EmbeddingProvider,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding dimension
    pub dimension: usize,

    /// Texts embedded per request
    pub batch_size: usize,

    /// Embeddings endpoint; the `[llm]` base URL is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API base URL
    pub base_url: String,

    /// Chat model
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Chunks retrieved per tool call
    pub k: usize,

    /// Tool-calling rounds before the model must answer
    pub max_tool_rounds: usize,

    /// Replaces the built-in system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Command history size
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Delay between streamed answer characters (milliseconds)
    #[serde(default = "default_stream_delay_ms")]
    pub stream_delay_ms: u64,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// The finrag home directory.
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".finrag"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if it is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path()?)
    }

    /// Load configuration from `path`, or defaults if it is missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.ingest.validate().map_err(CliError::Config)?;
        if self.store.collection.trim().is_empty() {
            return Err(CliError::Config("store.collection cannot be empty".into()));
        }
        if self.store.dimension == 0 {
            return Err(CliError::Config("store.dimension must be greater than 0".into()));
        }
        if self.llm.k == 0 {
            return Err(CliError::Config("llm.k must be greater than 0".into()));
        }
        Ok(())
    }

    /// SQLite database path.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.store.database {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("finrag.db")),
        }
    }

    /// Embeddings endpoint.
    pub fn embedding_base_url(&self) -> &str {
        self.store.base_url.as_deref().unwrap_or(&self.llm.base_url)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: None,
            collection: DEFAULT_COLLECTION.to_string(),
            embedding: EmbeddingProvider::OpenAi,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: DEFAULT_BATCH_SIZE,
            base_url: None,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: finrag_llm::openai::DEFAULT_BASE_URL.to_string(),
            model: finrag_llm::openai::DEFAULT_MODEL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            k: finrag_store::DEFAULT_K,
            max_tool_rounds: finrag_llm::DEFAULT_MAX_TOOL_ROUNDS,
            system_prompt: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            history_size: 1000,
            stream_delay_ms: default_stream_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_history_size() -> usize {
    1000
}

fn default_stream_delay_ms() -> u64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.collection, "my_documents");
        assert_eq!(config.store.embedding, EmbeddingProvider::OpenAi);
        assert_eq!(config.store.dimension, 1536);
        assert_eq!(config.llm.model, "gpt-5-mini");
        assert_eq!(config.llm.k, 3);
        assert_eq!(config.ingest.max_tokens, 512);
        assert!(config.settings.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.settings.history_size, 1000);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[ingest]
max_tokens = 256
recursive = true

[store]
embedding = "mock"
dimension = 384
database = "/tmp/finrag-test.db"

[settings]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ingest.max_tokens, 256);
        assert!(config.ingest.recursive);
        assert!(config.ingest.merge_peers);
        assert_eq!(config.store.embedding, EmbeddingProvider::Mock);
        assert_eq!(config.store.dimension, 384);
        assert_eq!(config.store.collection, "my_documents");
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/finrag-test.db"));
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ingest]\nmax_tokens = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Config(_))));

        fs::write(&path, "[store]\nembedding = \"cohere\"\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.llm.model = "gpt-4o-mini".to_string();
        config.store.base_url = Some("http://localhost:8000/v1".to_string());
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.llm.model, "gpt-4o-mini");
        assert_eq!(reloaded.embedding_base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_embedding_url_falls_back_to_llm() {
        let config = Config::default();
        assert_eq!(config.embedding_base_url(), "https://api.openai.com/v1");
    }
}
