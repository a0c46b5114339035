//! Everything a command needs to build its collaborators.
//!
//! Store, embedding and chat clients are synchronous; build and use them
//! inside `tokio::task::spawn_blocking`.

use crate::config::{Config, EmbeddingProvider};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use finrag_llm::{Agent, OpenAiProvider};
use finrag_store::{EmbeddingModel, MockEmbeddingModel, OpenAiEmbeddingModel, Retriever, SqliteStore};
use tracing::debug;

/// Embedding model chosen at runtime
pub type DynEmbeddingModel = Box<dyn EmbeddingModel>;

/// Agent wired to the configured store and chat endpoint
pub type AppAgent = Agent<OpenAiProvider, Retriever<DynEmbeddingModel>>;

/// Resolved configuration plus output settings
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Output formatter
    pub formatter: Formatter,
    api_key: Option<String>,
}

impl AppContext {
    /// Create a context; `api_key` overrides the configured environment variable
    pub fn new(config: Config, formatter: Formatter, api_key: Option<String>) -> Self {
        Self {
            config,
            formatter,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// API key from the command line, or from `[llm] api_key_env`
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        let var = &self.config.llm.api_key_env;
        std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CliError::MissingApiKey(var.clone()))
    }

    /// Open the configured collection
    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.config.database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening store");
        Ok(SqliteStore::open(&path, &self.config.store.collection, self.config.store.dimension)?)
    }

    /// Build the configured embedding model
    pub fn embedding_model(&self) -> Result<DynEmbeddingModel> {
        let store = &self.config.store;
        match store.embedding {
            EmbeddingProvider::Mock => Ok(Box::new(MockEmbeddingModel::new(store.dimension))),
            EmbeddingProvider::OpenAi => {
                let model = OpenAiEmbeddingModel::new(self.api_key()?)?
                    .with_base_url(self.config.embedding_base_url())
                    .with_model(&store.embedding_model, store.dimension)
                    .with_batch_size(store.batch_size);
                Ok(Box::new(model))
            }
        }
    }

    /// Store plus embedding model as a `retrieve_context` tool
    pub fn retriever(&self) -> Result<Retriever<DynEmbeddingModel>> {
        Ok(Retriever::new(self.open_store()?, self.embedding_model()?)?)
    }

    /// Chat agent over the configured store
    pub fn agent(&self) -> Result<AppAgent> {
        let llm = &self.config.llm;
        let provider = OpenAiProvider::new(self.api_key()?)?
            .with_base_url(&llm.base_url)
            .with_model(&llm.model);

        let mut agent = Agent::new(provider, self.retriever()?)
            .with_k(llm.k)
            .with_max_tool_rounds(llm.max_tool_rounds);
        if let Some(prompt) = &llm.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        Ok(agent)
    }
}
