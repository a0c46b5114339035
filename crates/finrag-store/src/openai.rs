//! OpenAI-compatible embeddings endpoint
//!
//! Uses the blocking `reqwest` client, so calls must not be made from inside
//! an async task; the CLI runs them on `spawn_blocking` threads.

use crate::embedding::{EmbeddingError, EmbeddingModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimension of `text-embedding-3-small`
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Default timeout for embedding requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Texts sent per request
pub const DEFAULT_BATCH_SIZE: usize = 96;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding model served over the OpenAI embeddings API
pub struct OpenAiEmbeddingModel {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    max_retries: u32,
    batch_size: usize,
}

impl OpenAiEmbeddingModel {
    /// Create a client for `text-embedding-3-small` at the default endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Use a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different model and its output dimension
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set how many texts are sent per request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: (self.model.starts_with("text-embedding-3")
                && self.dimension != DEFAULT_EMBEDDING_DIMENSION)
                .then_some(self.dimension),
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).bearer_auth(&self.api_key).json(&body).send() {
                Ok(response) if response.status().is_success() => {
                    let text = response
                        .text()
                        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
                    return parse_response(&text, input.len(), self.dimension);
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
                    // client errors will not improve on retry
                    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(EmbeddingError::Request(format!("HTTP {}: {}", status, error_text)));
                    }
                    last_error = Some(EmbeddingError::Request(format!("HTTP {}: {}", status, error_text)));
                }
                Err(e) => {
                    last_error = Some(EmbeddingError::Request(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!("Embedding request failed, retrying in {}s", delay.as_secs());
                std::thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| EmbeddingError::Request("Max retries exceeded".to_string())))
    }
}

impl EmbeddingModel for OpenAiEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }
        let mut vectors = self.request(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(model = %self.model, size = batch.len(), "embedding batch");
            vectors.extend(self.request(batch)?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Decode an embeddings response, restoring input order
fn parse_response(body: &str, expected: usize, dimension: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    if response.data.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }

    response.data.sort_by_key(|d| d.index);
    response
        .data
        .into_iter()
        .map(|d| {
            if d.embedding.len() == dimension {
                Ok(d.embedding)
            } else {
                Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: d.embedding.len(),
                })
            }
        })
        .collect()
}
