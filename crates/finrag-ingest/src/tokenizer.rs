//! Token counting for chunk budgets

use crate::config::IngestConfig;
use crate::error::IngestError;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Measures text in tokens; one instance is shared by a whole run
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Tokenizer identity
    fn name(&self) -> &str;
}

/// Hugging Face tokenizer, from a local `tokenizer.json` or the hub
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    name: String,
}

impl HfTokenizer {
    /// Load a tokenizer definition from disk
    pub fn from_file(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            IngestError::Config(format!("failed to load tokenizer {}: {}", path.display(), e))
        })?;
        Ok(Self {
            inner,
            name: name.into(),
        })
    }

    /// Fetch the tokenizer of `model_id` from the Hugging Face hub (cached locally)
    pub fn from_pretrained(model_id: &str) -> Result<Self, IngestError> {
        let inner = tokenizers::Tokenizer::from_pretrained(model_id, None).map_err(|e| {
            IngestError::Config(format!(
                "failed to fetch tokenizer {}: {} (set tokenizer_path for offline use)",
                model_id, e
            ))
        })?;
        Ok(Self {
            inner,
            name: model_id.to_string(),
        })
    }
}

impl TokenCounter for HfTokenizer {
    fn count(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                warn!("tokenizer {} failed, counting words instead: {}", self.name, e);
                WordTokenizer.count(text)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer").field("name", &self.name).finish()
    }
}

/// Counts Unicode words; deterministic and dependency-free
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl TokenCounter for WordTokenizer {
    fn count(&self, text: &str) -> usize {
        text.unicode_words().count()
    }

    fn name(&self) -> &str {
        "unicode-words"
    }
}

/// Build the run's tokenizer from configuration
///
/// `count_words` wins; otherwise `tokenizer_path` is loaded if set, and
/// `tokenizer_id` is fetched from the hub if not.
pub fn load_tokenizer(config: &IngestConfig) -> Result<Arc<dyn TokenCounter>, IngestError> {
    if config.count_words {
        info!("Measuring chunks in Unicode words");
        return Ok(Arc::new(WordTokenizer));
    }

    let tokenizer = match &config.tokenizer_path {
        Some(path) => {
            let tokenizer = HfTokenizer::from_file(path, config.tokenizer_id.clone())?;
            info!("Loaded tokenizer {} from {}", config.tokenizer_id, path.display());
            tokenizer
        }
        None => {
            let tokenizer = HfTokenizer::from_pretrained(&config.tokenizer_id)?;
            info!("Loaded tokenizer {} from the Hugging Face hub", config.tokenizer_id);
            tokenizer
        }
    };
    Ok(Arc::new(tokenizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TOKENIZER_ID;

    #[test]
    fn test_word_tokenizer_counts_words() {
        assert_eq!(WordTokenizer.count("Net revenue, after tax, rose sharply."), 6);
        assert_eq!(WordTokenizer.count("   "), 0);
    }

    /// Word-level vocabulary with whitespace/punctuation splitting
    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "net": 1, "revenue": 2, "rose": 3, ",": 4, ".": 5 },
            "unk_token": "[UNK]"
        }
    }"#;

    fn word_level_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, WORD_LEVEL_JSON.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_hf_tokenizer_counts_model_tokens() {
        let file = word_level_file();
        let tokenizer = HfTokenizer::from_file(file.path(), "word-level").unwrap();

        // punctuation is its own token, unknown words still count
        assert_eq!(tokenizer.count("Net revenue rose."), 4);
        assert_eq!(tokenizer.count("Net revenue, after tax, rose sharply."), 9);
        assert_eq!(WordTokenizer.count("Net revenue, after tax, rose sharply."), 6);
        assert_eq!(tokenizer.name(), "word-level");
    }

    #[test]
    fn test_configured_path_is_loaded() {
        let file = word_level_file();
        let config = IngestConfig {
            tokenizer_path: Some(file.path().to_path_buf()),
            ..IngestConfig::default()
        };
        let tokenizer = load_tokenizer(&config).unwrap();

        assert_eq!(tokenizer.name(), DEFAULT_TOKENIZER_ID);
        assert_eq!(tokenizer.count("revenue rose"), 2);
    }

    #[test]
    fn test_word_counting_is_opt_in() {
        let config = IngestConfig {
            count_words: true,
            tokenizer_path: Some("/nonexistent/tokenizer.json".into()),
            ..IngestConfig::default()
        };
        assert_eq!(load_tokenizer(&config).unwrap().name(), "unicode-words");
    }

    #[test]
    fn test_missing_tokenizer_file_is_config_error() {
        let config = IngestConfig {
            tokenizer_path: Some("/nonexistent/tokenizer.json".into()),
            ..IngestConfig::default()
        };
        assert!(matches!(load_tokenizer(&config), Err(IngestError::Config(_))));
    }
}
