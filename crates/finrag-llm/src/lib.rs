//! finrag LLM Provider Layer
//!
//! Chat model providers and the tool-calling agent that answers questions
//! over ingested documents.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from
//! `finrag-domain`, plus an [`Agent`] that drives a provider through the
//! `retrieve_context` tool backed by any `ContextRetriever`.
//!
//! # Providers
//!
//! - `MockProvider`: scripted turns for testing
//! - `OpenAiProvider`: OpenAI-compatible chat completions API
//!
//! # Examples
//!
//! ```
//! use finrag_llm::MockProvider;
//! use finrag_domain::traits::LlmProvider;
//! use finrag_domain::ChatMessage;
//!
//! let provider = MockProvider::new("Revenue grew 12%.");
//! let turn = provider.chat(&[ChatMessage::user("How did revenue do?")], &[]).unwrap();
//! assert_eq!(turn.content, "Revenue grew 12%.");
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod openai;

use finrag_domain::traits::LlmProvider as LlmProviderTrait;
use finrag_domain::{ChatMessage, ChatTurn, ToolCall, ToolSpec};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use agent::{Agent, AgentAnswer, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_SYSTEM_PROMPT, RETRIEVE_TOOL_NAME};
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The retrieval tool failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Result<ChatTurn, String>>,
    requests: Vec<Vec<ChatMessage>>,
}

/// Mock chat provider for deterministic testing
///
/// Plays back scripted turns in order; once the script runs out every
/// request gets the default answer. Requests are recorded so tests can
/// inspect what the agent sent.
///
/// # Examples
///
/// ```
/// use finrag_llm::MockProvider;
/// use finrag_domain::traits::LlmProvider;
/// use finrag_domain::ChatMessage;
///
/// let provider = MockProvider::new("done");
/// provider.push_tool_call("retrieve_context", r#"{"query": "dividend"}"#);
///
/// let first = provider.chat(&[ChatMessage::user("q")], &[]).unwrap();
/// assert!(!first.is_final());
/// let second = provider.chat(&[ChatMessage::user("q")], &[]).unwrap();
/// assert_eq!(second.content, "done");
/// assert_eq!(provider.call_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_answer: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a provider that answers `answer` once its script is empty
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            default_answer: answer.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Queue a turn
    pub fn push_turn(&self, turn: ChatTurn) {
        self.lock().script.push_back(Ok(turn));
    }

    /// Queue a turn that calls one tool
    pub fn push_tool_call(&self, name: impl Into<String>, arguments: impl Into<String>) {
        let mut state = self.lock();
        let id = format!("call_{}", state.script.len() + state.requests.len() + 1);
        state.script.push_back(Ok(ChatTurn {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id,
                name: name.into(),
                arguments: arguments.into(),
            }],
        }));
    }

    /// Queue a failure
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock().script.push_back(Err(message.into()));
    }

    /// Number of chat requests received
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Conversations sent so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a poisoned mock only means another test thread panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ChatTurn, Self::Error> {
        let mut state = self.lock();
        state.requests.push(messages.to_vec());
        match state.script.pop_front() {
            Some(Ok(turn)) => Ok(turn),
            Some(Err(message)) => Err(LlmError::Other(message)),
            None => Ok(ChatTurn::answer(self.default_answer.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
