//! Tool-calling agent over ingested documents
//!
//! The agent sends the system prompt and the user's question, executes any
//! `retrieve_context` calls the model makes, feeds their output back and
//! stops at the first assistant turn that calls no tools.

use crate::LlmError;
use finrag_domain::traits::{ContextRetriever, LlmProvider};
use finrag_domain::{ChatMessage, RetrievedChunk, ToolCall, ToolSpec};
use serde::Deserialize;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Name of the retrieval tool offered to the model
pub const RETRIEVE_TOOL_NAME: &str = "retrieve_context";

/// Tool-calling rounds allowed before the model must answer
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 4;

/// Instructions sent ahead of every question
pub const DEFAULT_SYSTEM_PROMPT: &str = "You have access to a tool that retrieves context from multiple \
financial documents and reports. Use the tool to help answer user queries. If you do, please mention \
the source of the information at the end of your response.";

#[derive(Deserialize)]
struct RetrieveArgs {
    query: String,
}

/// The agent's reply to one question
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentAnswer {
    /// Final assistant text
    pub text: String,

    /// Chunks handed to the model while answering, in retrieval order
    pub sources: Vec<RetrievedChunk>,
}

impl AgentAnswer {
    /// Distinct source file names, in retrieval order
    pub fn source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for chunk in &self.sources {
            let name = chunk.metadata.source_name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Answers questions with a chat model and a context retriever
pub struct Agent<P, R> {
    provider: P,
    retriever: R,
    system_prompt: String,
    max_tool_rounds: usize,
    k: usize,
}

impl<P, R> Agent<P, R>
where
    P: LlmProvider<Error = LlmError>,
    R: ContextRetriever,
    R::Error: Display,
{
    /// Create an agent with the default prompt, 4 tool rounds and k = 3
    pub fn new(provider: P, retriever: R) -> Self {
        Self {
            provider,
            retriever,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            k: 3,
        }
    }

    /// Replace the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set how many tool-calling rounds are allowed
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Set how many chunks each retrieval returns
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Chat provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Context retriever
    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Definition of the retrieval tool
    pub fn tool_spec() -> ToolSpec {
        ToolSpec {
            name: RETRIEVE_TOOL_NAME.to_string(),
            description: "Retrieve information to help answer a query.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up in the financial documents"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Answer one question
    ///
    /// Once `max_tool_rounds` rounds are spent the tool is withdrawn and the
    /// model is asked for a final answer.
    pub fn run(&self, query: &str) -> Result<AgentAnswer, LlmError> {
        let tools = [Self::tool_spec()];
        let mut messages = vec![ChatMessage::system(&self.system_prompt), ChatMessage::user(query)];
        let mut sources = Vec::new();

        for round in 0..=self.max_tool_rounds {
            let offered: &[ToolSpec] = if round < self.max_tool_rounds { &tools } else { &[] };
            let turn = self.provider.chat(&messages, offered)?;

            if turn.is_final() {
                info!(
                    model = self.provider.model_name(),
                    rounds = round,
                    sources = sources.len(),
                    "answered"
                );
                return Ok(AgentAnswer {
                    text: turn.content,
                    sources,
                });
            }
            if offered.is_empty() {
                return Err(LlmError::InvalidResponse(format!(
                    "model still calling tools after {} rounds",
                    self.max_tool_rounds
                )));
            }

            let calls = turn.tool_calls.clone();
            messages.push(turn.into_message());
            for call in &calls {
                let output = self.execute(call, &mut sources)?;
                messages.push(ChatMessage::tool(call.id.clone(), output));
            }
        }

        Err(LlmError::Other("no answer produced".to_string()))
    }

    fn execute(&self, call: &ToolCall, sources: &mut Vec<RetrievedChunk>) -> Result<String, LlmError> {
        if call.name != RETRIEVE_TOOL_NAME {
            warn!(tool = %call.name, "model called an unknown tool");
            return Ok(format!("Error: unknown tool '{}'", call.name));
        }
        let args: RetrieveArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(arguments = %call.arguments, "invalid tool arguments");
                return Ok(format!("Error: invalid arguments: {}", e));
            }
        };

        let chunks = self
            .retriever
            .retrieve(&args.query, self.k)
            .map_err(|e| LlmError::Retrieval(e.to_string()))?;
        debug!(query = %args.query, hits = chunks.len(), "tool call");

        let output = serialize_chunks(&chunks);
        for chunk in chunks {
            let seen = sources.iter().any(|s: &RetrievedChunk| {
                s.metadata.source == chunk.metadata.source
                    && s.metadata.document_chunk_index == chunk.metadata.document_chunk_index
            });
            if !seen {
                sources.push(chunk);
            }
        }
        Ok(output)
    }
}

fn serialize_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Source: {}\nContent: {}",
                serde_json::to_string(&chunk.metadata).unwrap_or_default(),
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use finrag_domain::{ChatRole, ChatTurn, ChunkMetadata};
    use std::sync::Mutex;

    struct FakeRetriever {
        chunks: Vec<RetrievedChunk>,
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeRetriever {
        fn new(chunks: Vec<RetrievedChunk>) -> Self {
            Self {
                chunks,
                queries: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl ContextRetriever for FakeRetriever {
        type Error = String;

        fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, String> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err("database is locked".to_string());
            }
            Ok(self.chunks.iter().take(k).cloned().collect())
        }
    }

    fn chunk(name: &str, index: usize, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: format!("/raw/{}", name),
                source_name: name.to_string(),
                document_chunk_index: index,
                total_chunks_in_document: 4,
                file_format: ".pdf".to_string(),
                chunk_index: Some(index),
            },
            score: 0.8,
        }
    }

    fn retriever() -> FakeRetriever {
        FakeRetriever::new(vec![
            chunk("10k.pdf", 0, "Revenue grew 12% to $4.2B."),
            chunk("10k.pdf", 1, "Dividend raised to $0.40."),
            chunk("call.mp3", 0, "[0.0s - 5.0s] Margins held steady."),
        ])
    }

    #[test]
    fn test_direct_answer_skips_retrieval() {
        let agent = Agent::new(MockProvider::new("Hello!"), retriever());

        let answer = agent.run("hi").unwrap();

        assert_eq!(answer.text, "Hello!");
        assert!(answer.sources.is_empty());
        assert!(agent.retriever().queries.lock().unwrap().is_empty());

        let requests = agent.provider().requests();
        assert_eq!(requests[0][0].role, ChatRole::System);
        assert_eq!(requests[0][0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(requests[0][1].content, "hi");
    }

    #[test]
    fn test_tool_round_feeds_context_back() {
        let provider = MockProvider::new("Revenue grew 12%. Source: 10k.pdf");
        provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "revenue growth"}"#);
        let agent = Agent::new(provider, retriever()).with_k(2);

        let answer = agent.run("How did revenue do?").unwrap();

        assert_eq!(answer.text, "Revenue grew 12%. Source: 10k.pdf");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.source_names(), vec!["10k.pdf"]);
        assert_eq!(*agent.retriever().queries.lock().unwrap(), vec!["revenue growth"]);

        let second = &agent.provider().requests()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, ChatRole::Assistant);
        assert_eq!(second[3].role, ChatRole::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some(second[2].tool_calls[0].id.as_str()));
        assert!(second[3].content.starts_with("Source: {"));
        assert!(second[3].content.contains("Content: Dividend raised to $0.40."));
    }

    #[test]
    fn test_sources_deduplicated_across_rounds() {
        let provider = MockProvider::new("done");
        provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "a"}"#);
        provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "b"}"#);
        let agent = Agent::new(provider, retriever());

        let answer = agent.run("q").unwrap();

        assert_eq!(answer.sources.len(), 3);
        assert_eq!(answer.source_names(), vec!["10k.pdf", "call.mp3"]);
    }

    #[test]
    fn test_bad_tool_calls_reported_to_model() {
        let provider = MockProvider::new("sorry");
        provider.push_tool_call("web_search", r#"{"query": "x"}"#);
        provider.push_tool_call(RETRIEVE_TOOL_NAME, "not json");
        let agent = Agent::new(provider, retriever());

        let answer = agent.run("q").unwrap();

        assert_eq!(answer.text, "sorry");
        let last = agent.provider().requests().pop().unwrap();
        let tool_outputs: Vec<&str> = last
            .iter()
            .filter(|m| m.role == ChatRole::Tool)
            .map(|m| m.content.as_str())
            .collect();
        assert!(tool_outputs[0].contains("unknown tool 'web_search'"));
        assert!(tool_outputs[1].starts_with("Error: invalid arguments"));
    }

    #[test]
    fn test_tools_withdrawn_after_max_rounds() {
        let provider = MockProvider::new("final");
        for _ in 0..2 {
            provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "loop"}"#);
        }
        let agent = Agent::new(provider, retriever()).with_max_tool_rounds(2);

        let answer = agent.run("q").unwrap();

        assert_eq!(answer.text, "final");
        assert_eq!(agent.provider().call_count(), 3);
    }

    #[test]
    fn test_tool_call_after_limit_is_an_error() {
        let provider = MockProvider::new("never");
        for _ in 0..3 {
            provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "loop"}"#);
        }
        let agent = Agent::new(provider, retriever()).with_max_tool_rounds(2);

        assert!(matches!(agent.run("q"), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_retrieval_failure_propagates() {
        let provider = MockProvider::new("unused");
        provider.push_tool_call(RETRIEVE_TOOL_NAME, r#"{"query": "x"}"#);
        let mut failing = retriever();
        failing.fail = true;
        let agent = Agent::new(provider, failing);

        match agent.run("q") {
            Err(LlmError::Retrieval(message)) => assert!(message.contains("locked")),
            other => panic!("expected retrieval error, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_failure_propagates() {
        let provider = MockProvider::default();
        provider.push_error("upstream 500");
        let agent = Agent::new(provider, retriever());

        assert!(matches!(agent.run("q"), Err(LlmError::Other(_))));
    }

    #[test]
    fn test_custom_system_prompt() {
        let agent = Agent::new(MockProvider::new("ok"), retriever()).with_system_prompt("Be terse.");
        agent.run("q").unwrap();
        assert_eq!(agent.provider().requests()[0][0].content, "Be terse.");
    }

    #[test]
    fn test_tool_spec_shape() {
        let spec = Agent::<MockProvider, FakeRetriever>::tool_spec();
        assert_eq!(spec.name, RETRIEVE_TOOL_NAME);
        assert_eq!(spec.parameters["required"][0], "query");
    }

    #[test]
    fn test_multiple_calls_in_one_turn() {
        let provider = MockProvider::new("both");
        provider.push_turn(ChatTurn {
            content: String::new(),
            tool_calls: vec![
                ToolCall {
                    id: "a".into(),
                    name: RETRIEVE_TOOL_NAME.into(),
                    arguments: r#"{"query": "revenue"}"#.into(),
                },
                ToolCall {
                    id: "b".into(),
                    name: RETRIEVE_TOOL_NAME.into(),
                    arguments: r#"{"query": "margins"}"#.into(),
                },
            ],
        });
        let agent = Agent::new(provider, retriever());

        agent.run("q").unwrap();

        let second = &agent.provider().requests()[1];
        let ids: Vec<_> = second.iter().filter_map(|m| m.tool_call_id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
