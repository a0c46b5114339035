//! Hybrid, structure-aware chunking
//!
//! Chunking runs in three passes over a [`ConvertedDocument`]:
//!
//! 1. **Hierarchical**: every body item becomes a candidate carrying the
//!    heading path in force at that point of the document.
//! 2. **Split**: a candidate over the token budget is cut at sentence
//!    boundaries, and a sentence still over budget at word boundaries. A
//!    table, code block or single word that cannot fit is kept whole and
//!    marked [`Chunk::oversized`].
//! 3. **Peer merge**: neighbouring chunks under the same heading path are
//!    joined while the result stays within budget.
//!
//! Token counts are always measured on the raw chunk text, never on the
//! contextualized form.

use crate::error::ChunkingError;
use crate::tokenizer::TokenCounter;
use finrag_domain::{ConvertedDocument, ItemLabel};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// A bounded span of document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Raw chunk text
    pub text: String,

    /// Ancestor headings, outermost first
    pub headings: Vec<String>,

    /// Token count of `text`
    pub token_count: usize,

    /// A single indivisible unit that exceeds the budget on its own
    pub oversized: bool,
}

struct Candidate {
    text: String,
    headings: Vec<String>,
    atomic: bool,
}

/// Structure-aware chunker with a fixed tokenizer and budget
#[derive(Clone)]
pub struct HybridChunker {
    tokenizer: Arc<dyn TokenCounter>,
    max_tokens: usize,
    merge_peers: bool,
}

impl HybridChunker {
    /// Create a chunker; a zero budget is treated as one token
    pub fn new(tokenizer: Arc<dyn TokenCounter>, max_tokens: usize, merge_peers: bool) -> Self {
        Self {
            tokenizer,
            max_tokens: max_tokens.max(1),
            merge_peers,
        }
    }

    /// Token budget per chunk
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Tokenizer shared by this chunker
    pub fn tokenizer(&self) -> &Arc<dyn TokenCounter> {
        &self.tokenizer
    }

    /// Split a document into ordered chunks
    pub fn chunk(&self, document: &ConvertedDocument) -> Result<Vec<Chunk>, ChunkingError> {
        document.validate().map_err(ChunkingError::MalformedDocument)?;

        let candidates = self.hierarchical(document);
        let mut chunks = Vec::new();
        for candidate in candidates {
            self.split(candidate, &mut chunks);
        }

        if self.merge_peers {
            chunks = self.merge(chunks);
        }
        Ok(chunks)
    }

    /// Chunk text prefixed with its heading ancestry
    pub fn contextualize(&self, chunk: &Chunk) -> String {
        if chunk.headings.is_empty() {
            return chunk.text.clone();
        }
        format!("{}\n{}", chunk.headings.join("\n"), chunk.text)
    }

    fn count(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    fn hierarchical(&self, document: &ConvertedDocument) -> Vec<Candidate> {
        // (depth, text); the title sits above every section level
        let mut path: Vec<(u8, String)> = Vec::new();
        let mut candidates = Vec::new();

        for item in &document.items {
            if item.label.is_heading() {
                let depth = if item.label == ItemLabel::Title { 0 } else { item.level };
                while path.last().is_some_and(|(d, _)| *d >= depth) {
                    path.pop();
                }
                path.push((depth, item.text.trim().to_string()));
                continue;
            }

            candidates.push(Candidate {
                text: item.text.trim().to_string(),
                headings: path.iter().map(|(_, text)| text.clone()).collect(),
                atomic: item.label.is_atomic(),
            });
        }

        if candidates.is_empty() {
            let headings: Vec<&str> = document
                .items
                .iter()
                .filter(|i| i.label.is_heading())
                .map(|i| i.text.trim())
                .collect();
            if !headings.is_empty() {
                candidates.push(Candidate {
                    text: headings.join("\n"),
                    headings: Vec::new(),
                    atomic: false,
                });
            }
        }

        candidates
    }

    fn split(&self, candidate: Candidate, out: &mut Vec<Chunk>) {
        let token_count = self.count(&candidate.text);
        if token_count <= self.max_tokens {
            out.push(Chunk {
                text: candidate.text,
                headings: candidate.headings,
                token_count,
                oversized: false,
            });
            return;
        }

        if candidate.atomic {
            out.push(Chunk {
                text: candidate.text,
                headings: candidate.headings,
                token_count,
                oversized: true,
            });
            return;
        }

        let sentences: Vec<&str> = candidate.text.split_sentence_bounds().collect();
        self.pack(&sentences, &candidate.headings, true, out);
    }

    /// Greedily pack pieces into chunks; `descend` allows a word-level split
    /// for pieces that are over budget on their own
    fn pack(&self, pieces: &[&str], headings: &[String], descend: bool, out: &mut Vec<Chunk>) {
        let mut current = String::new();

        for piece in pieces {
            let mut extended = current.clone();
            extended.push_str(piece);
            if self.count(extended.trim()) <= self.max_tokens {
                current = extended;
                continue;
            }

            self.flush(&mut current, headings, out);

            let piece_tokens = self.count(piece.trim());
            if piece_tokens <= self.max_tokens {
                current.push_str(piece);
            } else if descend {
                let words: Vec<&str> = piece.split_word_bounds().collect();
                self.pack(&words, headings, false, out);
            } else {
                out.push(Chunk {
                    text: piece.trim().to_string(),
                    headings: headings.to_vec(),
                    token_count: piece_tokens,
                    oversized: true,
                });
            }
        }

        self.flush(&mut current, headings, out);
    }

    fn flush(&self, current: &mut String, headings: &[String], out: &mut Vec<Chunk>) {
        let text = current.trim();
        if !text.is_empty() {
            out.push(Chunk {
                text: text.to_string(),
                headings: headings.to_vec(),
                token_count: self.count(text),
                oversized: false,
            });
        }
        current.clear();
    }

    fn merge(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if let Some(last) = merged.last_mut() {
                if !last.oversized && !chunk.oversized && last.headings == chunk.headings {
                    let joined = format!("{}\n{}", last.text, chunk.text);
                    let tokens = self.count(&joined);
                    if tokens <= self.max_tokens {
                        last.text = joined;
                        last.token_count = tokens;
                        continue;
                    }
                }
            }
            merged.push(chunk);
        }

        merged
    }
}

impl std::fmt::Debug for HybridChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridChunker")
            .field("tokenizer", &self.tokenizer.name())
            .field("max_tokens", &self.max_tokens)
            .field("merge_peers", &self.merge_peers)
            .finish()
    }
}
