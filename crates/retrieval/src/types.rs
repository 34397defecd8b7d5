//! Shared retrieval data types.

use serde::{Deserialize, Serialize};

/// One statute chunk: an article (or the definitions preamble) with its
/// article reference and full text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, assigned at build time.
    pub id: String,
    /// Article number as written in the statute, `"0"` for the preamble.
    pub article_ref: String,
    pub text: String,
}

/// A similarity-search hit, before reranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalCandidate {
    /// Position of the chunk in the corpus.
    pub position: usize,
    /// Cosine similarity against the query embedding.
    pub score: f32,
}

/// A rerank hit, mapped back to a corpus position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    pub position: usize,
    pub relevance_score: f32,
}

/// One chunk admitted into the generation context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub chunk_id: String,
    pub article_ref: String,
    pub text: String,
}

/// The context block handed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Entries in statute order (ascending article reference).
    pub entries: Vec<ContextEntry>,
    /// Character count across all entries.
    pub total_chars: usize,
    /// True when an entry had to be cut to fit the budget.
    pub truncated: bool,
}

/// A parsed generator reply.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Answer {
    pub text: String,
    pub related_questions: Vec<String>,
}
