//! Qanun Retrieval Library
//!
//! Corpus storage, vector search, context assembly, and the
//! question-answering pipeline over the Egyptian Labor Law, plus the
//! offline builder that turns raw statute text into the searchable
//! artifact pair.

pub mod answer;
pub mod assemble;
pub mod builder;
pub mod corpus;
pub mod index;
pub mod language;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod tests;

pub use assemble::ContextAssembler;
pub use builder::{build_artifacts, chunk_statute, write_artifacts, ChunkSeed};
pub use corpus::Corpus;
pub use index::{verify_sync, VectorIndex};
pub use language::QueryLanguage;
pub use pipeline::{AskOutcome, Pipeline, PipelineOptions, PipelineStage, SearchState};
pub use types::{
    Answer, AssembledContext, Chunk, ContextEntry, RankedCandidate, RetrievalCandidate,
};
