//! Remote gateway clients for the qanun pipeline.
//!
//! Three capabilities live behind one OpenAI-compatible inference host:
//! text embeddings, cross-encoder reranking and chat completion. Each is
//! exposed as a trait so the pipeline can be exercised against scripted
//! implementations in tests, with one HTTP implementation apiece.

pub mod client;
pub mod embedding;
pub mod generate;
pub mod rerank;
pub mod retry;
mod types;

// Re-export commonly used types
pub use client::GatewayClient;
pub use embedding::{Embedder, HttpEmbedder};
pub use generate::{Generator, HttpGenerator};
pub use rerank::{HttpReranker, RankedItem, Reranker};
pub use retry::with_retry;
