//! Wire types for the OpenAI-compatible inference endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingsRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

/// Response body for `/v1/embeddings`.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    pub data: Vec<EmbeddingRow>,
}

/// One embedding vector, in input order.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingRow {
    pub embedding: Vec<f32>,
}

/// Request body for `/v1/rerank`.
#[derive(Debug, Serialize)]
pub(crate) struct RerankRequest<'a> {
    pub model: &'a str,
    pub query: &'a str,
    pub documents: &'a [String],
    pub top_n: usize,
}

/// Response body for `/v1/rerank`.
#[derive(Debug, Deserialize)]
pub(crate) struct RerankResponse {
    pub results: Vec<RerankRow>,
}

/// One rerank result referring back into the submitted document order.
#[derive(Debug, Deserialize)]
pub(crate) struct RerankRow {
    pub index: usize,
    pub relevance_score: f32,
}

/// Request body for `/v1/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
}

/// One chat message in a completion request.
#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Response body for `/v1/chat/completions`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    pub content: String,
}
