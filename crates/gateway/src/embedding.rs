//! Embedding gateway client.

use crate::client::GatewayClient;
use crate::types::{EmbeddingsRequest, EmbeddingsResponse};
use async_trait::async_trait;
use qanun_core::{AppError, AppResult, GatewayStage};

/// Turns text into fixed-width embedding vectors.
///
/// The batch form serves the offline index builder; the single form
/// serves query-time embedding. Output order matches input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single text (convenience wrapper).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| AppError::GatewayMalformed {
            stage: GatewayStage::Embedding,
            detail: "Embeddings response contained no vectors".to_string(),
        })
    }
}

/// `Embedder` backed by the remote `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    gateway: GatewayClient,
    model: String,
}

impl HttpEmbedder {
    pub fn new(gateway: GatewayClient, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Embedding batch of {} texts", texts.len());

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response: EmbeddingsResponse = self
            .gateway
            .post_json(GatewayStage::Embedding, "/v1/embeddings", &request)
            .await?;

        if response.data.len() != texts.len() {
            return Err(AppError::GatewayMalformed {
                stage: GatewayStage::Embedding,
                detail: format!(
                    "Expected {} embeddings, gateway returned {}",
                    texts.len(),
                    response.data.len()
                ),
            });
        }

        Ok(response.data.into_iter().map(|row| row.embedding).collect())
    }
}
