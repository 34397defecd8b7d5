//! Rerank gateway client.

use crate::client::GatewayClient;
use crate::types::{RerankRequest, RerankResponse};
use async_trait::async_trait;
use qanun_core::{AppError, AppResult, GatewayStage};

/// One scored document from a rerank call.
///
/// `index` points into the document list that was sent, not into the
/// corpus. Callers translate it back to their own positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedItem {
    pub index: usize,
    pub relevance_score: f32,
}

/// Scores documents against a query and keeps the best `top_n`.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedItem>>;
}

/// `Reranker` backed by the remote `/v1/rerank` endpoint.
#[derive(Debug, Clone)]
pub struct HttpReranker {
    gateway: GatewayClient,
    model: String,
}

impl HttpReranker {
    pub fn new(gateway: GatewayClient, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RankedItem>> {
        if documents.is_empty() || top_n == 0 {
            return Ok(vec![]);
        }

        tracing::debug!("Reranking {} documents, keeping {}", documents.len(), top_n);

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let response: RerankResponse = self
            .gateway
            .post_json(GatewayStage::Rerank, "/v1/rerank", &request)
            .await?;

        let mut items = Vec::with_capacity(response.results.len());
        for row in response.results {
            if row.index >= documents.len() {
                return Err(AppError::GatewayMalformed {
                    stage: GatewayStage::Rerank,
                    detail: format!(
                        "Result index {} out of range for {} documents",
                        row.index,
                        documents.len()
                    ),
                });
            }
            items.push(RankedItem {
                index: row.index,
                relevance_score: row.relevance_score,
            });
        }

        // Sort by score descending; stable sort keeps gateway order for ties.
        items.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items.truncate(top_n);

        Ok(items)
    }
}
