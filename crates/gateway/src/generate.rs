//! Answer generation gateway client.

use crate::client::GatewayClient;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use async_trait::async_trait;
use qanun_core::{AppError, AppResult, GatewayStage};

/// Sampling temperature for answer generation. Kept near zero so the
/// same context yields the same answer.
const GENERATION_TEMPERATURE: f32 = 0.002;

/// Produces an answer from a system prompt and a user prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> AppResult<String>;
}

/// `Generator` backed by the remote `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    gateway: GatewayClient,
    model: String,
}

impl HttpGenerator {
    pub fn new(gateway: GatewayClient, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, system: &str, user: &str) -> AppResult<String> {
        tracing::debug!("Requesting generation ({} prompt chars)", user.chars().count());

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: GENERATION_TEMPERATURE,
        };

        let response: ChatResponse = self
            .gateway
            .post_json(GatewayStage::Generation, "/v1/chat/completions", &request)
            .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::GatewayMalformed {
                stage: GatewayStage::Generation,
                detail: "Chat response contained no choices".to_string(),
            })?;

        Ok(choice.message.content)
    }
}
