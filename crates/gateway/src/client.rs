//! Shared HTTP plumbing for the inference gateway.

use qanun_core::{AppError, AppResult, GatewayStage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Timeout for the lightweight reachability check.
const PING_TIMEOUT_SECS: u64 = 2;

/// HTTP client for one OpenAI-compatible inference host.
///
/// Owns the base URL, the bearer credential and a pooled `reqwest`
/// client. The per-capability clients wrap this and add their endpoint
/// path and wire types.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GatewayClient {
    /// Create a client for the given host and credential.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// POST a JSON body to `path` and decode a JSON response.
    ///
    /// Transport failures and non-success statuses map to
    /// `AppError::Gateway`; an undecodable success body maps to
    /// `AppError::GatewayMalformed`.
    pub(crate) async fn post_json<Req, Resp>(
        &self,
        stage: GatewayStage,
        path: &str,
        body: &Req,
    ) -> AppResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("Sending {} request to {}", stage, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Gateway {
                stage,
                status: None,
                detail: format!("Failed to send request to {}: {}", url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Gateway {
                stage,
                status: Some(status.as_u16()),
                detail: format!("Gateway API error ({}): {}", status, error_text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GatewayMalformed {
                stage,
                detail: format!("Failed to decode response body: {}", e),
            })
    }

    /// Probe the gateway with a cheap GET so `/health` can report
    /// reachability without spending tokens.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);

        let result = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(PING_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!("Gateway reachability check returned status {}", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("Gateway reachability check failed: {}", e);
                false
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
