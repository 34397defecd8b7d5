//! Configuration management for the qanun service.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults (mirroring the deployed system)
//! - A YAML config file (`qanun.yaml` or `--config`/`QANUN_CONFIG`)
//! - Environment variables
//! - Command-line flags, applied last through `with_overrides`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Inference gateway settings
    pub gateway: GatewayConfig,

    /// Corpus, index and pipeline tunables
    pub retrieval: RetrievalConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Questions answered concurrently before new ones queue
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_concurrent_requests: 8,
        }
    }
}

/// Inference gateway settings.
///
/// All three capabilities (embeddings, rerank, generation) live behind
/// one OpenAI-compatible host reached with a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the inference host
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Rerank model identifier
    pub rerank_model: String,

    /// Generation model identifier
    pub generation_model: String,

    /// Embedding stage timeout in seconds
    pub embedding_timeout_secs: u64,

    /// Rerank stage timeout in seconds
    pub rerank_timeout_secs: u64,

    /// Generation stage timeout in seconds
    pub generation_timeout_secs: u64,

    /// Extra attempts after a failed gateway call
    pub retries: u32,

    /// Sleep between attempts in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://inference.meganova.ai".to_string(),
            api_key_env: "MEGANOVA_API_KEY".to_string(),
            embedding_model: "Qwen/Qwen3-Embedding-8B".to_string(),
            rerank_model: "BAAI/bge-reranker-v2-m3".to_string(),
            generation_model: "deepseek-ai/DeepSeek-V3-0324-Free".to_string(),
            embedding_timeout_secs: 10,
            rerank_timeout_secs: 10,
            generation_timeout_secs: 30,
            retries: 1,
            retry_backoff_ms: 500,
        }
    }
}

impl GatewayConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn rerank_timeout(&self) -> Duration {
        Duration::from_secs(self.rerank_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Corpus, index and pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Corpus file (JSON list of chunks)
    pub corpus_file: PathBuf,

    /// Index file (binary vector index)
    pub index_file: PathBuf,

    /// Candidates fetched from the index per query
    pub search_breadth: usize,

    /// Candidates kept after reranking
    pub rerank_breadth: usize,

    /// Context budget in characters
    pub context_budget_chars: usize,

    /// Embedding dimensionality used at index build time
    pub embedding_dim: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus_file: PathBuf::from("data/chunks.json"),
            index_file: PathBuf::from("data/index.qvec"),
            search_breadth: 50,
            rerank_breadth: 5,
            context_budget_chars: 12_000,
            embedding_dim: 4096,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment
    /// variables, in that order.
    ///
    /// The file path is the `--config` flag when given, else
    /// `QANUN_CONFIG`, else `qanun.yaml` in the working directory when
    /// that file exists.
    ///
    /// Environment variables:
    /// - `QANUN_CONFIG`: path to the config file
    /// - `QANUN_GATEWAY_URL`: override the gateway base URL
    /// - `QANUN_API_KEY`: API key (bypasses `api_key_env`)
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let explicit = config_file
            .map(PathBuf::from)
            .or_else(|| std::env::var("QANUN_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_yaml(&path)?,
            None => {
                let default_path = PathBuf::from("qanun.yaml");
                if default_path.exists() {
                    Self::from_yaml(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        // Environment variables override the file
        if let Ok(url) = std::env::var("QANUN_GATEWAY_URL") {
            config.gateway.base_url = url;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Parse a YAML config file. Missing fields fall back to defaults.
    fn from_yaml(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over both the file and the environment.
    pub fn with_overrides(mut self, log_level: Option<String>, no_color: bool) -> Self {
        if let Some(level) = log_level {
            self.log_level = Some(level);
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve the gateway API key.
    ///
    /// `QANUN_API_KEY` wins when set; otherwise the environment variable
    /// named by `gateway.api_key_env` must hold the key.
    pub fn resolve_api_key(&self) -> AppResult<String> {
        if let Ok(key) = std::env::var("QANUN_API_KEY") {
            return Ok(key);
        }

        std::env::var(&self.gateway.api_key_env).map_err(|_| {
            AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.gateway.api_key_env
            ))
        })
    }

    /// Validate tunables before serving or building.
    pub fn validate(&self) -> AppResult<()> {
        if self.gateway.base_url.is_empty() {
            return Err(AppError::Config(
                "Gateway base URL must not be empty".to_string(),
            ));
        }

        if self.retrieval.search_breadth == 0 {
            return Err(AppError::Config(
                "search_breadth must be positive".to_string(),
            ));
        }

        if self.retrieval.rerank_breadth == 0
            || self.retrieval.rerank_breadth > self.retrieval.search_breadth
        {
            return Err(AppError::Config(format!(
                "rerank_breadth must be between 1 and search_breadth ({})",
                self.retrieval.search_breadth
            )));
        }

        if self.retrieval.context_budget_chars == 0 {
            return Err(AppError::Config(
                "context_budget_chars must be positive".to_string(),
            ));
        }

        if self.retrieval.embedding_dim == 0 {
            return Err(AppError::Config(
                "embedding_dim must be positive".to_string(),
            ));
        }

        if self.server.max_concurrent_requests == 0 {
            return Err(AppError::Config(
                "max_concurrent_requests must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
