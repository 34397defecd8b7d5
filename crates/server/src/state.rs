//! Shared server state.

use qanun_core::{config::AppConfig, AppResult};
use qanun_gateway::{GatewayClient, HttpEmbedder, HttpGenerator, HttpReranker};
use qanun_retrieval::{Pipeline, PipelineOptions, SearchState};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

/// Everything the HTTP handlers share: the pipeline, the swappable
/// corpus/index snapshot and the admission semaphore.
pub struct ServeState {
    pub config: AppConfig,
    search: RwLock<Arc<SearchState>>,
    pub pipeline: Pipeline,
    pub gateway: GatewayClient,
    pub ask_permits: Semaphore,
}

impl ServeState {
    /// Loads the artifacts and wires the gateway clients. Missing or
    /// stale artifacts fail here, before the server binds.
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        let search = SearchState::load(
            &config.retrieval.corpus_file,
            &config.retrieval.index_file,
        )?;
        tracing::info!(
            "Loaded {} chunks with {}-dimensional vectors",
            search.corpus.len(),
            search.index.dim()
        );
        if search.index.dim() != config.retrieval.embedding_dim {
            tracing::warn!(
                "Configured embedding_dim {} differs from the index dimension {}, using the index value",
                config.retrieval.embedding_dim,
                search.index.dim()
            );
        }

        let api_key = config.resolve_api_key()?;
        let gateway = GatewayClient::new(&config.gateway.base_url, api_key)?;
        let pipeline = Pipeline::new(
            Arc::new(HttpEmbedder::new(
                gateway.clone(),
                config.gateway.embedding_model.clone(),
            )),
            Arc::new(HttpReranker::new(
                gateway.clone(),
                config.gateway.rerank_model.clone(),
            )),
            Arc::new(HttpGenerator::new(
                gateway.clone(),
                config.gateway.generation_model.clone(),
            )),
            PipelineOptions::from_config(&config),
        );

        Ok(Self {
            ask_permits: Semaphore::new(config.server.max_concurrent_requests),
            search: RwLock::new(Arc::new(search)),
            pipeline,
            gateway,
            config,
        })
    }

    /// The current corpus/index snapshot. A request keeps the snapshot
    /// it started with even if a reload swaps the state mid-flight.
    pub async fn snapshot(&self) -> Arc<SearchState> {
        self.search.read().await.clone()
    }

    /// Reloads corpus and index from disk and swaps them in. On
    /// failure the current snapshot stays active.
    pub async fn reload(&self) -> AppResult<()> {
        let fresh = SearchState::load(
            &self.config.retrieval.corpus_file,
            &self.config.retrieval.index_file,
        )?;
        tracing::info!("Reloaded corpus and index ({} chunks)", fresh.corpus.len());
        *self.search.write().await = Arc::new(fresh);
        Ok(())
    }
}
