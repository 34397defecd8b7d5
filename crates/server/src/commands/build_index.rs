//! Build-index command handler.
//!
//! Splits a statute text file into article chunks, embeds them through
//! the gateway and writes the corpus/index pair.

use clap::Args;
use qanun_core::{config::AppConfig, AppError, AppResult};
use qanun_gateway::{GatewayClient, HttpEmbedder};
use qanun_retrieval::{build_artifacts, chunk_statute, write_artifacts};
use std::path::PathBuf;

/// Build the corpus and vector index from a statute text file
#[derive(Args, Debug)]
pub struct BuildIndexCommand {
    /// Statute text file (UTF-8)
    #[arg(short, long)]
    pub source: PathBuf,

    /// Corpus file to write (overrides the config file)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Index file to write (overrides the config file)
    #[arg(long)]
    pub index: Option<PathBuf>,
}

impl BuildIndexCommand {
    /// Execute the build-index command.
    pub async fn execute(self, mut config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing build-index command");

        if let Some(corpus) = self.corpus {
            config.retrieval.corpus_file = corpus;
        }
        if let Some(index) = self.index {
            config.retrieval.index_file = index;
        }
        config.validate()?;

        let text = std::fs::read_to_string(&self.source).map_err(|e| {
            AppError::Config(format!(
                "Failed to read statute file {:?}: {}",
                self.source, e
            ))
        })?;

        let seeds = chunk_statute(&text)?;
        tracing::info!("Split the statute into {} chunks", seeds.len());

        let api_key = config.resolve_api_key()?;
        let gateway = GatewayClient::new(&config.gateway.base_url, api_key)?;
        let embedder = HttpEmbedder::new(gateway, config.gateway.embedding_model.clone());

        let dim = config.retrieval.embedding_dim;
        let (corpus, index) = build_artifacts(&seeds, &embedder, dim).await?;
        write_artifacts(
            &corpus,
            &index,
            &config.retrieval.corpus_file,
            &config.retrieval.index_file,
        )?;

        println!(
            "Indexed {} chunks ({} dims) into {:?} and {:?}",
            corpus.len(),
            dim,
            config.retrieval.corpus_file,
            config.retrieval.index_file
        );
        Ok(())
    }
}
