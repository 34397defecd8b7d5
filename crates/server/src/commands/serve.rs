//! Serve command handler.
//!
//! Loads the corpus and index, wires the gateway clients and runs the
//! HTTP server until shutdown.

use crate::http;
use crate::state::ServeState;
use clap::Args;
use qanun_core::{config::AppConfig, AppResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Run the HTTP question-answering server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Corpus file to serve from
    #[arg(long, env = "QANUN_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Index file to serve from
    #[arg(long, env = "QANUN_INDEX")]
    pub index: Option<PathBuf>,
}

impl ServeCommand {
    /// Execute the serve command.
    pub async fn execute(self, mut config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(corpus) = self.corpus {
            config.retrieval.corpus_file = corpus;
        }
        if let Some(index) = self.index {
            config.retrieval.index_file = index;
        }
        config.validate()?;

        // Missing or stale artifacts fail here, before the bind.
        let state = Arc::new(ServeState::initialize(config)?);
        http::serve(state).await
    }
}
