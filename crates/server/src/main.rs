//! Qanun Server
//!
//! Main entry point for the qanun question-answering service over the
//! Egyptian Labor Law. Provides the HTTP server and the offline
//! corpus/index builder.

mod commands;
mod http;
mod state;

use clap::{Parser, Subcommand};
use commands::{BuildIndexCommand, ServeCommand};
use qanun_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Question answering over the Egyptian Labor Law
#[derive(Parser, Debug)]
#[command(name = "qanun")]
#[command(about = "Question answering over the Egyptian Labor Law", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "QANUN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP question-answering server
    Serve(ServeCommand),

    /// Build the corpus and vector index from a statute text file
    BuildIndex(BuildIndexCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration and apply CLI overrides
    let config = AppConfig::load(cli.config.as_deref())?;
    let config = config.with_overrides(cli.log_level, cli.no_color);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Qanun starting");
    tracing::debug!("Gateway: {}", config.gateway.base_url);
    tracing::debug!("Corpus: {:?}", config.retrieval.corpus_file);

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::BuildIndex(_) => "build-index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::BuildIndex(cmd) => cmd.execute(config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
