//! GraphScribe server binary

use anyhow::Context;
use clap::Parser;
use graphscribe_server::{config::ServerConfig, init_tracing, start_server};
use std::path::PathBuf;
use tracing::warn;

/// Prompt template management and LLM graph extraction over HTTP
#[derive(Debug, Parser)]
#[command(name = "graphscribe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "GRAPHSCRIBE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            warn!("No config file given, using defaults and environment overrides");
            ServerConfig::from_env()?
        }
    };

    start_server(config).await?;
    Ok(())
}
