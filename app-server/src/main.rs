use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use docsearch_engine::{EngineConfig, SearchIndex};
use docsearch_server::{SearchHandler, router};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "docsearch-server",
    version,
    about = "Semantic search over a directory of text documents"
)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of documents to index.
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Embedding cache file.
    #[arg(long)]
    cache_path: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

impl Args {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => EngineConfig::default(),
        };

        let mut config = match &self.cache_path {
            Some(path) => config.with_cache_path(path),
            None => config,
        };
        if let Some(dir) = &self.docs_dir {
            config.corpus.path = dir.clone();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.engine_config()?;

    let provider = config
        .provider
        .build()
        .context("failed to construct embedding provider")?;
    info!(
        "Using embedding provider {} ({})",
        provider.name(),
        provider.model_id()
    );

    let index = SearchIndex::open(&config, provider).await.with_context(|| {
        format!(
            "failed to build index for {}",
            config.corpus.path.display()
        )
    })?;
    let handler = SearchHandler::new(index).with_default_top_k(config.search.default_top_k);

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("Listening on {}", args.bind);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
    }
}
