//! sembedd - embedding HTTP service with a bounded inference gate.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sembed_config::Config;
use sembed_core::InferenceGate;
use sembed_server::{AppState, Server};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sembedd", version)]
#[command(about = "Serve sentence embeddings behind an API key and a concurrency limit", long_about = None)]
struct Cli {
    #[arg(short, long, help = "Path to a config file (default: user config dir)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Address to bind (overrides server.bind_address)")]
    bind: Option<String>,

    #[arg(short, long, help = "Port to listen on (overrides server.port)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting up. Loading configuration...");
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let addr = config.server.socket_addr()?;

    if config.api_key().is_none() {
        tracing::warn!(
            "{} is not set; every request will be rejected",
            sembed_config::API_KEY_ENV
        );
    }

    let model_config = config.model.clone();
    let embedder = tokio::task::spawn_blocking(move || {
        sembed_embeddings::create_embedder(&model_config)
    })
    .await
    .context("Model loading task failed")?
    .with_context(|| format!("Failed to load model '{}'", config.model.name))?;

    let gate = InferenceGate::new(
        embedder,
        config.gate.max_concurrent_inferences,
        config.gate.acquire_timeout(),
    );
    let state = AppState::new(gate, config.api_key())
        .with_exposed_errors(config.server.expose_inference_errors);

    let server = Arc::new(Server::new(addr, state));
    let listener = server.bind().await?;

    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                server.shutdown();
            }
        });
    }

    server.serve(listener).await?;
    tracing::info!("Server stopped");
    Ok(())
}
