//! NodeGuard Support Dashboard
//!
//! Single-page console for blockchain support engineers:
//! - Issue analysis through a chat-completion model (summary, steps, bug report, fix script)
//! - On-demand JSON-RPC endpoint status with latency

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nodeguard_core::{EndpointProbe, OpenAiClient};

mod config;
mod console;

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    let (config, config_source) = config::load_config()?;
    init_logging(&config.logging.level)?;

    info!("NodeGuard dashboard v{} starting...", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Configuration loaded from {path}"),
        None => warn!("Config file not found, using defaults"),
    }
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    if config.openai.api_key.trim().is_empty() {
        warn!("OPENAI_API_KEY not set, the key must be entered in the dashboard");
    } else {
        info!("OpenAI API key loaded, model={}", config.openai.model);
    }
    if config.rpc.is_configured() {
        info!("RPC endpoint configured");
    } else {
        info!("RPC URL not configured");
    }

    let state = Arc::new(console::AppState {
        client: OpenAiClient::with_options(
            config.openai.api_key.clone(),
            config.openai.base_url.clone(),
            config.openai.model.clone(),
            config.openai.temperature,
            config.openai.timeout(),
        ),
        probe: EndpointProbe::new(),
        rpc_url: config.rpc.url.clone(),
        max_log_chars: config.analysis.max_log_chars,
    });

    console::start_console_server(state, &config.server.bind)
        .await
        .context("Support console server failed")?;

    Ok(())
}
