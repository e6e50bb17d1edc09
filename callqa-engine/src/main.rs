//! callqa-engine - Call Audit Analysis Service
//!
//! Derives compliance scorecards, event timelines, and diarized
//! transcripts from raw call-audit records posted by collaborators.

use anyhow::Result;
use callqa_common::config::resolve_config;
use callqa_engine::services::{OverrideClient, ScoreSyncClient};
use callqa_engine::sync::ScoreSyncScheduler;
use callqa_engine::AppState;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "callqa-engine", about = "Call audit analysis service")]
struct Args {
    /// Path to a TOML config file (overrides CALLQA_CONFIG and the
    /// working-directory default)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind port override
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!("Starting callqa-engine (Call Audit Analysis)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let sync = match &config.score_sync_base_url {
        Some(base_url) => {
            let client = ScoreSyncClient::new(base_url.clone())
                .map_err(|e| anyhow::anyhow!("score sync client init failed: {e}"))?;
            info!(base_url = %base_url, "score sync collaborator configured");
            Some(Arc::new(ScoreSyncScheduler::new(
                Arc::new(client),
                config.params.sync_debounce_ms,
                config.params.sync_tolerance,
            )))
        }
        None => {
            info!("no score sync collaborator configured, score drift stays local");
            None
        }
    };

    let override_api = match &config.override_api_base_url {
        Some(base_url) => {
            let client = OverrideClient::new(base_url.clone())
                .map_err(|e| anyhow::anyhow!("override client init failed: {e}"))?;
            info!(base_url = %base_url, "override collaborator configured");
            Some(Arc::new(client))
        }
        None => None,
    };

    let state = AppState::new(config.params.clone(), sync.clone(), override_api);
    let app = callqa_engine::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app).await?;

    // Guarantee no stale score write survives the service itself
    if let Some(scheduler) = sync {
        scheduler.shutdown();
    }

    Ok(())
}
