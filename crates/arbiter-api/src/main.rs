//! # arbiter-api: Binary Entry Point
//!
//! Loads configuration from the environment (plus the optional YAML file
//! named by `ARBITER_CONFIG`), starts the SLA sweeper, and serves HTTP.

use std::sync::Arc;
use std::time::Duration;

use arbiter_api::config::{AppConfig, LogFormat};
use arbiter_api::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(?config, "configuration loaded");

    let port = config.port;
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    let state = AppState::new(config);
    let sweeper = arbiter_api::sweeper::spawn_sweeper(Arc::clone(&state.service), sweep_interval);

    let app = arbiter_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("arbiter API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;

    Ok(())
}
