//! # Game Catalog Proxy - Main Entry Point
//!
//! Loads configuration, installs logging and metrics, and serves until
//! SIGTERM or Ctrl+C.

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use game_catalog_proxy::core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use game_catalog_proxy::observability::{init_logging, install_recorder};
use game_catalog_proxy::{ProxyConfig, ProxyServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = ProxyConfig::load(&config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.observability.logging);

    info!("🚀 Starting game catalog proxy");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Cache backend: {:?}, single-flight: {}",
        config.cache.backend, config.cache.single_flight
    );

    let metrics = if config.observability.metrics_enabled {
        Some(install_recorder().context("Failed to install metrics recorder")?)
    } else {
        None
    };

    let server = match ProxyServer::new(config, metrics).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start proxy: {}", e);
            return Err(e.into());
        }
    };

    server.start(shutdown_signal()).await?;

    info!("✅ Catalog proxy shutdown complete");
    Ok(())
}

/// Resolves on SIGTERM or Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("📡 Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        _ = terminate => info!("📡 Received SIGTERM, initiating graceful shutdown..."),
    }
}
