//! Jukebox Server - Standalone headless server for Jukebox.
//!
//! Runs the playback core against the in-process simulated audio node and a
//! YAML catalog, exposing the HTTP/WebSocket control surface. Useful for
//! development, demos and as a reference wiring for embedders.

mod catalog;
mod config;
mod gateway;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use jukebox_core::{
    bootstrap_services, node_event_channel, start_server, AppState, Collaborators,
    LoggingEventEmitter, SimulatedNode,
};
use parking_lot::RwLock;
use tokio::signal;

use crate::catalog::{Catalog, CatalogResolver};
use crate::config::ServerConfig;
use crate::gateway::LoggingVoiceGateway;

/// How long open connections get to finish after shutdown starts.
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Jukebox Server - Headless per-room audio queue server.
#[derive(Parser, Debug)]
#[command(name = "jukebox-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "JUKEBOX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "JUKEBOX_BIND_PORT")]
    port: Option<u16>,

    /// Track catalog (overrides config file).
    #[arg(long, value_name = "FILE", env = "JUKEBOX_CATALOG")]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Jukebox Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(catalog) = args.catalog {
        config.catalog = Some(catalog);
    }

    log::info!(
        "Configuration: bind_port={}, default_volume={}",
        config.bind_port,
        config.default_volume
    );

    let catalog = match &config.catalog {
        Some(path) => Catalog::load(path)?,
        None => {
            log::warn!("No catalog configured - every query will find no matches");
            Catalog::default()
        }
    };

    let core_config = config.to_core_config();
    let (node_tx, node_rx) = node_event_channel(&core_config);
    let collaborators = Collaborators {
        node: Arc::new(SimulatedNode::new(node_tx)),
        gateway: Arc::new(LoggingVoiceGateway::default()),
        resolver: Arc::new(CatalogResolver::new(catalog)),
    };

    let services = bootstrap_services(&core_config, collaborators, node_rx)
        .context("Failed to bootstrap services")?;
    services
        .event_bridge
        .set_external_emitter(Arc::new(LoggingEventEmitter));

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    let app_state = AppState::new(&services, Arc::new(RwLock::new(core_config)));

    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown: cancels the server and leaves every voice channel
    services.shutdown().await;

    if tokio::time::timeout(SERVER_DRAIN_TIMEOUT, &mut server_handle)
        .await
        .is_err()
    {
        log::warn!("Server did not drain within {:?}, aborting", SERVER_DRAIN_TIMEOUT);
        server_handle.abort();
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
