//! HTTP/WebSocket API layer.
//!
//! Thin handlers that translate requests into registry and session calls.
//! Provides router construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use parking_lot::RwLock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::BootstrappedServices;
use crate::constants::SERVER_PORT_RANGE;
use crate::events::BroadcastEventBridge;
use crate::services::{NodeEventProcessor, SessionRegistry};
use crate::state::Config;

pub mod http;
pub mod response;
pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// Holds references to services only; all behavior lives in the services.
#[derive(Clone)]
pub struct AppState {
    /// Owns the per-room playback sessions.
    pub registry: Arc<SessionRegistry>,
    /// Routes node events pushed over HTTP.
    pub node_events: Arc<NodeEventProcessor>,
    /// Event bridge feeding WebSocket clients.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Application configuration.
    pub config: Arc<RwLock<Config>>,
    /// Cancelled on shutdown; closes WebSocket connections and stops the server.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices, config: Arc<RwLock<Config>>) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            node_events: Arc::clone(&services.node_events),
            event_bridge: Arc::clone(&services.event_bridge),
            config,
            shutdown: services.cancel_token.clone(),
        }
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

fn cors_layer(trusted_origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let origin = origin.to_str().unwrap_or("");
            trusted_origins
                .iter()
                .any(|allowed| origin.starts_with(allowed.as_str()))
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(false)
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let (preferred_port, trusted_origins) = {
        let config = state.config.read();
        (config.preferred_port, config.trusted_origins.clone())
    };
    let (port, listener) = if preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        let (start, end) = SERVER_PORT_RANGE;
        find_available_port(start, end).await?
    };

    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    log::debug!("[Server] CORS trusted origins: {:?}", trusted_origins);

    let shutdown = state.shutdown.clone();
    let app = http::create_router(state)
        .layer(cors_layer(trusted_origins))
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    log::info!("[Server] Stopped");
    Ok(())
}
