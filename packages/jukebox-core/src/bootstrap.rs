//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root, the single place where the
//! registry, the node event bridge and the event system are instantiated
//! and wired to the caller's collaborators.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{JukeboxError, JukeboxResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::node::{AudioNode, MetadataResolver, NodeEvent, VoiceGateway};
use crate::runtime::TokioSpawner;
use crate::services::{NodeEventProcessor, SessionDeps, SessionRegistry};
use crate::state::Config;

/// The external systems the core drives.
#[derive(Clone)]
pub struct Collaborators {
    pub node: Arc<dyn AudioNode>,
    pub gateway: Arc<dyn VoiceGateway>,
    pub resolver: Arc<dyn MetadataResolver>,
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Owns every room's playback session.
    pub registry: Arc<SessionRegistry>,
    /// Routes node events to sessions.
    pub node_events: Arc<NodeEventProcessor>,
    /// Event bridge for WebSocket clients.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background work.
    pub spawner: TokioSpawner,
    /// Cancelled on shutdown. Stops the node event forwarder, WebSocket
    /// connections and the HTTP server.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the node event forwarder.
    pub fn start_background_tasks(&self) {
        self.node_events.start_event_forwarder();
        log::info!("[Bootstrap] Background tasks started");
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();

        let destroyed = self.registry.destroy_all().await;
        log::info!("[Bootstrap] Destroyed {} session(s)", destroyed);

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the channel the audio node reports its events on.
pub fn node_event_channel(config: &Config) -> (mpsc::Sender<NodeEvent>, mpsc::Receiver<NodeEvent>) {
    mpsc::channel(config.node_event_channel_capacity)
}

/// Bootstraps all services with their dependencies.
///
/// Services are created in dependency order:
///
/// 1. Event bridge (broadcast channel for WebSocket clients)
/// 2. Session registry (depends on collaborators and the bridge)
/// 3. Node event processor (depends on the registry and the node's event feed)
///
/// # Arguments
/// * `config` - Core configuration, validated here
/// * `collaborators` - Audio node, voice gateway and resolver implementations
/// * `node_events_rx` - Receiving end of the audio node's event feed
///
/// # Errors
///
/// Returns [`JukeboxError::Configuration`] if `config` is invalid.
pub fn bootstrap_services(
    config: &Config,
    collaborators: Collaborators,
    node_events_rx: mpsc::Receiver<NodeEvent>,
) -> JukeboxResult<BootstrappedServices> {
    config.validate().map_err(JukeboxError::Configuration)?;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));

    let deps = SessionDeps {
        node: collaborators.node,
        resolver: collaborators.resolver,
        emitter: Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
    };
    let registry = Arc::new(SessionRegistry::new(
        collaborators.gateway,
        deps,
        config,
        spawner.clone(),
    ));

    let node_events = Arc::new(NodeEventProcessor::new(
        Arc::clone(&registry),
        node_events_rx,
        cancel_token.clone(),
        spawner.clone(),
    ));

    log::info!("[Bootstrap] Services wired");

    Ok(BootstrappedServices {
        registry,
        node_events,
        event_bridge,
        spawner,
        cancel_token,
    })
}
