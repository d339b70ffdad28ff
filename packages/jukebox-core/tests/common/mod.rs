//! Shared fixtures for the integration tests.
//!
//! Wires the core with the simulated node, a fixed-table resolver and a
//! gateway that records joins and leaves.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jukebox_core::events::BroadcastEvent;
use jukebox_core::node::{GatewayResult, ResolveResult};
use jukebox_core::{
    bootstrap_services, node_event_channel, BootstrappedServices, Collaborators, Config,
    MetadataResolver, QueueItem, Resolution, SimulatedNode, VoiceGateway,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

pub const ROOM: &str = "guild-1";
pub const VOICE: &str = "voice-1";
pub const TEXT: &str = "text-1";

pub fn track(id: &str, secs: u64) -> QueueItem {
    QueueItem::new(
        format!("https://youtu.be/{id}"),
        "placeholder",
        id,
        format!("Song {id}"),
        "Artist",
        Duration::from_secs(secs),
        format!("stream-{id}"),
    )
}

/// Resolves queries from a fixed table; anything else finds nothing.
#[derive(Default)]
pub struct TableResolver {
    entries: Mutex<HashMap<String, Resolution>>,
}

impl TableResolver {
    pub fn insert(&self, query: &str, resolution: Resolution) {
        self.entries.lock().insert(query.to_string(), resolution);
    }
}

#[async_trait]
impl MetadataResolver for TableResolver {
    async fn resolve(&self, query: &str, _requester: &str) -> ResolveResult<Resolution> {
        Ok(self
            .entries
            .lock()
            .get(query)
            .cloned()
            .unwrap_or(Resolution::NoMatches))
    }
}

#[derive(Default)]
pub struct TrackingGateway {
    pub joins: Mutex<Vec<String>>,
    pub leaves: Mutex<Vec<String>>,
}

#[async_trait]
impl VoiceGateway for TrackingGateway {
    async fn join(&self, _room_id: &str, voice_channel_id: &str) -> GatewayResult<()> {
        self.joins.lock().push(voice_channel_id.to_string());
        Ok(())
    }

    async fn leave(&self, room_id: &str) -> GatewayResult<()> {
        self.leaves.lock().push(room_id.to_string());
        Ok(())
    }
}

pub struct Fixture {
    pub services: BootstrappedServices,
    pub node: Arc<SimulatedNode>,
    pub resolver: Arc<TableResolver>,
    pub gateway: Arc<TrackingGateway>,
    pub events: broadcast::Receiver<BroadcastEvent>,
}

impl Fixture {
    pub fn new() -> Self {
        let config = Config::default();
        let (tx, rx) = node_event_channel(&config);
        let node = Arc::new(SimulatedNode::new(tx));
        let resolver = Arc::new(TableResolver::default());
        let gateway = Arc::new(TrackingGateway::default());

        let services = bootstrap_services(
            &config,
            Collaborators {
                node: node.clone(),
                gateway: gateway.clone(),
                resolver: resolver.clone(),
            },
            rx,
        )
        .unwrap();
        services.start_background_tasks();
        let events = services.event_bridge.subscribe();

        Self {
            services,
            node,
            resolver,
            gateway,
            events,
        }
    }

    /// Drains every event broadcast so far.
    pub fn drain_events(&mut self) -> Vec<BroadcastEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Lets spawned tasks run until they block. Requires a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
