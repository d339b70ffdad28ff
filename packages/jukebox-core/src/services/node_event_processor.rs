//! Node event processing service.
//!
//! Responsibilities:
//! - Receiving the audio node's per-room event feed
//! - Routing each event to the room's live session
//! - Dropping events for rooms that no longer have a session
//!
//! No classification happens here; the session decides what an event means.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::session_registry::SessionRegistry;
use crate::node::NodeEvent;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Forwards node events to the matching [`PlaybackSession`](super::PlaybackSession).
pub struct NodeEventProcessor {
    registry: Arc<SessionRegistry>,
    node_event_rx: Arc<Mutex<Option<mpsc::Receiver<NodeEvent>>>>,
    spawner: TokioSpawner,
    cancel_token: CancellationToken,
}

impl NodeEventProcessor {
    /// The forwarder runs until `cancel_token` is cancelled or the node
    /// drops its sender.
    pub fn new(
        registry: Arc<SessionRegistry>,
        node_event_rx: mpsc::Receiver<NodeEvent>,
        cancel_token: CancellationToken,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            registry,
            node_event_rx: Arc::new(Mutex::new(Some(node_event_rx))),
            spawner,
            cancel_token,
        }
    }

    /// Handles one event pushed through the HTTP API.
    ///
    /// Returns `true` if a session received it.
    pub fn handle_event(&self, event: &NodeEvent) -> bool {
        Self::dispatch(&self.registry, event)
    }

    fn dispatch(registry: &SessionRegistry, event: &NodeEvent) -> bool {
        match registry.get(&event.room_id) {
            Some(session) => {
                log::debug!(
                    "[NodeEvents] {:?} for track {:?} in room {}",
                    event.kind,
                    event.track,
                    event.room_id
                );
                session.handle_node_event(event);
                true
            }
            None => {
                log::debug!(
                    "[NodeEvents] Dropping {:?} for room {} with no session",
                    event.kind,
                    event.room_id
                );
                false
            }
        }
    }

    /// Spawns the task that drains the node event channel.
    ///
    /// Only the first call takes the receiver; later calls do nothing.
    pub fn start_event_forwarder(&self) {
        let registry = Arc::clone(&self.registry);
        let node_event_rx = self.node_event_rx.clone();
        let cancel = self.cancel_token.clone();

        self.spawner.spawn(async move {
            let rx = node_event_rx.lock().take();
            let Some(mut rx) = rx else {
                log::warn!("[NodeEvents] Event forwarder already running");
                return;
            };
            log::debug!("[NodeEvents] Event forwarder started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => {
                            Self::dispatch(&registry, &event);
                        }
                        None => break,
                    },
                }
            }
            log::debug!("[NodeEvents] Event forwarder stopped");
        });
    }
}
