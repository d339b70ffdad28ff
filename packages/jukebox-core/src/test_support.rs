//! Recording fakes of the collaborator traits for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::events::{EventEmitter, PlaybackEvent, QueueEvent, SessionEvent};
use crate::node::{
    AudioNode, GatewayError, GatewayResult, MetadataResolver, NodeError, NodeResult, Resolution,
    ResolveError, ResolveResult, VoiceGateway,
};
use crate::queue::QueueItem;

/// Builds an item whose title is `Song {id}` and stream ref is `stream-{id}`.
pub(crate) fn item(id: &str, secs: u64) -> QueueItem {
    QueueItem::new(
        format!("https://youtu.be/{id}"),
        "alice",
        id,
        format!("Song {id}"),
        "Artist",
        Duration::from_secs(secs),
        format!("stream-{id}"),
    )
}

/// Lets spawned tasks run until they block. Requires a paused clock.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeCall {
    Play(String),
    Stop,
    Pause(bool),
    Volume(u16),
    Destroy,
}

/// Audio node that records calls and never emits events on its own.
#[derive(Default)]
pub(crate) struct RecordingNode {
    calls: Mutex<Vec<NodeCall>>,
    play_ids: Mutex<Vec<u64>>,
    failing: Mutex<HashSet<String>>,
    stop_delay: Mutex<Duration>,
}

impl RecordingNode {
    pub(crate) const POSITION: Duration = Duration::from_secs(42);

    pub(crate) fn calls(&self) -> Vec<NodeCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn plays(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NodeCall::Play(stream_ref) => Some(stream_ref.clone()),
                _ => None,
            })
            .collect()
    }

    /// Play id passed with the most recent play request.
    pub(crate) fn last_play_id(&self) -> Option<u64> {
        self.play_ids.lock().last().copied()
    }

    /// Makes every stop request take `delay` before it returns.
    pub(crate) fn delay_stop(&self, delay: Duration) {
        *self.stop_delay.lock() = delay;
    }

    /// Makes every play of `stream_ref` fail.
    pub(crate) fn fail_play(&self, stream_ref: &str) {
        self.failing.lock().insert(stream_ref.to_string());
    }
}

#[async_trait]
impl AudioNode for RecordingNode {
    async fn play(&self, _room_id: &str, item: &QueueItem, play_id: u64) -> NodeResult<()> {
        self.calls.lock().push(NodeCall::Play(item.stream_ref.clone()));
        self.play_ids.lock().push(play_id);
        if self.failing.lock().contains(&item.stream_ref) {
            return Err(NodeError::Rejected(format!("cannot load {}", item.stream_ref)));
        }
        Ok(())
    }

    async fn stop(&self, _room_id: &str) -> NodeResult<()> {
        self.calls.lock().push(NodeCall::Stop);
        let delay = *self.stop_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn pause(&self, _room_id: &str, paused: bool) -> NodeResult<()> {
        self.calls.lock().push(NodeCall::Pause(paused));
        Ok(())
    }

    async fn set_volume(&self, _room_id: &str, volume: u16) -> NodeResult<()> {
        self.calls.lock().push(NodeCall::Volume(volume));
        Ok(())
    }

    async fn position(&self, _room_id: &str) -> NodeResult<Duration> {
        Ok(Self::POSITION)
    }

    async fn destroy(&self, _room_id: &str) -> NodeResult<()> {
        self.calls.lock().push(NodeCall::Destroy);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingGateway {
    joins: Mutex<Vec<(String, String)>>,
    leaves: Mutex<Vec<String>>,
    fail_joins: AtomicBool,
}

impl RecordingGateway {
    pub(crate) fn joins(&self) -> Vec<(String, String)> {
        self.joins.lock().clone()
    }

    pub(crate) fn leaves(&self) -> Vec<String> {
        self.leaves.lock().clone()
    }

    pub(crate) fn fail_joins(&self) {
        self.fail_joins.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceGateway for RecordingGateway {
    async fn join(&self, room_id: &str, voice_channel_id: &str) -> GatewayResult<()> {
        if self.fail_joins.load(Ordering::SeqCst) {
            return Err(GatewayError::Join {
                channel: voice_channel_id.to_string(),
                reason: "missing permissions".into(),
            });
        }
        self.joins
            .lock()
            .push((room_id.to_string(), voice_channel_id.to_string()));
        Ok(())
    }

    async fn leave(&self, room_id: &str) -> GatewayResult<()> {
        self.leaves.lock().push(room_id.to_string());
        Ok(())
    }
}

/// Resolver backed by a fixed query table. Unknown queries resolve to no match.
#[derive(Default)]
pub(crate) struct StaticResolver {
    results: Mutex<HashMap<String, Resolution>>,
}

impl StaticResolver {
    pub(crate) const FAILING_QUERY: &'static str = "broken";
    pub(crate) const HANGING_QUERY: &'static str = "hang";

    pub(crate) fn insert(&self, query: impl Into<String>, resolution: Resolution) {
        self.results.lock().insert(query.into(), resolution);
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve(&self, query: &str, _requester: &str) -> ResolveResult<Resolution> {
        match query {
            Self::FAILING_QUERY => Err(ResolveError::LoadFailed {
                query: query.to_string(),
                message: "source unavailable".into(),
            }),
            Self::HANGING_QUERY => std::future::pending().await,
            _ => Ok(self
                .results
                .lock()
                .get(query)
                .cloned()
                .unwrap_or(Resolution::NoMatches)),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingEmitter {
    session: Mutex<Vec<SessionEvent>>,
    queue: Mutex<Vec<QueueEvent>>,
    playback: Mutex<Vec<PlaybackEvent>>,
}

impl RecordingEmitter {
    pub(crate) fn session_events(&self) -> Vec<SessionEvent> {
        self.session.lock().clone()
    }

    pub(crate) fn queue_events(&self) -> Vec<QueueEvent> {
        self.queue.lock().clone()
    }

    pub(crate) fn playback_events(&self) -> Vec<PlaybackEvent> {
        self.playback.lock().clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit_session(&self, event: SessionEvent) {
        self.session.lock().push(event);
    }

    fn emit_queue(&self, event: QueueEvent) {
        self.queue.lock().push(event);
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        self.playback.lock().push(event);
    }
}
