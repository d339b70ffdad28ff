//! Per-room playback session.
//!
//! Responsibilities:
//! - Owning the room's queue and loop mode
//! - Running the room's playback loop: play the active item, wait, advance
//! - Classifying node events and skip requests into loop transitions
//! - The command surface the API layer calls into
//!
//! The loop runs as one background task per room. It sits idle until `play`
//! hands it a start request, then plays items until the queue runs dry. The
//! wait on each item ends through [`PlaybackSignal`], which node events and
//! skip requests race for.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::playback_signal::{PlaybackSignal, Target, WaitOutcome};
use crate::constants::MAX_VOLUME;
use crate::error::{JukeboxError, JukeboxResult};
use crate::events::{EventEmitter, FaultKind, PlaybackEvent, QueueEvent};
use crate::node::{AudioNode, EndReason, MetadataResolver, NodeEvent, NodeEventKind, Resolution};
use crate::queue::{LoopMode, QueueItem, QueueStore};
use crate::runtime::TaskSpawner;
use crate::state::Timeouts;
use crate::utils::{duration_millis, now_millis, with_timeout};

/// Collaborators every session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub node: Arc<dyn AudioNode>,
    pub resolver: Arc<dyn MetadataResolver>,
    pub emitter: Arc<dyn EventEmitter>,
}

/// Whether the session has a playback wait outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Playing,
}

/// Result of a `play` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayOutcome {
    /// The loop started playing the active item.
    Started,
    /// Playback was already running; nothing changed.
    AlreadyPlaying,
    /// There was nothing to play; the session stays idle.
    QueueEmpty,
}

/// What an enqueue request added and when it will play.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueOutcome {
    pub added: Vec<QueueItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    /// 1-based queue position of the first added item.
    pub position: usize,
    /// Estimated time until the first added item starts.
    #[serde(rename = "untilPlayingMs", with = "duration_millis")]
    pub until_playing: Duration,
}

/// The active item and how far into it playback is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub item: QueueItem,
    #[serde(rename = "positionMs", with = "duration_millis")]
    pub position: Duration,
    pub loop_mode: LoopMode,
}

/// Serializable overview of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub room_id: String,
    pub voice_channel_id: String,
    pub text_channel_id: String,
    pub instance_id: String,
    pub state: SessionState,
    pub loop_mode: LoopMode,
    pub queue_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<String>,
    pub created_at: u64,
}

type StartReply = oneshot::Sender<JukeboxResult<PlayOutcome>>;

static NEXT_PLAY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id for one play request.
fn next_play_id() -> u64 {
    NEXT_PLAY_ID.fetch_add(1, Ordering::Relaxed)
}

fn respond(reply: Option<StartReply>, result: JukeboxResult<PlayOutcome>) {
    if let Some(reply) = reply {
        // The caller may have given up waiting.
        let _ = reply.send(result);
    }
}

/// One room's playback state machine.
pub struct PlaybackSession {
    room_id: String,
    voice_channel_id: String,
    text_channel_id: String,
    instance_id: Uuid,
    created_at: u64,
    queue: QueueStore,
    deps: SessionDeps,
    timeouts: Timeouts,
    state: Mutex<SessionState>,
    signal: PlaybackSignal,
    start_tx: mpsc::Sender<StartReply>,
    start_rx: Mutex<Option<mpsc::Receiver<StartReply>>>,
    cancel: CancellationToken,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("room_id", &self.room_id)
            .field("voice_channel_id", &self.voice_channel_id)
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .field("queue_length", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    /// Creates an idle session. Call [`start`](Self::start) to run its loop.
    pub fn new(
        room_id: impl Into<String>,
        voice_channel_id: impl Into<String>,
        text_channel_id: impl Into<String>,
        deps: SessionDeps,
        timeouts: Timeouts,
    ) -> Arc<Self> {
        let (start_tx, start_rx) = mpsc::channel(1);
        Arc::new(Self {
            room_id: room_id.into(),
            voice_channel_id: voice_channel_id.into(),
            text_channel_id: text_channel_id.into(),
            instance_id: Uuid::new_v4(),
            created_at: now_millis(),
            queue: QueueStore::new(),
            deps,
            timeouts,
            state: Mutex::new(SessionState::Idle),
            signal: PlaybackSignal::new(),
            start_tx,
            start_rx: Mutex::new(Some(start_rx)),
            cancel: CancellationToken::new(),
        })
    }

    /// Spawns the playback loop. Only the first call has an effect.
    pub fn start<S: TaskSpawner>(self: &Arc<Self>, spawner: &S) {
        let Some(start_rx) = self.start_rx.lock().take() else {
            log::warn!("[Session] Playback loop for room {} already started", self.room_id);
            return;
        };
        let session = Arc::clone(self);
        spawner.spawn(async move { session.run(start_rx).await });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn voice_channel_id(&self) -> &str {
        &self.voice_channel_id
    }

    pub fn text_channel_id(&self) -> &str {
        &self.text_channel_id
    }

    /// Identity of this session instance; a recreated session gets a new one.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.queue.loop_mode()
    }

    pub fn active_item(&self) -> Option<QueueItem> {
        self.queue.active_item()
    }

    pub fn queue_snapshot(&self) -> Vec<QueueItem> {
        self.queue.snapshot()
    }

    pub fn total_queue_duration(&self) -> Duration {
        self.queue.total_duration()
    }

    /// Whether the session has been shut down.
    pub fn is_destroyed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            room_id: self.room_id.clone(),
            voice_channel_id: self.voice_channel_id.clone(),
            text_channel_id: self.text_channel_id.clone(),
            instance_id: self.instance_id.to_string(),
            state: self.state(),
            loop_mode: self.queue.loop_mode(),
            queue_length: self.queue.len(),
            now_playing: self.queue.active_item().map(|item| item.title),
            created_at: self.created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves `query` and appends the result to the queue.
    ///
    /// Single tracks and whole playlists are queued as resolved; search
    /// results contribute only their best match. Does not start playback.
    pub async fn enqueue(&self, requester: &str, query: &str) -> JukeboxResult<EnqueueOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(JukeboxError::InvalidRequest("query must not be empty".into()));
        }

        let resolution = with_timeout(
            self.timeouts.resolve,
            "resolve",
            self.deps.resolver.resolve(query, requester),
        )
        .await
        .inspect_err(|e| {
            log::warn!("[Session] Failed to resolve '{}' in room {}: {}", query, self.room_id, e);
        })?;

        let (mut items, playlist) = match resolution {
            Resolution::Track(item) => (vec![item], None),
            Resolution::Playlist { name, items } => (items, Some(name)),
            Resolution::Search(mut items) => {
                items.truncate(1);
                (items, None)
            }
            Resolution::NoMatches => (Vec::new(), None),
        };
        if items.is_empty() {
            return Err(JukeboxError::NoMatches(query.to_string()));
        }
        for item in &mut items {
            item.requester = requester.to_string();
        }

        let placement = self.queue.add(items.iter().cloned());
        log::info!(
            "[Session] Queued {} item(s) at position {} in room {}",
            items.len(),
            placement.position,
            self.room_id
        );
        self.deps.emitter.emit_queue(QueueEvent::ItemsAdded {
            room_id: self.room_id.clone(),
            count: items.len(),
            playlist: playlist.clone(),
            timestamp: now_millis(),
        });

        Ok(EnqueueOutcome {
            added: items,
            playlist,
            position: placement.position,
            until_playing: placement.ahead,
        })
    }

    /// Starts the playback loop if the session is idle and the queue has items.
    ///
    /// Resolves once the first play request reached the node. If that request
    /// fails the error is returned, while the loop carries on with the next item.
    pub async fn play(&self) -> JukeboxResult<PlayOutcome> {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Playing {
                return Ok(PlayOutcome::AlreadyPlaying);
            }
            if self.queue.is_empty() {
                return Ok(PlayOutcome::QueueEmpty);
            }
            *state = SessionState::Playing;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self.start_tx.send(reply_tx).await.is_err() {
            *self.state.lock() = SessionState::Idle;
            return Err(JukeboxError::NoSession(self.room_id.clone()));
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Err(JukeboxError::NoSession(self.room_id.clone())))
    }

    /// Ends the active item and moves on.
    ///
    /// A `RepeatItem` loop is switched off so the skipped item does not come
    /// straight back. The skip only ever applies to the play that was
    /// current when it was requested; if that play ends on its own first, the
    /// skip is dropped and nothing else is cut short. The playback loop stops
    /// the node before starting the next item. Returns the skipped item.
    pub fn skip(&self) -> JukeboxResult<QueueItem> {
        self.require_playing()?;
        let play_id = self
            .signal
            .pending_play()
            .ok_or_else(|| JukeboxError::NothingPlaying(self.room_id.clone()))?;
        let item = self
            .queue
            .active_item()
            .ok_or_else(|| JukeboxError::NothingPlaying(self.room_id.clone()))?;

        if !self.signal.offer(Target::play(play_id), WaitOutcome::Skipped) {
            log::debug!(
                "[Session] Skip of '{}' in room {} arrived after it ended",
                item.title,
                self.room_id
            );
            return Err(JukeboxError::NothingPlaying(self.room_id.clone()));
        }

        // The loop advances a skipped item as if the loop were off already.
        if self.queue.loop_mode() == LoopMode::RepeatItem {
            self.queue.set_loop_mode(LoopMode::Off);
            self.emit_loop_mode(LoopMode::Off);
        }
        log::info!("[Session] Skipped '{}' in room {}", item.title, self.room_id);
        self.deps.emitter.emit_playback(PlaybackEvent::TrackSkipped {
            room_id: self.room_id.clone(),
            title: item.title.clone(),
            timestamp: now_millis(),
        });
        Ok(item)
    }

    /// Pauses the node. Queue and loop state are untouched.
    pub async fn stop(&self) -> JukeboxResult<()> {
        self.require_playing()?;
        self.set_paused(true).await
    }

    /// Unpauses the node.
    pub async fn resume(&self) -> JukeboxResult<()> {
        self.require_playing()?;
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> JukeboxResult<()> {
        with_timeout(
            self.timeouts.node,
            "pause",
            self.deps.node.pause(&self.room_id, paused),
        )
        .await?;
        log::info!(
            "[Session] {} room {}",
            if paused { "Paused" } else { "Resumed" },
            self.room_id
        );
        Ok(())
    }

    /// Sets the player volume, clamped to the supported range. Returns the applied level.
    pub async fn set_volume(&self, volume: u16) -> JukeboxResult<u16> {
        let volume = volume.min(MAX_VOLUME);
        with_timeout(
            self.timeouts.node,
            "set_volume",
            self.deps.node.set_volume(&self.room_id, volume),
        )
        .await?;
        log::debug!("[Session] Volume set to {} in room {}", volume, self.room_id);
        Ok(volume)
    }

    /// Toggles `requested` and returns the resulting mode.
    pub fn toggle_loop(&self, requested: LoopMode) -> LoopMode {
        let mode = self.queue.toggle_loop_mode(requested);
        log::info!("[Session] Loop mode is now {:?} in room {}", mode, self.room_id);
        self.emit_loop_mode(mode);
        mode
    }

    pub fn shuffle(&self) -> bool {
        let shuffled = self.queue.shuffle();
        if shuffled {
            self.deps.emitter.emit_queue(QueueEvent::Shuffled {
                room_id: self.room_id.clone(),
                timestamp: now_millis(),
            });
        }
        shuffled
    }

    /// Drops everything but the active item. Returns how many items were removed.
    pub fn clear(&self) -> usize {
        let removed = self.queue.clear();
        self.deps.emitter.emit_queue(QueueEvent::Cleared {
            room_id: self.room_id.clone(),
            removed,
            timestamp: now_millis(),
        });
        removed
    }

    pub fn remove_duplicates(&self) -> usize {
        let removed = self.queue.remove_duplicates();
        self.deps.emitter.emit_queue(QueueEvent::DuplicatesRemoved {
            room_id: self.room_id.clone(),
            removed,
            timestamp: now_millis(),
        });
        removed
    }

    /// Position reported by the node for the active item.
    pub async fn track_position(&self) -> JukeboxResult<Duration> {
        self.require_playing()?;
        with_timeout(
            self.timeouts.node,
            "position",
            self.deps.node.position(&self.room_id),
        )
        .await
    }

    pub async fn now_playing(&self) -> JukeboxResult<NowPlaying> {
        self.require_playing()?;
        let item = self
            .queue
            .active_item()
            .ok_or_else(|| JukeboxError::NothingPlaying(self.room_id.clone()))?;
        let position = self.track_position().await?;
        Ok(NowPlaying {
            item,
            position,
            loop_mode: self.queue.loop_mode(),
        })
    }

    fn require_playing(&self) -> JukeboxResult<()> {
        if self.state() == SessionState::Playing {
            Ok(())
        } else {
            Err(JukeboxError::NothingPlaying(self.room_id.clone()))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node events
    // ─────────────────────────────────────────────────────────────────────────

    /// Classifies a node event for this room and feeds it to the playback wait.
    ///
    /// Ends the node reports as the echo of our own commands are ignored.
    /// Events for a track other than the one being waited on are dropped.
    pub fn handle_node_event(&self, event: &NodeEvent) {
        let (outcome, detail) = match &event.kind {
            NodeEventKind::Ended { reason } if !reason.may_start_next() => {
                log::debug!("[Session] Ignoring {:?} end in room {}", reason, self.room_id);
                return;
            }
            NodeEventKind::Ended {
                reason: EndReason::LoadFailed,
            } => (
                WaitOutcome::Fault(FaultKind::LoadFailed),
                "node could not load the track".to_string(),
            ),
            NodeEventKind::Ended { .. } => (WaitOutcome::Finished, String::new()),
            NodeEventKind::Stuck { threshold_ms } => (
                WaitOutcome::Fault(FaultKind::Stuck),
                format!("no progress for {threshold_ms}ms"),
            ),
            NodeEventKind::Exception { message, severity } => (
                WaitOutcome::Fault(FaultKind::Exception),
                format!("{message} ({severity:?})"),
            ),
        };

        let target = Target {
            play_id: event.play_id,
            track: event.track.as_deref(),
        };
        if !self.signal.offer(target, outcome) {
            log::debug!(
                "[Session] Dropping stale {:?} for track {:?} (play {:?}) in room {}",
                event.kind,
                event.track,
                event.play_id,
                self.room_id
            );
            return;
        }

        if let WaitOutcome::Fault(kind) = outcome {
            let title = self.queue.active_item().map(|item| item.title);
            self.emit_fault(kind, title, &detail);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Playback loop
    // ─────────────────────────────────────────────────────────────────────────

    async fn run(self: Arc<Self>, mut start_rx: mpsc::Receiver<StartReply>) {
        log::debug!("[Session] Playback loop started for room {}", self.room_id);
        loop {
            let reply = tokio::select! {
                _ = self.cancel.cancelled() => break,
                request = start_rx.recv() => match request {
                    Some(reply) => reply,
                    None => break,
                },
            };
            if self.drive(Some(reply)).await.is_break() {
                break;
            }
        }
        log::debug!("[Session] Playback loop stopped for room {}", self.room_id);
    }

    /// Plays items until the queue runs dry (`Continue`) or the session is
    /// cancelled (`Break`).
    async fn drive(&self, mut reply: Option<StartReply>) -> ControlFlow<()> {
        loop {
            if self.cancel.is_cancelled() {
                return ControlFlow::Break(());
            }

            let Some(item) = self.queue.active_item() else {
                if self.settle_idle() {
                    respond(reply.take(), Ok(PlayOutcome::QueueEmpty));
                    return ControlFlow::Continue(());
                }
                continue;
            };

            // Armed before the play call so an immediate end is not lost.
            let play_id = next_play_id();
            self.signal.arm(play_id, &item.stream_ref);
            let played = tokio::select! {
                _ = self.cancel.cancelled() => return ControlFlow::Break(()),
                result = with_timeout(
                    self.timeouts.node,
                    "play",
                    self.deps.node.play(&self.room_id, &item, play_id),
                ) => result,
            };

            if let Err(e) = played {
                self.signal.disarm();
                log::warn!(
                    "[Session] Failed to play '{}' in room {}: {}",
                    item.title,
                    self.room_id,
                    e
                );
                self.emit_fault(FaultKind::PlayFailed, Some(item.title.clone()), &e.to_string());
                respond(reply.take(), Err(e));
                self.queue.advance_with(LoopMode::Off);
                continue;
            }

            respond(reply.take(), Ok(PlayOutcome::Started));
            log::info!("[Session] Now playing '{}' in room {}", item.title, self.room_id);
            self.deps.emitter.emit_playback(PlaybackEvent::TrackStarted {
                room_id: self.room_id.clone(),
                title: item.title.clone(),
                url: item.url.clone(),
                requester: item.requester.clone(),
                duration_ms: item.duration.as_millis() as u64,
                timestamp: now_millis(),
            });

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return ControlFlow::Break(()),
                outcome = self.signal.wait() => outcome,
            };
            if outcome == WaitOutcome::Skipped {
                tokio::select! {
                    _ = self.cancel.cancelled() => return ControlFlow::Break(()),
                    _ = self.stop_skipped(&item) => {}
                }
            }
            self.apply_outcome(&item, outcome);
        }
    }

    /// Stops the node's current track after a skip won the wait. A failed stop
    /// is only logged; the next play replaces the track anyway.
    async fn stop_skipped(&self, item: &QueueItem) {
        let stopped = with_timeout(
            self.timeouts.node,
            "stop",
            self.deps.node.stop(&self.room_id),
        )
        .await;
        if let Err(e) = stopped {
            log::warn!(
                "[Session] Stop failed while skipping '{}' in room {}: {}",
                item.title,
                self.room_id,
                e
            );
        }
    }

    fn apply_outcome(&self, item: &QueueItem, outcome: WaitOutcome) {
        match outcome {
            WaitOutcome::Finished => {
                if self.queue.loop_mode() == LoopMode::RepeatItem {
                    log::debug!("[Session] Replaying '{}' in room {}", item.title, self.room_id);
                } else {
                    self.queue.advance();
                }
            }
            WaitOutcome::Skipped => {
                let mode = match self.queue.loop_mode() {
                    LoopMode::RepeatItem => LoopMode::Off,
                    mode => mode,
                };
                self.queue.advance_with(mode);
            }
            WaitOutcome::Fault(kind) => {
                log::warn!(
                    "[Session] Moving past '{}' in room {} after {:?}",
                    item.title,
                    self.room_id,
                    kind
                );
                self.queue.advance_with(LoopMode::Off);
            }
        }
    }

    /// Goes idle if the queue is empty. Checked under the state lock so a
    /// concurrent `play` either sees `Playing` or finds the loop idle.
    fn settle_idle(&self) -> bool {
        {
            let mut state = self.state.lock();
            if !self.queue.is_empty() {
                return false;
            }
            *state = SessionState::Idle;
        }
        log::info!("[Session] Queue finished in room {}, going idle", self.room_id);
        self.deps.emitter.emit_playback(PlaybackEvent::Idle {
            room_id: self.room_id.clone(),
            timestamp: now_millis(),
        });
        true
    }

    fn emit_loop_mode(&self, mode: LoopMode) {
        self.deps.emitter.emit_queue(QueueEvent::LoopModeChanged {
            room_id: self.room_id.clone(),
            mode,
            timestamp: now_millis(),
        });
    }

    fn emit_fault(&self, kind: FaultKind, title: Option<String>, detail: &str) {
        let name = title.as_deref().unwrap_or("Track");
        let message = match kind {
            FaultKind::Stuck => format!("{name} is stuck! Skipping."),
            _ => format!("{name} failed to play. Skipping."),
        };
        if kind == FaultKind::Exception {
            log::error!("[Session] {} (room {}: {})", message, self.room_id, detail);
        } else {
            log::warn!("[Session] {} (room {}: {})", message, self.room_id, detail);
        }
        self.deps.emitter.emit_playback(PlaybackEvent::Fault {
            room_id: self.room_id.clone(),
            kind,
            title,
            message,
            text_channel_id: self.text_channel_id.clone(),
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Stops the loop and destroys the room's player on the node.
    pub(crate) async fn shutdown(&self) -> JukeboxResult<()> {
        self.cancel.cancel();
        self.signal.disarm();
        *self.state.lock() = SessionState::Idle;
        with_timeout(
            self.timeouts.node,
            "destroy",
            self.deps.node.destroy(&self.room_id),
        )
        .await
    }
}
