//! In-process audio node that plays tracks on timers.
//!
//! Used by the standalone server when no real node is attached, and by the
//! integration tests. Each room gets a player whose track "plays" for the
//! item's duration and then reports `Ended(Finished)`. Commands produce the
//! same echo events a real node sends: `Replaced` when a play request cuts
//! off a track, `Stopped` on stop, `Cleanup` on destroy. Every event carries
//! the play id of the track it is about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{NodeError, NodeResult};
use super::traits::AudioNode;
use super::types::{EndReason, NodeEvent};
use crate::queue::QueueItem;

struct PlayingTrack {
    stream_ref: String,
    play_id: u64,
    duration: Duration,
    generation: u64,
    /// Time played before the current run started.
    played: Duration,
    /// Start of the current run; `None` while paused.
    resumed_at: Option<Instant>,
    timer: CancellationToken,
}

impl PlayingTrack {
    fn position(&self) -> Duration {
        let running = self.resumed_at.map(|at| at.elapsed()).unwrap_or_default();
        (self.played + running).min(self.duration)
    }

    fn ended(&self, room_id: &str, reason: EndReason) -> NodeEvent {
        NodeEvent::ended(room_id, Some(self.stream_ref.clone()), reason).for_play(self.play_id)
    }
}

#[derive(Default)]
struct Player {
    track: Option<PlayingTrack>,
    volume: u16,
}

/// Timer-driven [`AudioNode`] that reports events on an mpsc channel.
pub struct SimulatedNode {
    players: Arc<DashMap<String, Player>>,
    events_tx: mpsc::Sender<NodeEvent>,
    generation: AtomicU64,
}

impl SimulatedNode {
    pub fn new(events_tx: mpsc::Sender<NodeEvent>) -> Self {
        Self {
            players: Arc::new(DashMap::new()),
            events_tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Current volume of the room's player, if it exists.
    pub fn volume(&self, room_id: &str) -> Option<u16> {
        self.players.get(room_id).map(|player| player.volume)
    }

    /// Stream reference of the room's current track.
    pub fn current_track(&self, room_id: &str) -> Option<String> {
        self.players
            .get(room_id)
            .and_then(|player| player.track.as_ref().map(|t| t.stream_ref.clone()))
    }

    async fn send(&self, event: NodeEvent) {
        if self.events_tx.send(event).await.is_err() {
            log::trace!("[SimulatedNode] Event receiver dropped");
        }
    }

    /// Starts the end-of-track timer for the remaining part of `track`.
    fn spawn_timer(&self, room_id: &str, track: &PlayingTrack) {
        let players = Arc::clone(&self.players);
        let events_tx = self.events_tx.clone();
        let room_id = room_id.to_string();
        let finished_event = track.ended(&room_id, EndReason::Finished);
        let generation = track.generation;
        let remaining = track.duration.saturating_sub(track.played);
        let timer = track.timer.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(remaining) => {
                    let finished = players
                        .get_mut(&room_id)
                        .map(|mut player| {
                            let current = player
                                .track
                                .as_ref()
                                .is_some_and(|t| t.generation == generation);
                            if current {
                                player.track = None;
                            }
                            current
                        })
                        .unwrap_or(false);
                    if finished {
                        let _ = events_tx.send(finished_event).await;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl AudioNode for SimulatedNode {
    async fn play(&self, room_id: &str, item: &QueueItem, play_id: u64) -> NodeResult<()> {
        if item.stream_ref.is_empty() {
            return Err(NodeError::Rejected("empty stream reference".into()));
        }

        let track = PlayingTrack {
            stream_ref: item.stream_ref.clone(),
            play_id,
            duration: item.duration,
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
            played: Duration::ZERO,
            resumed_at: Some(Instant::now()),
            timer: CancellationToken::new(),
        };
        let replaced = {
            let mut player = self.players.entry(room_id.to_string()).or_default();
            let replaced = player.track.replace(track);
            if let Some(track) = player.track.as_ref() {
                self.spawn_timer(room_id, track);
            }
            replaced
        };

        if let Some(old) = replaced {
            old.timer.cancel();
            self.send(old.ended(room_id, EndReason::Replaced)).await;
        }
        log::debug!("[SimulatedNode] Playing {} in room {}", item.stream_ref, room_id);
        Ok(())
    }

    async fn stop(&self, room_id: &str) -> NodeResult<()> {
        let stopped = self
            .players
            .get_mut(room_id)
            .and_then(|mut player| player.track.take());

        if let Some(track) = stopped {
            track.timer.cancel();
            self.send(track.ended(room_id, EndReason::Stopped)).await;
        }
        Ok(())
    }

    async fn pause(&self, room_id: &str, paused: bool) -> NodeResult<()> {
        let mut player = self
            .players
            .get_mut(room_id)
            .ok_or_else(|| NodeError::NoPlayer(room_id.to_string()))?;
        let Some(track) = player.track.as_mut() else {
            return Ok(());
        };

        match (paused, track.resumed_at) {
            (true, Some(at)) => {
                track.played += at.elapsed();
                track.resumed_at = None;
                track.timer.cancel();
            }
            (false, None) => {
                track.resumed_at = Some(Instant::now());
                track.timer = CancellationToken::new();
                self.spawn_timer(room_id, track);
            }
            _ => {}
        }
        Ok(())
    }

    async fn set_volume(&self, room_id: &str, volume: u16) -> NodeResult<()> {
        self.players.entry(room_id.to_string()).or_default().volume = volume;
        Ok(())
    }

    async fn position(&self, room_id: &str) -> NodeResult<Duration> {
        let player = self
            .players
            .get(room_id)
            .ok_or_else(|| NodeError::NoPlayer(room_id.to_string()))?;
        Ok(player
            .track
            .as_ref()
            .map(PlayingTrack::position)
            .unwrap_or_default())
    }

    async fn destroy(&self, room_id: &str) -> NodeResult<()> {
        let Some((_, player)) = self.players.remove(room_id) else {
            return Ok(());
        };
        if let Some(track) = player.track {
            track.timer.cancel();
            self.send(track.ended(room_id, EndReason::Cleanup)).await;
        }
        Ok(())
    }
}
