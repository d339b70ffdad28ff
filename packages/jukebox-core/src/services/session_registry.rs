//! Room to session registry.
//!
//! Responsibilities:
//! - Creating a session on first play, joining the requested voice channel
//! - Replacing a session whose room moved to another voice channel
//! - Tearing sessions down on disconnect, empty voice channel or shutdown
//!
//! Creation and teardown for a room run under that room's async lock, so
//! concurrent commands for the same room never see two sessions. Rooms do
//! not block each other. A room's lock is dropped from the map once the room
//! has no session and nobody holds or waits on it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::playback_session::{PlaybackSession, SessionDeps, SessionSummary};
use crate::error::JukeboxResult;
use crate::events::{DestroyReason, SessionEvent};
use crate::node::VoiceGateway;
use crate::runtime::TokioSpawner;
use crate::state::{Config, Timeouts};
use crate::utils::{now_millis, with_timeout};

/// Owns every live [`PlaybackSession`], keyed by room.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<PlaybackSession>>,
    room_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    gateway: Arc<dyn VoiceGateway>,
    deps: SessionDeps,
    timeouts: Timeouts,
    default_volume: u16,
    spawner: TokioSpawner,
}

impl SessionRegistry {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        deps: SessionDeps,
        config: &Config,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            room_locks: DashMap::new(),
            gateway,
            deps,
            timeouts: config.timeouts(),
            default_volume: config.default_volume,
            spawner,
        }
    }

    async fn lock_room(&self, room_id: &str) -> RoomGuard<'_> {
        let lock = self
            .room_locks
            .entry(room_id.to_string())
            .or_default()
            .clone();
        RoomGuard {
            registry: self,
            room_id: room_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Forgets the room's lock if only the map still references it.
    fn prune_room_lock(&self, room_id: &str) {
        if self.sessions.contains_key(room_id) {
            return;
        }
        // The shard lock held by `remove_if` keeps `lock_room` from cloning
        // the entry while its count is checked.
        self.room_locks
            .remove_if(room_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Returns the room's session, creating and joining one if needed.
    ///
    /// A session bound to a different voice channel is torn down first.
    /// If joining fails no session is registered for the room.
    pub async fn get_or_create(
        &self,
        room_id: &str,
        voice_channel_id: &str,
        text_channel_id: &str,
    ) -> JukeboxResult<Arc<PlaybackSession>> {
        let _guard = self.lock_room(room_id).await;

        if let Some(existing) = self.get(room_id) {
            if existing.voice_channel_id() == voice_channel_id {
                return Ok(existing);
            }
            log::info!(
                "[Registry] Room {} moving from voice channel {} to {}",
                room_id,
                existing.voice_channel_id(),
                voice_channel_id
            );
            if let Err(e) = self.teardown(room_id, DestroyReason::ChannelChanged).await {
                log::error!("[Registry] Teardown of old session in room {} failed: {}", room_id, e);
            }
        }

        with_timeout(
            self.timeouts.join,
            "voice join",
            self.gateway.join(room_id, voice_channel_id),
        )
        .await
        .inspect_err(|e| {
            log::warn!(
                "[Registry] Failed to join voice channel {} in room {}: {}",
                voice_channel_id,
                room_id,
                e
            );
        })?;

        let session = PlaybackSession::new(
            room_id,
            voice_channel_id,
            text_channel_id,
            self.deps.clone(),
            self.timeouts,
        );
        if let Err(e) = session.set_volume(self.default_volume).await {
            log::warn!("[Registry] Failed to apply default volume in room {}: {}", room_id, e);
        }
        session.start(&self.spawner);

        let previous = self.sessions.insert(room_id.to_string(), Arc::clone(&session));
        debug_assert!(previous.is_none(), "two sessions registered for room {room_id}");

        log::info!(
            "[Registry] Created session {} for room {} in voice channel {}",
            session.instance_id(),
            room_id,
            voice_channel_id
        );
        self.deps.emitter.emit_session(SessionEvent::Created {
            room_id: room_id.to_string(),
            voice_channel_id: voice_channel_id.to_string(),
            text_channel_id: text_channel_id.to_string(),
            timestamp: now_millis(),
        });

        Ok(session)
    }

    /// Returns the room's session without creating one.
    pub fn get(&self, room_id: &str) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(room_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Tears down the room's session. Returns `false` if there was none.
    pub async fn destroy(&self, room_id: &str) -> JukeboxResult<bool> {
        self.destroy_with_reason(room_id, DestroyReason::Disconnected)
            .await
    }

    /// Handles the chat client's notice that a voice channel emptied.
    ///
    /// Only destroys the session if it is bound to that channel.
    pub async fn handle_voice_channel_empty(
        &self,
        room_id: &str,
        voice_channel_id: &str,
    ) -> JukeboxResult<bool> {
        let _guard = self.lock_room(room_id).await;
        match self.get(room_id) {
            Some(session) if session.voice_channel_id() == voice_channel_id => {
                log::info!(
                    "[Registry] Voice channel {} in room {} is empty, leaving",
                    voice_channel_id,
                    room_id
                );
                self.teardown(room_id, DestroyReason::VoiceChannelEmpty).await?;
                Ok(true)
            }
            _ => {
                log::debug!(
                    "[Registry] Ignoring empty voice channel {} in room {}",
                    voice_channel_id,
                    room_id
                );
                Ok(false)
            }
        }
    }

    async fn destroy_with_reason(&self, room_id: &str, reason: DestroyReason) -> JukeboxResult<bool> {
        let _guard = self.lock_room(room_id).await;
        if !self.sessions.contains_key(room_id) {
            return Ok(false);
        }
        self.teardown(room_id, reason).await?;
        Ok(true)
    }

    /// Unregisters the session, then releases the node player and the voice channel.
    ///
    /// Caller holds the room lock. The entry is gone even if a step fails;
    /// the first failure is returned.
    async fn teardown(&self, room_id: &str, reason: DestroyReason) -> JukeboxResult<()> {
        let Some((_, session)) = self.sessions.remove(room_id) else {
            return Ok(());
        };

        let destroyed = session.shutdown().await;
        let left = with_timeout(self.timeouts.join, "voice leave", self.gateway.leave(room_id)).await;

        log::info!(
            "[Registry] Destroyed session {} for room {} ({:?})",
            session.instance_id(),
            room_id,
            reason
        );
        self.deps.emitter.emit_session(SessionEvent::Destroyed {
            room_id: room_id.to_string(),
            reason,
            timestamp: now_millis(),
        });

        destroyed.and(left)
    }

    /// Summaries of every live session.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut rooms: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tears down every session. Returns how many were destroyed.
    pub async fn destroy_all(&self) -> usize {
        let rooms: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let mut destroyed = 0;
        for room_id in rooms {
            match self.destroy_with_reason(&room_id, DestroyReason::Shutdown).await {
                Ok(true) => destroyed += 1,
                Ok(false) => {}
                Err(e) => {
                    log::error!("[Registry] Shutdown of room {} failed: {}", room_id, e);
                    destroyed += 1;
                }
            }
        }
        destroyed
    }
}

/// Holds a room's lock; prunes the lock entry when released.
struct RoomGuard<'a> {
    registry: &'a SessionRegistry,
    room_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.registry.prune_room_lock(&self.room_id);
    }
}
