//! Collaborator traits for the audio node, voice gateway and metadata resolver.
//!
//! These traits are the seams between the playback orchestration and the
//! outside world. Implementations talk to a real audio node or chat gateway;
//! tests and the demo server use in-process versions.

use std::time::Duration;

use async_trait::async_trait;

use super::error::{GatewayResult, NodeResult, ResolveResult};
use super::types::Resolution;
use crate::queue::QueueItem;

/// Remote audio node that streams tracks into voice channels.
///
/// Each room has at most one player on the node. The node reports what
/// happens to the playing track as [`NodeEvent`](super::NodeEvent)s on a
/// channel handed to the composition root.
#[async_trait]
pub trait AudioNode: Send + Sync {
    /// Starts streaming `item` in the room's player, replacing any current track.
    ///
    /// # Arguments
    /// * `room_id` - Room whose player should play
    /// * `item` - The item to stream; `stream_ref` identifies it in later events
    /// * `play_id` - Unique per play request; nodes that can should echo it
    ///   in [`NodeEvent::play_id`](super::NodeEvent::play_id)
    async fn play(&self, room_id: &str, item: &QueueItem, play_id: u64) -> NodeResult<()>;

    /// Stops the current track. The node follows up with an `Ended(Stopped)` event.
    async fn stop(&self, room_id: &str) -> NodeResult<()>;

    /// Pauses (`true`) or resumes (`false`) the current track.
    async fn pause(&self, room_id: &str, paused: bool) -> NodeResult<()>;

    /// Sets the player volume.
    ///
    /// # Arguments
    /// * `room_id` - Room whose player to adjust
    /// * `volume` - Volume level, already clamped by the caller
    async fn set_volume(&self, room_id: &str, volume: u16) -> NodeResult<()>;

    /// Returns the playback position of the current track.
    async fn position(&self, room_id: &str) -> NodeResult<Duration>;

    /// Destroys the room's player and releases node-side resources.
    async fn destroy(&self, room_id: &str) -> NodeResult<()>;
}

/// Chat platform gateway used to join and leave voice channels.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Connects the bot to `voice_channel_id` in the room.
    async fn join(&self, room_id: &str, voice_channel_id: &str) -> GatewayResult<()>;

    /// Disconnects the bot from the room's voice channel.
    async fn leave(&self, room_id: &str) -> GatewayResult<()>;
}

/// Turns a user query (URL or free text) into playable items.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolves `query` on behalf of `requester`.
    ///
    /// Returned items should carry `requester`; the session enforces it anyway.
    async fn resolve(&self, query: &str, requester: &str) -> ResolveResult<Resolution>;
}
