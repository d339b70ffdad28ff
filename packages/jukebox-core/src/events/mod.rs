//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - [`BroadcastEventBridge`] for WebSocket transport
//! - Event types for session lifecycle, queue changes and playback

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::queue::LoopMode;

/// Events broadcast to clients.
///
/// Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Session creation and teardown.
    Session(SessionEvent),

    /// Queue edits and loop mode changes.
    Queue(QueueEvent),

    /// Track transitions and playback faults.
    Playback(PlaybackEvent),
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DestroyReason {
    /// Explicit disconnect request.
    Disconnected,
    /// The bot was left alone in the voice channel.
    VoiceChannelEmpty,
    /// A play request targeted another voice channel in the same room.
    ChannelChanged,
    /// Process shutdown.
    Shutdown,
}

/// Events related to session lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A session joined a voice channel.
    #[serde(rename_all = "camelCase")]
    Created {
        room_id: String,
        voice_channel_id: String,
        text_channel_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A session left its voice channel and was released.
    #[serde(rename_all = "camelCase")]
    Destroyed {
        room_id: String,
        reason: DestroyReason,
        timestamp: u64,
    },
}

/// Events related to queue contents.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    /// Items were appended.
    #[serde(rename_all = "camelCase")]
    ItemsAdded {
        room_id: String,
        count: usize,
        /// Playlist name when the items came from one.
        #[serde(skip_serializing_if = "Option::is_none")]
        playlist: Option<String>,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    Shuffled { room_id: String, timestamp: u64 },
    #[serde(rename_all = "camelCase")]
    Cleared {
        room_id: String,
        removed: usize,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    DuplicatesRemoved {
        room_id: String,
        removed: usize,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    LoopModeChanged {
        room_id: String,
        mode: LoopMode,
        timestamp: u64,
    },
}

/// Class of playback fault reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    /// The node stopped making progress on the track.
    Stuck,
    /// The node reported an exception while streaming.
    Exception,
    /// The node could not load the track.
    LoadFailed,
    /// The play request itself failed.
    PlayFailed,
}

/// Events related to playback progress.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// The node started streaming an item.
    #[serde(rename_all = "camelCase")]
    TrackStarted {
        room_id: String,
        title: String,
        url: String,
        requester: String,
        duration_ms: u64,
        timestamp: u64,
    },
    /// A skip request ended the active item.
    #[serde(rename_all = "camelCase")]
    TrackSkipped {
        room_id: String,
        title: String,
        timestamp: u64,
    },
    /// The queue ran dry and the session went idle.
    #[serde(rename_all = "camelCase")]
    Idle { room_id: String, timestamp: u64 },
    /// A track failed and was skipped.
    #[serde(rename_all = "camelCase")]
    Fault {
        room_id: String,
        kind: FaultKind,
        /// Title of the failed item, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        message: String,
        /// Text channel the failure should be reported in.
        text_channel_id: String,
        timestamp: u64,
    },
}

impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        Self::Session(event)
    }
}

impl From<QueueEvent> for BroadcastEvent {
    fn from(event: QueueEvent) -> Self {
        Self::Queue(event)
    }
}

impl From<PlaybackEvent> for BroadcastEvent {
    fn from(event: PlaybackEvent) -> Self {
        Self::Playback(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_event_serializes_with_category_and_type() {
        let event: BroadcastEvent = PlaybackEvent::Fault {
            room_id: "guild-1".into(),
            kind: FaultKind::Stuck,
            title: Some("Song".into()),
            message: "Song is stuck! Skipping.".into(),
            text_channel_id: "text-1".into(),
            timestamp: 5,
        }
        .into();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "playback");
        assert_eq!(json["type"], "fault");
        assert_eq!(json["kind"], "stuck");
        assert_eq!(json["roomId"], "guild-1");
        assert_eq!(json["textChannelId"], "text-1");
    }

    #[test]
    fn loop_mode_change_serializes_mode() {
        let event: BroadcastEvent = QueueEvent::LoopModeChanged {
            room_id: "r".into(),
            mode: LoopMode::RepeatQueue,
            timestamp: 0,
        }
        .into();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "queue");
        assert_eq!(json["type"], "loopModeChanged");
        assert_eq!(json["mode"], "repeatQueue");
    }
}
