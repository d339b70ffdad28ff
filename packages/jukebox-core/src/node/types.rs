//! Wire types exchanged with the audio node and the metadata resolver.

use serde::{Deserialize, Serialize};

use crate::queue::QueueItem;

/// Why the node stopped playing a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The track played to its end.
    Finished,
    /// The node could not load the stream.
    LoadFailed,
    /// An explicit stop request ended the track.
    Stopped,
    /// Another play request replaced the track.
    Replaced,
    /// The player was destroyed.
    Cleanup,
}

impl EndReason {
    /// Whether this end lets the session move on by itself.
    ///
    /// `Stopped` and `Replaced` are always the echo of a command the session
    /// issued, and `Cleanup` only happens on teardown.
    pub fn may_start_next(self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}

/// Severity attached to a node exception.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExceptionSeverity {
    #[default]
    Common,
    Suspicious,
    Fault,
}

/// The part of a node event that says what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeEventKind {
    /// The track ended.
    Ended { reason: EndReason },
    /// The track stopped making progress for longer than the node's threshold.
    #[serde(rename_all = "camelCase")]
    Stuck { threshold_ms: u64 },
    /// The node hit an error while decoding or streaming.
    Exception {
        message: String,
        #[serde(default)]
        severity: ExceptionSeverity,
    },
}

/// A playback event pushed by the audio node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvent {
    /// Room whose player produced the event.
    pub room_id: String,
    /// Stream reference of the track the event is about, when the node reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    /// Play id the session passed to [`AudioNode::play`](super::AudioNode::play),
    /// echoed back by nodes that support it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_id: Option<u64>,
    pub kind: NodeEventKind,
}

impl NodeEvent {
    pub fn ended(room_id: impl Into<String>, track: Option<String>, reason: EndReason) -> Self {
        Self {
            room_id: room_id.into(),
            track,
            play_id: None,
            kind: NodeEventKind::Ended { reason },
        }
    }

    /// Tags the event with the play it is about.
    pub fn for_play(mut self, play_id: u64) -> Self {
        self.play_id = Some(play_id);
        self
    }
}

/// What a query resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A single track URL.
    Track(QueueItem),
    /// A playlist URL; every item gets queued.
    Playlist { name: String, items: Vec<QueueItem> },
    /// Free-text search results, best match first.
    Search(Vec<QueueItem>),
    /// Nothing matched the query.
    NoMatches,
}
