use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A playable entry in a room's queue.
///
/// Items are immutable once queued. Replaying an item (loop modes) plays a
/// clone of it; the node treats each `play` call as a fresh instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Canonical URL of the source.
    pub url: String,
    /// Who asked for this item.
    pub requester: String,
    /// Source-specific identity, used for duplicate detection.
    pub identifier: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "durationMs", with = "crate::utils::duration_millis")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Opaque reference the audio node loads and reports back in events.
    pub stream_ref: String,
    /// Arbitrary source details kept for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl QueueItem {
    pub fn new(
        url: impl Into<String>,
        requester: impl Into<String>,
        identifier: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        duration: Duration,
        stream_ref: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            requester: requester.into(),
            identifier: identifier.into(),
            title: title.into(),
            author: author.into(),
            duration,
            thumbnail_url: None,
            stream_ref: stream_ref.into(),
            details: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Thumbnail to display, falling back to the video-id preview image.
    pub fn thumbnail(&self) -> String {
        match &self.thumbnail_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.identifier),
        }
    }

    /// Two items are duplicates when they point at the same source.
    pub fn is_duplicate_of(&self, other: &QueueItem) -> bool {
        self.identifier == other.identifier
    }
}
