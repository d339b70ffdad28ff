//! Text rendering for now-playing and queue views.
//!
//! The command layer posts these strings into chat; the HTTP API returns the
//! structured [`QueueView`] alongside the rendered text.

use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;

use crate::constants::{PROGRESS_BAR_SEGMENTS, QUEUE_VIEW_LIMIT};
use crate::queue::{LoopMode, QueueItem};
use crate::utils::duration_millis;

/// Formats a duration as `M:SS`, or `H:MM:SS` from one hour up.
///
/// Rounds to the nearest second.
pub fn format_duration(duration: Duration) -> String {
    let total = (duration.as_millis() + 500) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Renders a seek bar with a knob at the current position.
pub fn progress_bar(position: Duration, duration: Duration) -> String {
    let knob = if duration.is_zero() {
        0
    } else {
        let segment = duration.as_secs_f64() / f64::from(PROGRESS_BAR_SEGMENTS);
        (position.as_secs_f64() / segment).round() as u32
    };
    (0..=PROGRESS_BAR_SEGMENTS)
        .map(|i| if i == knob { "🔘" } else { "▬" })
        .collect()
}

/// Now-playing text: seek bar, elapsed and total time, requester.
pub fn render_now_playing(item: &QueueItem, position: Duration) -> String {
    format!(
        "`{}`\n\n{} / {}\n\n`Requested by:` {}",
        progress_bar(position, item.duration),
        format_duration(position),
        format_duration(item.duration),
        item.requester
    )
}

/// Snapshot of a queue shaped for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub now_playing: Option<QueueItem>,
    /// Items after the active one, capped for display.
    pub up_next: Vec<QueueItem>,
    /// Number of items in the whole queue.
    pub len: usize,
    #[serde(rename = "totalMs", with = "duration_millis")]
    pub total: Duration,
    pub loop_mode: LoopMode,
}

impl QueueView {
    pub fn new(items: &[QueueItem], loop_mode: LoopMode) -> Self {
        Self {
            now_playing: items.first().cloned(),
            up_next: items
                .iter()
                .skip(1)
                .take(QUEUE_VIEW_LIMIT - 1)
                .cloned()
                .collect(),
            len: items.len(),
            total: items.iter().map(|item| item.duration).sum(),
            loop_mode,
        }
    }
}

fn track_line(item: &QueueItem) -> String {
    format!(
        "[{}]({}) | `{} Requested by: {}`\n",
        item.title,
        item.url,
        format_duration(item.duration),
        item.requester
    )
}

/// Renders the queue listing shown by the queue command.
pub fn render_queue(view: &QueueView) -> String {
    let Some(active) = &view.now_playing else {
        return "Queue empty! Add some music!".to_string();
    };

    let mut out = String::from("__Now Playing:__\n");
    out.push_str(&track_line(active));

    if !view.up_next.is_empty() {
        out.push_str("\n__Up Next:__\n");
        for (i, item) in view.up_next.iter().enumerate() {
            let _ = write!(out, "`{}.` {}", i + 1, track_line(item));
        }
    }

    let looping = match view.loop_mode {
        LoopMode::Off => String::new(),
        mode => format!(" | 🔁 {}", mode.label()),
    };
    let _ = write!(
        out,
        "\n**{} songs in queue | {} total length{}**",
        view.len,
        format_duration(view.total),
        looping
    );
    out
}
