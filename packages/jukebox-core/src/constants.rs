//! Fixed values shared across the jukebox core.
//!
//! Tunable values live in [`Config`](crate::state::Config); these are the
//! ones that define behavior callers rely on.

// ─────────────────────────────────────────────────────────────────────────────
// Volume
// ─────────────────────────────────────────────────────────────────────────────

/// Volume applied to a freshly joined session.
pub const DEFAULT_VOLUME: u16 = 30;

/// Upper bound accepted by `set_volume`; higher requests are clamped.
pub const MAX_VOLUME: u16 = 150;

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator time limits (milliseconds)
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_NODE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 10_000;

// ─────────────────────────────────────────────────────────────────────────────
// Display
// ─────────────────────────────────────────────────────────────────────────────

/// Number of segments in the now-playing progress bar (the bar has one more cell).
pub const PROGRESS_BAR_SEGMENTS: u32 = 30;

/// Maximum number of upcoming items listed in a queue view.
pub const QUEUE_VIEW_LIMIT: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Ports tried in order when no preferred port is configured.
pub const SERVER_PORT_RANGE: (u16, u16) = (49500, 49510);

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "jukebox";
