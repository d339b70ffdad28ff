//! Event emitter abstraction for decoupling services from transport.
//!
//! Sessions and the registry depend on the [`EventEmitter`] trait rather than
//! a concrete broadcast channel, so tests can observe what they report.

use super::{PlaybackEvent, QueueEvent, SessionEvent};

/// Trait for emitting domain events without knowledge of transport.
pub trait EventEmitter: Send + Sync {
    /// Emits a session lifecycle event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits a queue change event.
    fn emit_queue(&self, event: QueueEvent);

    /// Emits a playback progress or fault event.
    fn emit_playback(&self, event: PlaybackEvent);
}

/// No-op emitter for embedding without any event consumer.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_session(&self, _event: SessionEvent) {}

    fn emit_queue(&self, _event: QueueEvent) {}

    fn emit_playback(&self, _event: PlaybackEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_queue(&self, event: QueueEvent) {
        tracing::debug!(?event, "queue_event");
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }
}
