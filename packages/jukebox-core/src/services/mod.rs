//! Playback orchestration services.

pub mod node_event_processor;
pub mod playback_session;
mod playback_signal;
pub mod session_registry;

pub use node_event_processor::NodeEventProcessor;
pub use playback_session::{
    EnqueueOutcome, NowPlaying, PlayOutcome, PlaybackSession, SessionDeps, SessionState,
    SessionSummary,
};
pub use session_registry::SessionRegistry;
