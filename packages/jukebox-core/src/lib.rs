//! Jukebox Core - per-room audio queue orchestration.
//!
//! This crate keeps one playback session per chat room, each with its own
//! queue, loop mode and playback loop, and drives an external audio node
//! through it. It is used by the standalone server and can be embedded by a
//! chat bot that supplies its own collaborators.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`queue`]: Queue items, loop modes and the per-room queue store
//! - [`services`]: Playback sessions, the session registry and the node event bridge
//! - [`node`]: Collaborator traits (audio node, voice gateway, resolver) and node events
//! - [`events`]: Event system for real-time client communication
//! - [`display`]: Now-playing and queue text rendering
//! - [`api`]: HTTP/WebSocket surface over the registry
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from the systems
//! it drives:
//!
//! - [`AudioNode`](node::AudioNode): Plays, pauses and stops a room's audio
//! - [`VoiceGateway`](node::VoiceGateway): Joins and leaves voice channels
//! - [`MetadataResolver`](node::MetadataResolver): Turns queries into queue items
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//!
//! [`SimulatedNode`](node::SimulatedNode) is a timer-driven audio node for
//! the standalone server and tests.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod constants;
pub mod display;
pub mod error;
pub mod events;
pub mod node;
pub mod queue;
pub mod runtime;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, ErrorKind, JukeboxError, JukeboxResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter,
};
pub use node::{
    AudioNode, EndReason, MetadataResolver, NodeEvent, NodeEventKind, Resolution, SimulatedNode,
    VoiceGateway,
};
pub use queue::{LoopMode, QueueItem, QueueStore};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;
pub use utils::now_millis;

// Re-export service types
pub use services::{
    EnqueueOutcome, NodeEventProcessor, NowPlaying, PlayOutcome, PlaybackSession, SessionRegistry,
    SessionState, SessionSummary,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, node_event_channel, BootstrappedServices, Collaborators};

// Re-export API types
pub use api::{http::create_router, start_server, AppState, ServerError};
