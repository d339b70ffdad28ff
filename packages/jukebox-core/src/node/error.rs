//! Error types reported by the external collaborators.

use thiserror::Error;

/// Errors from the audio node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("No player exists for room {0}")]
    NoPlayer(String),

    #[error("Node rejected request: {0}")]
    Rejected(String),

    #[error("Node unreachable: {0}")]
    Unreachable(String),
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Errors from the voice gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to join voice channel {channel}: {reason}")]
    Join { channel: String, reason: String },

    #[error("Failed to leave voice channel: {0}")]
    Leave(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from the metadata resolver.
///
/// "Nothing matched" is not an error; it is reported as
/// [`Resolution::NoMatches`](super::Resolution::NoMatches).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to load {query}: {message}")]
    LoadFailed { query: String, message: String },

    #[error("Resolver unavailable: {0}")]
    Unavailable(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
