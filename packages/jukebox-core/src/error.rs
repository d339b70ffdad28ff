//! Centralized error types for the Jukebox core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Classifies every failure into the user-input / resolution / transport taxonomy
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::node::{GatewayError, NodeError, ResolveError};

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoPlayer(_) => "node_no_player",
            Self::Rejected(_) => "node_rejected",
            Self::Unreachable(_) => "node_unreachable",
        }
    }
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        match self {
            Self::Join { .. } => "voice_join_failed",
            Self::Leave(_) => "voice_leave_failed",
        }
    }
}

impl ErrorCode for ResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => "load_failed",
            Self::Unavailable(_) => "resolver_unavailable",
        }
    }
}

/// Broad class of a failure, used by callers to decide how to surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Caller did something that cannot work right now. No state changed.
    UserInput,
    /// The resolver failed or found nothing. Queue unchanged.
    Resolution,
    /// A call to the audio node or the voice gateway failed or timed out.
    Transport,
    /// Configuration or invariant problem inside the core.
    Internal,
}

/// Application-wide error type for the Jukebox core.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum JukeboxError {
    /// The requester is not connected to a voice channel.
    #[error("You must be connected to a voice channel")]
    NotInVoiceChannel,

    /// The room has a session but nothing is currently playing.
    #[error("Nothing is playing in room {0}")]
    NothingPlaying(String),

    /// The room has no playback session.
    #[error("No active session for room {0}")]
    NoSession(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The resolver found nothing for the query.
    #[error("No matches found for: {0}")]
    NoMatches(String),

    /// The resolver failed while loading the query.
    #[error("Failed to resolve: {0}")]
    Resolution(String),

    /// A call to the audio node failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Joining or leaving a voice channel failed.
    #[error("Voice gateway error: {0}")]
    VoiceGateway(String),

    /// A collaborator call did not complete within its time limit.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JukeboxError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInVoiceChannel => "not_in_voice_channel",
            Self::NothingPlaying(_) => "nothing_playing",
            Self::NoSession(_) => "no_session",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NoMatches(_) => "no_matches",
            Self::Resolution(_) => "resolution_failed",
            Self::Transport(_) => "transport_error",
            Self::VoiceGateway(_) => "voice_gateway_error",
            Self::Timeout(_) => "timeout",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns the taxonomy class of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInVoiceChannel
            | Self::NothingPlaying(_)
            | Self::NoSession(_)
            | Self::InvalidRequest(_) => ErrorKind::UserInput,
            Self::NoMatches(_) | Self::Resolution(_) => ErrorKind::Resolution,
            Self::Transport(_) | Self::VoiceGateway(_) | Self::Timeout(_) => ErrorKind::Transport,
            Self::Configuration(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotInVoiceChannel | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoSession(_) | Self::NoMatches(_) => StatusCode::NOT_FOUND,
            Self::NothingPlaying(_) => StatusCode::CONFLICT,
            Self::Resolution(_) | Self::Transport(_) | Self::VoiceGateway(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type JukeboxResult<T> = Result<T, JukeboxError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    kind: ErrorKind,
    message: String,
    status: u16,
}

impl IntoResponse for JukeboxError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            kind: self.kind(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<NodeError> for JukeboxError {
    fn from(err: NodeError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<GatewayError> for JukeboxError {
    fn from(err: GatewayError) -> Self {
        Self::VoiceGateway(err.to_string())
    }
}

impl From<ResolveError> for JukeboxError {
    fn from(err: ResolveError) -> Self {
        Self::Resolution(err.to_string())
    }
}
