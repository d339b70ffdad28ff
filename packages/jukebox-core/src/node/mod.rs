//! External collaborators: audio node, voice gateway and metadata resolver.

pub mod error;
pub mod simulated;
pub mod traits;
pub mod types;

pub use error::{
    GatewayError, GatewayResult, NodeError, NodeResult, ResolveError, ResolveResult,
};
pub use simulated::SimulatedNode;
pub use traits::{AudioNode, MetadataResolver, VoiceGateway};
pub use types::{EndReason, ExceptionSeverity, NodeEvent, NodeEventKind, Resolution};
