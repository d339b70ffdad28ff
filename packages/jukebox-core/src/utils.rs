//! Shared utility functions.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{JukeboxError, JukeboxResult};

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (should never happen).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Runs a collaborator call with a time limit.
///
/// Collaborator errors convert into [`JukeboxError`]; an elapsed limit becomes
/// [`JukeboxError::Timeout`] naming `what`.
pub(crate) async fn with_timeout<T, E, F>(limit: Duration, what: &str, fut: F) -> JukeboxResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<JukeboxError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(JukeboxError::Timeout(format!(
            "{what} did not complete within {}ms",
            limit.as_millis()
        ))),
    }
}

/// Serializes a [`Duration`] as whole milliseconds.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
