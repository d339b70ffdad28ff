//! Voice gateway for headless runs.
//!
//! There is no chat platform to connect to, so joins and leaves are only
//! tracked and logged.

use std::collections::HashMap;

use async_trait::async_trait;
use jukebox_core::node::GatewayResult;
use jukebox_core::VoiceGateway;
use parking_lot::Mutex;

#[derive(Default)]
pub struct LoggingVoiceGateway {
    /// Room to the voice channel it is connected to.
    connected: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl LoggingVoiceGateway {
    fn channel(&self, room_id: &str) -> Option<String> {
        self.connected.lock().get(room_id).cloned()
    }
}

#[async_trait]
impl VoiceGateway for LoggingVoiceGateway {
    async fn join(&self, room_id: &str, voice_channel_id: &str) -> GatewayResult<()> {
        let previous = self
            .connected
            .lock()
            .insert(room_id.to_string(), voice_channel_id.to_string());
        match previous {
            Some(old) if old != voice_channel_id => log::info!(
                "[Gateway] Room {} moved from voice channel {} to {}",
                room_id,
                old,
                voice_channel_id
            ),
            _ => log::info!("[Gateway] Joined voice channel {} in room {}", voice_channel_id, room_id),
        }
        Ok(())
    }

    async fn leave(&self, room_id: &str) -> GatewayResult<()> {
        if let Some(channel) = self.connected.lock().remove(room_id) {
            log::info!("[Gateway] Left voice channel {} in room {}", channel, room_id);
        }
        Ok(())
    }
}
