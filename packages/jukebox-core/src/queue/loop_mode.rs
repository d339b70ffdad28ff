use serde::{Deserialize, Serialize};

/// How the queue behaves when the active item ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopMode {
    /// Play through the queue once.
    #[default]
    Off,
    /// Replay the active item forever.
    RepeatItem,
    /// Move finished items to the back of the queue.
    RepeatQueue,
}

impl LoopMode {
    /// Mode that results from requesting `requested` while `self` is active.
    ///
    /// Requesting the mode that is already on turns looping off.
    pub fn toggled(self, requested: LoopMode) -> LoopMode {
        if self == requested {
            LoopMode::Off
        } else {
            requested
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::RepeatItem => "repeating the current track",
            Self::RepeatQueue => "repeating the queue",
        }
    }
}
