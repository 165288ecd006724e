//! Notifications emitted by the player
//!
//! Events are delivered over a channel obtained from
//! [`AudioGraphManager::events`](crate::AudioGraphManager::events). The
//! player never blocks on delivery; events for a dropped receiver are
//! discarded.

use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// A source was decoded and is ready
    Loaded { duration_secs: f64 },

    /// Transport state changed
    StateChanged(PlaybackState),

    /// Position update from the frame loop, a pause or a seek
    TimeUpdate { position_secs: f64 },

    /// Playback reached the end of the source (once per play-through)
    Ended,

    VolumeChanged { volume: f32, muted: bool },

    EqualizerChanged { enabled: bool },

    /// A load or context failure, with a user-facing message
    Error(String),
}
