//! Core types for the player

use harmonia_audio::EqualizerProfile;
use harmonia_core::{EngineKind, PlayerSettings};
use serde::{Deserialize, Serialize};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// At offset zero, or at a seeked offset with nothing playing
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Snapshot of everything a host UI renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioGraphState {
    pub is_playing: bool,

    /// Always within `[0, duration_secs]`
    pub current_time_secs: f64,

    pub duration_secs: f64,

    /// Stored level, unaffected by mute
    pub volume: f32,

    pub muted: bool,

    pub is_loading: bool,

    /// User-facing message of the last failed operation
    pub error: Option<String>,
}

/// How a player instance is built
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    pub engine: EngineKind,

    /// Initial bands; fixes the band count of the graph
    pub profile: EqualizerProfile,

    /// Q of the interior peaking bands
    pub peaking_q: f32,

    pub initial_volume: f32,
}

impl PlayerOptions {
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        Self {
            engine: settings.engine,
            profile: EqualizerProfile::for_layout(settings.equalizer),
            peaking_q: settings.peaking_q,
            initial_volume: settings.default_volume,
        }
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_settings(&PlayerSettings::default())
    }
}
