//! Master volume with a mute flag
//!
//! Level and mute are stored separately, so un-muting always restores the
//! last level exactly.

/// Linear volume controller
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume (clamped to 0.0-1.0)
    pub fn new(level: f32) -> Self {
        Self {
            level: clamp_level(level),
            muted: false,
        }
    }

    /// Set volume level (clamped to 0.0-1.0, NaN reads as 0)
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_level(level);
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain for the master node: 0.0 if muted, otherwise the level
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(0.7)
    }
}
