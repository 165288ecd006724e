/// Master gain node
use super::chain::AudioEffect;

/// Per-sample proportion by which the applied gain approaches its target
const RAMP_COEFF: f32 = 0.005;

/// Linear output gain with a short exponential ramp on every change
///
/// [`GainNode::gain`] reports the target, which is what the rest of the
/// player reasons about; the ramp only exists inside `process`.
#[derive(Debug, Clone)]
pub struct GainNode {
    target: f32,
    current: f32,
    enabled: bool,
}

impl GainNode {
    /// Create a node already settled at `gain`
    pub fn new(gain: f32) -> Self {
        let gain = sanitize(gain);
        Self {
            target: gain,
            current: gain,
            enabled: true,
        }
    }

    /// Target linear gain
    pub fn gain(&self) -> f32 {
        if self.enabled {
            self.target
        } else {
            1.0
        }
    }

    /// Set the target linear gain (negative or non-finite values become 0)
    pub fn set_gain(&mut self, gain: f32) {
        self.target = sanitize(gain);
    }
}

fn sanitize(gain: f32) -> f32 {
    if gain.is_finite() {
        gain.max(0.0)
    } else {
        0.0
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioEffect for GainNode {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        let target = self.gain();
        for frame in buffer.chunks_exact_mut(2) {
            self.current += RAMP_COEFF * (target - self.current);
            frame[0] *= self.current;
            frame[1] *= self.current;
        }
    }

    fn reset(&mut self) {
        self.current = self.gain();
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        "Master Gain"
    }
}
