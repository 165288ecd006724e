/// Second-order filter section used by every equalizer band
///
/// Coefficients follow the RBJ audio EQ cookbook. Shelves use a slope of
/// 1.0, matching the shelving filters of browser audio graphs, so the same
/// gain settings sound the same on both.
use serde::{Deserialize, Serialize};

/// Response shape of one band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Boosts/cuts everything below the corner frequency
    LowShelf,
    /// Boosts/cuts around the center frequency with Q bandwidth
    Peaking,
    /// Boosts/cuts everything above the corner frequency
    HighShelf,
}

impl FilterKind {
    /// Kind of the band at `index` in a chain of `band_count` bands
    ///
    /// The first band is a low shelf, the last a high shelf, everything in
    /// between peaks. A single band counts as the first band.
    pub fn for_band(index: usize, band_count: usize) -> Self {
        if index == 0 {
            Self::LowShelf
        } else if index + 1 == band_count {
            Self::HighShelf
        } else {
            Self::Peaking
        }
    }
}

/// Shelf slope (S) used by both shelving kinds
const SHELF_SLOPE: f32 = 1.0;

/// Per-sample proportion by which active coefficients approach their
/// target. About 10ms to settle at 44.1kHz.
const SMOOTH_COEFF: f32 = 0.002;

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Stereo biquad with coefficient smoothing
///
/// Parameter changes set a target; the active coefficients glide toward it
/// one sample at a time so gain moves never click.
#[derive(Debug, Clone)]
pub(crate) struct BiquadFilter {
    target: Coefficients,
    active: Coefficients,
    left: ChannelState,
    right: ChannelState,
}

impl BiquadFilter {
    /// Create a pass-through filter
    pub(crate) fn new() -> Self {
        Self {
            target: Coefficients::IDENTITY,
            active: Coefficients::IDENTITY,
            left: ChannelState::default(),
            right: ChannelState::default(),
        }
    }

    /// Retarget the filter
    ///
    /// # Arguments
    /// * `kind` - Band shape
    /// * `sample_rate` - Rendering rate in Hz
    /// * `frequency` - Center/corner frequency in Hz (held below 0.45 * sample rate)
    /// * `q` - Bandwidth of peaking bands; ignored by shelves
    /// * `gain_db` - Boost or cut in dB
    pub(crate) fn configure(
        &mut self,
        kind: FilterKind,
        sample_rate: f32,
        frequency: f32,
        q: f32,
        gain_db: f32,
    ) {
        if sample_rate < 1.0 {
            return;
        }

        let a = 10.0_f32.powf(gain_db / 40.0);
        let clamped_freq = frequency.clamp(1.0, sample_rate * 0.45);
        let omega = 2.0 * std::f32::consts::PI * clamped_freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();

        self.target = match kind {
            FilterKind::Peaking => {
                let alpha = sin_omega / (2.0 * q);
                Coefficients::normalized(
                    1.0 + alpha * a,
                    -2.0 * cos_omega,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_omega,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                let beta = 2.0 * a.sqrt() * shelf_alpha(a, sin_omega);
                Coefficients::normalized(
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
                    (a + 1.0) + (a - 1.0) * cos_omega + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - beta,
                )
            }
            FilterKind::HighShelf => {
                let beta = 2.0 * a.sqrt() * shelf_alpha(a, sin_omega);
                Coefficients::normalized(
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - beta),
                    (a + 1.0) - (a - 1.0) * cos_omega + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - beta,
                )
            }
        };
    }

    #[inline]
    fn smooth_coefficients(&mut self) {
        let t = self.target;
        let c = &mut self.active;
        c.b0 += SMOOTH_COEFF * (t.b0 - c.b0);
        c.b1 += SMOOTH_COEFF * (t.b1 - c.b1);
        c.b2 += SMOOTH_COEFF * (t.b2 - c.b2);
        c.a1 += SMOOTH_COEFF * (t.a1 - c.a1);
        c.a2 += SMOOTH_COEFF * (t.a2 - c.a2);
    }

    /// Process a stereo sample pair (left, right)
    #[inline]
    pub(crate) fn process_sample(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.smooth_coefficients();
        let c = self.active;
        (
            Self::tick(&c, &mut self.left, left),
            Self::tick(&c, &mut self.right, right),
        )
    }

    #[inline]
    fn tick(c: &Coefficients, state: &mut ChannelState, input: f32) -> f32 {
        let mut out = c.b0 * input + c.b1 * state.x1 + c.b2 * state.x2
            - c.a1 * state.y1
            - c.a2 * state.y2;

        // Flush denormals
        if out.abs() < 1e-15 {
            out = 0.0;
        }

        state.x2 = state.x1;
        state.x1 = input;
        state.y2 = state.y1;
        state.y1 = out;
        out
    }

    /// Clear history and jump straight to the target coefficients
    pub(crate) fn reset(&mut self) {
        self.left = ChannelState::default();
        self.right = ChannelState::default();
        self.active = self.target;
    }

    /// Whether the target response is flat (numerator equals denominator)
    pub(crate) fn is_identity(&self) -> bool {
        let t = self.target;
        (t.b0 - 1.0).abs() < 1e-6 && (t.b1 - t.a1).abs() < 1e-6 && (t.b2 - t.a2).abs() < 1e-6
    }
}

fn shelf_alpha(a: f32, sin_omega: f32) -> f32 {
    sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_kinds_by_position() {
        assert_eq!(FilterKind::for_band(0, 8), FilterKind::LowShelf);
        assert_eq!(FilterKind::for_band(3, 8), FilterKind::Peaking);
        assert_eq!(FilterKind::for_band(7, 8), FilterKind::HighShelf);
        assert_eq!(FilterKind::for_band(0, 1), FilterKind::LowShelf);
        assert_eq!(FilterKind::for_band(1, 2), FilterKind::HighShelf);
    }

    #[test]
    fn zero_gain_is_identity_for_every_kind() {
        for kind in [FilterKind::LowShelf, FilterKind::Peaking, FilterKind::HighShelf] {
            let mut filter = BiquadFilter::new();
            filter.configure(kind, 44_100.0, 1000.0, 1.0, 0.0);
            assert!(filter.is_identity(), "{kind:?} at 0 dB should pass through");
        }
    }

    #[test]
    fn boosted_peaking_is_not_identity() {
        let mut filter = BiquadFilter::new();
        filter.configure(FilterKind::Peaking, 44_100.0, 1000.0, 1.0, 6.0);
        assert!(!filter.is_identity());
    }

    #[test]
    fn invalid_sample_rate_leaves_filter_untouched() {
        let mut filter = BiquadFilter::new();
        filter.configure(FilterKind::Peaking, 0.0, 1000.0, 1.0, 6.0);
        assert!(filter.is_identity());
    }

    #[test]
    fn output_stays_finite_near_nyquist() {
        let mut filter = BiquadFilter::new();
        filter.configure(FilterKind::HighShelf, 44_100.0, 40_000.0, 1.0, 12.0);
        filter.reset();

        for i in 0..4096 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let (l, r) = filter.process_sample(x, x);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
