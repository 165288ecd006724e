//! Graphic equalizer
//!
//! A fixed, ordered set of bands. Band `i` always drives filter `i`; the
//! count is chosen when the equalizer is built and never changes after.
//!
//! Disabling the equalizer keeps the stored gains and retargets every
//! filter to 0 dB, so the signal path stays connected and re-enabling
//! restores the same curve.

use super::biquad::{BiquadFilter, FilterKind};
use super::chain::AudioEffect;
use crate::error::{AudioError, Result};
use harmonia_core::EqualizerLayout;
use serde::{Deserialize, Serialize};

/// Largest boost or cut a band accepts, in dB
pub const MAX_BAND_GAIN_DB: f32 = 12.0;

/// Center frequencies of the 8-band layout
pub const RICH_FREQUENCIES: [f32; 8] = [
    60.0, 170.0, 310.0, 600.0, 1000.0, 3000.0, 6000.0, 12000.0,
];

/// Center frequencies of the 5-band layout
pub const SIMPLE_FREQUENCIES: [f32; 5] = [60.0, 250.0, 1000.0, 4000.0, 12000.0];

/// One equalizer band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    /// Center (or corner, for shelves) frequency in Hz
    pub center_frequency_hz: f32,
    /// Boost/cut in dB - private to keep it within ±12 dB
    gain_db: f32,
    /// Display label, e.g. "1 kHz"
    pub label: String,
}

impl EqualizerBand {
    /// Create a band at 0 dB labelled after its frequency
    pub fn new(center_frequency_hz: f32) -> Self {
        Self {
            center_frequency_hz,
            gain_db: 0.0,
            label: frequency_label(center_frequency_hz),
        }
    }

    /// Create a band with an explicit gain (clamped to ±12 dB)
    pub fn with_gain(center_frequency_hz: f32, gain_db: f32) -> Self {
        let mut band = Self::new(center_frequency_hz);
        band.set_gain_db(gain_db);
        band
    }

    /// Get the gain in dB
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Set the gain in dB (clamped to ±12 dB, NaN reads as 0)
    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = if gain_db.is_nan() {
            0.0
        } else {
            gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB)
        };
    }
}

/// "60 Hz", "1 kHz", "12 kHz"
fn frequency_label(hz: f32) -> String {
    if hz >= 1000.0 {
        let khz = hz / 1000.0;
        if (khz - khz.round()).abs() < f32::EPSILON {
            format!("{} kHz", khz.round() as u32)
        } else {
            format!("{khz:.1} kHz")
        }
    } else {
        format!("{} Hz", hz.round() as u32)
    }
}

/// Built-in gain curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualizerPreset {
    Flat,
    Rock,
    Pop,
    Jazz,
    Classical,
    /// 8-band layout only
    Vocal,
    /// 5-band layout only
    BassBoost,
}

impl EqualizerPreset {
    /// Gains for the 8-band layout
    pub fn gains_rich(&self) -> Option<[f32; 8]> {
        match self {
            Self::Flat => Some([0.0; 8]),
            Self::Rock => Some([4.0, 3.0, -1.0, -2.0, 1.0, 2.0, 4.0, 5.0]),
            Self::Pop => Some([-1.0, 2.0, 4.0, 4.0, 1.0, -1.0, -2.0, -1.0]),
            Self::Jazz => Some([3.0, 2.0, 1.0, 2.0, -1.0, -1.0, 2.0, 3.0]),
            Self::Classical => Some([4.0, 3.0, 2.0, 1.0, -1.0, -1.0, 2.0, 4.0]),
            Self::Vocal => Some([-2.0, -1.0, 2.0, 4.0, 4.0, 2.0, 1.0, -1.0]),
            Self::BassBoost => None,
        }
    }

    /// Gains for the 5-band layout
    pub fn gains_simple(&self) -> Option<[f32; 5]> {
        match self {
            Self::Flat => Some([0.0; 5]),
            Self::Rock => Some([5.0, 3.0, -1.0, 2.0, 6.0]),
            Self::Pop => Some([2.0, 4.0, 3.0, 1.0, 3.0]),
            Self::Jazz => Some([1.0, 2.0, 4.0, 2.0, 1.0]),
            Self::Classical => Some([0.0, 1.0, 2.0, 1.0, 2.0]),
            Self::BassBoost => Some([8.0, 6.0, 2.0, 0.0, 0.0]),
            Self::Vocal => None,
        }
    }

    fn gains_for(&self, band_count: usize) -> Option<Vec<f32>> {
        match band_count {
            8 => self.gains_rich().map(|g| g.to_vec()),
            5 => self.gains_simple().map(|g| g.to_vec()),
            _ => None,
        }
    }
}

/// Ordered band set applied to an [`Equalizer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerProfile {
    bands: Vec<EqualizerBand>,
}

impl EqualizerProfile {
    /// Flat profile over the given frequencies
    pub fn from_frequencies(frequencies: &[f32]) -> Self {
        Self {
            bands: frequencies.iter().copied().map(EqualizerBand::new).collect(),
        }
    }

    /// Build from explicit bands
    pub fn from_bands(bands: Vec<EqualizerBand>) -> Self {
        Self { bands }
    }

    /// Flat 8-band profile
    pub fn rich() -> Self {
        Self::from_frequencies(&RICH_FREQUENCIES)
    }

    /// Flat 5-band profile
    pub fn simple() -> Self {
        Self::from_frequencies(&SIMPLE_FREQUENCIES)
    }

    pub fn for_layout(layout: EqualizerLayout) -> Self {
        match layout {
            EqualizerLayout::Rich => Self::rich(),
            EqualizerLayout::Simple => Self::simple(),
        }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[EqualizerBand] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&EqualizerBand> {
        self.bands.get(index)
    }

    /// Stored gains in band order
    pub fn gains(&self) -> Vec<f32> {
        self.bands.iter().map(EqualizerBand::gain_db).collect()
    }

    /// Set one band's gain (clamped to ±12 dB)
    pub fn set_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        let count = self.bands.len();
        let band = self.bands.get_mut(index).ok_or_else(|| {
            AudioError::InvalidBand(format!("band {index} out of range for {count} bands"))
        })?;
        band.set_gain_db(gain_db);
        Ok(())
    }

    /// Overwrite every gain with a preset curve
    pub fn apply_preset(&mut self, preset: EqualizerPreset) -> Result<()> {
        let gains = preset.gains_for(self.bands.len()).ok_or_else(|| {
            AudioError::InvalidParameter(format!(
                "preset {preset:?} has no curve for {} bands",
                self.bands.len()
            ))
        })?;

        for (band, gain) in self.bands.iter_mut().zip(gains) {
            band.set_gain_db(gain);
        }
        Ok(())
    }

    /// Set every gain back to 0 dB
    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.set_gain_db(0.0);
        }
    }
}

/// N-band equalizer node
///
/// Filters are allocated once in [`Equalizer::new`]; processing never
/// allocates.
pub struct Equalizer {
    filters: Vec<BiquadFilter>,
    profile: EqualizerProfile,
    enabled: bool,
    peaking_q: f32,
    sample_rate: u32,
    needs_update: bool,
}

impl Equalizer {
    /// Build one filter per band of `profile`
    ///
    /// # Arguments
    /// * `profile` - Initial bands; fixes the band count for this node's lifetime
    /// * `peaking_q` - Q of the interior peaking bands
    pub fn new(profile: EqualizerProfile, peaking_q: f32) -> Self {
        Self {
            filters: (0..profile.len()).map(|_| BiquadFilter::new()).collect(),
            profile,
            enabled: true,
            peaking_q,
            sample_rate: 44_100,
            needs_update: true,
        }
    }

    pub fn band_count(&self) -> usize {
        self.filters.len()
    }

    /// Kind of filter driving band `index`
    pub fn filter_kind(&self, index: usize) -> Option<FilterKind> {
        (index < self.band_count()).then(|| FilterKind::for_band(index, self.band_count()))
    }

    /// Stored profile, unaffected by enable/disable
    pub fn profile(&self) -> &EqualizerProfile {
        &self.profile
    }

    /// Replace the stored profile and the enabled flag in one step
    ///
    /// Fails without touching anything when the band count differs.
    pub fn apply(&mut self, profile: &EqualizerProfile, enabled: bool) -> Result<()> {
        if profile.len() != self.band_count() {
            return Err(AudioError::InvalidBand(format!(
                "expected {} bands, got {}",
                self.band_count(),
                profile.len()
            )));
        }

        self.profile = profile.clone();
        self.enabled = enabled;
        self.needs_update = true;
        Ok(())
    }

    /// Gain currently applied by band `index`: the stored gain when enabled, else 0
    pub fn effective_gain_db(&self, index: usize) -> Option<f32> {
        self.profile
            .band(index)
            .map(|band| if self.enabled { band.gain_db() } else { 0.0 })
    }

    /// Applied gain of every band, in order
    pub fn effective_gains(&self) -> Vec<f32> {
        (0..self.band_count())
            .filter_map(|i| self.effective_gain_db(i))
            .collect()
    }

    /// Whether every filter is currently targeting a flat response
    pub fn is_flat(&self) -> bool {
        self.filters.iter().all(BiquadFilter::is_identity)
    }

    fn update_filters(&mut self) {
        if !self.needs_update {
            return;
        }

        let sr = self.sample_rate as f32;
        let count = self.band_count();

        for (index, filter) in self.filters.iter_mut().enumerate() {
            let Some(band) = self.profile.band(index) else {
                continue;
            };
            let gain = if self.enabled { band.gain_db() } else { 0.0 };
            filter.configure(
                FilterKind::for_band(index, count),
                sr,
                band.center_frequency_hz,
                self.peaking_q,
                gain,
            );
        }

        self.needs_update = false;
    }
}

impl AudioEffect for Equalizer {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.sample_rate != sample_rate {
            self.sample_rate = sample_rate;
            self.needs_update = true;
            self.update_filters();
            for filter in &mut self.filters {
                filter.reset();
            }
        }

        self.update_filters();

        for frame in buffer.chunks_exact_mut(2) {
            let mut left = frame[0];
            let mut right = frame[1];

            for filter in &mut self.filters {
                let (l, r) = filter.process_sample(left, right);
                left = l;
                right = r;
            }

            frame[0] = left;
            frame[1] = right;
        }
    }

    fn reset(&mut self) {
        self.needs_update = true;
        self.update_filters();

        for filter in &mut self.filters {
            filter.reset();
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.needs_update = true;
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        "Graphic EQ"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::{generate_sine, settled_rms};

    fn boosted_rich() -> EqualizerProfile {
        let mut profile = EqualizerProfile::rich();
        profile.apply_preset(EqualizerPreset::Rock).unwrap();
        profile
    }

    #[test]
    fn rich_layout_labels() {
        let labels: Vec<_> = EqualizerProfile::rich()
            .bands()
            .iter()
            .map(|b| b.label.clone())
            .collect();
        assert_eq!(
            labels,
            ["60 Hz", "170 Hz", "310 Hz", "600 Hz", "1 kHz", "3 kHz", "6 kHz", "12 kHz"]
        );
    }

    #[test]
    fn band_gain_is_clamped() {
        let band = EqualizerBand::with_gain(1000.0, 30.0);
        assert_eq!(band.gain_db(), MAX_BAND_GAIN_DB);

        let band = EqualizerBand::with_gain(1000.0, -30.0);
        assert_eq!(band.gain_db(), -MAX_BAND_GAIN_DB);

        let band = EqualizerBand::with_gain(1000.0, f32::NAN);
        assert_eq!(band.gain_db(), 0.0);
    }

    #[test]
    fn filter_kinds_follow_band_position() {
        let eq = Equalizer::new(EqualizerProfile::rich(), 1.0);
        assert_eq!(eq.filter_kind(0), Some(FilterKind::LowShelf));
        for i in 1..7 {
            assert_eq!(eq.filter_kind(i), Some(FilterKind::Peaking));
        }
        assert_eq!(eq.filter_kind(7), Some(FilterKind::HighShelf));
        assert_eq!(eq.filter_kind(8), None);
    }

    #[test]
    fn presets_match_layouts() {
        let mut rich = EqualizerProfile::rich();
        rich.apply_preset(EqualizerPreset::Vocal).unwrap();
        assert_eq!(rich.gains(), vec![-2.0, -1.0, 2.0, 4.0, 4.0, 2.0, 1.0, -1.0]);
        assert!(rich.apply_preset(EqualizerPreset::BassBoost).is_err());

        let mut simple = EqualizerProfile::simple();
        simple.apply_preset(EqualizerPreset::BassBoost).unwrap();
        assert_eq!(simple.gains(), vec![8.0, 6.0, 2.0, 0.0, 0.0]);

        simple.reset();
        assert!(simple.gains().iter().all(|g| *g == 0.0));
    }

    #[test]
    fn set_gain_out_of_range_index_fails() {
        let mut profile = EqualizerProfile::simple();
        assert!(matches!(
            profile.set_gain(5, 3.0),
            Err(AudioError::InvalidBand(_))
        ));
    }

    #[test]
    fn disable_zeroes_effective_gain_but_keeps_profile() {
        let mut eq = Equalizer::new(EqualizerProfile::rich(), 1.0);
        let profile = boosted_rich();

        eq.apply(&profile, false).unwrap();
        assert!(eq.effective_gains().iter().all(|g| *g == 0.0));
        assert_eq!(eq.profile(), &profile);

        eq.set_enabled(true);
        assert_eq!(eq.effective_gains(), profile.gains());
    }

    #[test]
    fn disabled_equalizer_targets_flat_response() {
        let mut eq = Equalizer::new(boosted_rich(), 1.0);
        let mut buffer = vec![0.0; 64];

        eq.process(&mut buffer, 44_100);
        assert!(!eq.is_flat());

        eq.set_enabled(false);
        eq.process(&mut buffer, 44_100);
        assert!(eq.is_flat());
    }

    #[test]
    fn apply_rejects_band_count_change() {
        let mut eq = Equalizer::new(EqualizerProfile::rich(), 1.0);
        let before = eq.profile().clone();

        assert!(eq.apply(&EqualizerProfile::simple(), true).is_err());
        assert_eq!(eq.profile(), &before);
    }

    #[test]
    fn flat_profile_passes_signal_through() {
        let mut eq = Equalizer::new(EqualizerProfile::rich(), 1.0);
        let mut buffer = generate_sine(440.0, 44_100, 0.1);
        let original = buffer.clone();

        eq.process(&mut buffer, 44_100);

        for (a, b) in buffer.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn low_shelf_boost_raises_bass() {
        let mut profile = EqualizerProfile::rich();
        profile.set_gain(0, 12.0).unwrap();
        let mut eq = Equalizer::new(profile, 1.0);
        eq.reset();

        let mut buffer = generate_sine(30.0, 44_100, 1.0);
        let before = settled_rms(&buffer);
        eq.process(&mut buffer, 44_100);

        assert!(settled_rms(&buffer) > before * 2.0);
    }

    #[test]
    fn high_shelf_cut_lowers_treble() {
        let mut profile = EqualizerProfile::rich();
        profile.set_gain(7, -12.0).unwrap();
        let mut eq = Equalizer::new(profile, 1.0);
        eq.reset();

        let mut buffer = generate_sine(16_000.0, 44_100, 0.5);
        let before = settled_rms(&buffer);
        eq.process(&mut buffer, 44_100);

        assert!(settled_rms(&buffer) < before * 0.5);
    }
}
