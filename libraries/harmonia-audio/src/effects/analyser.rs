//! Spectrum tap at the end of the chain
//!
//! Keeps the most recent `fft_size` output frames (downmixed to mono) and
//! turns them into magnitude bins on request. Audio passes through
//! untouched; the FFT only runs when a caller asks for data, never inside
//! `process`.

use super::chain::AudioEffect;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Frames per analysis window
pub const ANALYSER_FFT_SIZE: usize = 256;

/// Level mapped to byte 0
pub const ANALYSER_MIN_DECIBELS: f32 = -100.0;

/// Level mapped to byte 255
pub const ANALYSER_MAX_DECIBELS: f32 = -30.0;

/// Weight of the previous spectrum in each new one
pub const ANALYSER_SMOOTHING: f32 = 0.8;

/// Frequency analyser node
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    /// Blackman window, one coefficient per frame
    window: Vec<f32>,
    /// Ring of mono frames; the oldest sits at `write`
    history: Vec<f32>,
    write: usize,
    /// Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,
    smoothing: f32,
    enabled: bool,
}

impl Analyser {
    /// Create an analyser over `fft_size` frames (at least 2)
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            fft,
            window: blackman(fft_size),
            history: vec![0.0; fft_size],
            write: 0,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: ANALYSER_SMOOTHING,
            enabled: true,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.history.len()
    }

    /// Number of bins returned by the data accessors
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Set the smoothing constant, clamped to `0.0..=1.0`
    ///
    /// 0 reports each window on its own; values near 1 hold on to the past.
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, 1.0)
        } else {
            ANALYSER_SMOOTHING
        };
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Spectrum of the latest window in dB, `fft_size / 2` bins
    ///
    /// Bin `k` is centred on `k * sample_rate / fft_size` Hz. Silent bins
    /// read negative infinity. Every call folds the current window into the
    /// smoothed spectrum.
    pub fn frequency_data(&mut self) -> Vec<f32> {
        let n = self.history.len();
        let mut spectrum: Vec<Complex<f32>> = (0..n)
            .map(|i| {
                let sample = self.history[(self.write + i) % n];
                Complex::new(sample * self.window[i], 0.0)
            })
            .collect();
        self.fft.process(&mut spectrum);

        let scale = 1.0 / n as f32;
        let keep = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&spectrum) {
            *smoothed = keep * *smoothed + (1.0 - keep) * bin.norm() * scale;
        }

        self.smoothed
            .iter()
            .map(|m| {
                if *m > 0.0 {
                    20.0 * m.log10()
                } else {
                    f32::NEG_INFINITY
                }
            })
            .collect()
    }

    /// [`Self::frequency_data`] scaled onto `0..=255` between
    /// [`ANALYSER_MIN_DECIBELS`] and [`ANALYSER_MAX_DECIBELS`]
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let range = ANALYSER_MAX_DECIBELS - ANALYSER_MIN_DECIBELS;
        self.frequency_data()
            .into_iter()
            .map(|db| ((db - ANALYSER_MIN_DECIBELS) * 255.0 / range).clamp(0.0, 255.0) as u8)
            .collect()
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new(ANALYSER_FFT_SIZE)
    }
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size())
            .field("smoothing", &self.smoothing)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AudioEffect for Analyser {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        if !self.enabled {
            return;
        }

        let n = self.history.len();
        for frame in buffer.chunks_exact(2) {
            self.history[self.write] = 0.5 * (frame[0] + frame[1]);
            self.write = (self.write + 1) % n;
        }
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.write = 0;
    }

    /// A disabled analyser stops capturing and keeps its last window
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        "Analyser"
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;

    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::generate_sine;

    const RATE: u32 = 48_000;

    /// Frequency at the centre of bin `k`
    fn bin_hz(k: usize) -> f32 {
        k as f32 * RATE as f32 / ANALYSER_FFT_SIZE as f32
    }

    fn peak_bin(data: &[f32]) -> usize {
        data.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn passes_audio_through() {
        let mut analyser = Analyser::default();
        let original = generate_sine(440.0, RATE, 0.05);
        let mut buffer = original.clone();

        analyser.process(&mut buffer, RATE);
        assert_eq!(buffer, original);
    }

    #[test]
    fn sine_peaks_in_its_bin() {
        let mut analyser = Analyser::default();
        analyser.set_smoothing(0.0);
        assert_eq!(analyser.bin_count(), 128);

        for k in [4, 10, 37, 90] {
            let mut buffer = generate_sine(bin_hz(k), RATE, 0.1);
            analyser.process(&mut buffer, RATE);
            assert_eq!(peak_bin(&analyser.frequency_data()), k, "bin {k}");
        }
    }

    #[test]
    fn bytes_saturate_at_peak_and_stay_low_elsewhere() {
        let mut analyser = Analyser::default();
        analyser.set_smoothing(0.0);
        let mut buffer = generate_sine(bin_hz(20), RATE, 0.1);
        analyser.process(&mut buffer, RATE);

        let bytes = analyser.byte_frequency_data();
        assert_eq!(bytes.len(), 128);
        assert_eq!(bytes[20], 255);
        // The window only leaks two bins either side of a centred tone
        assert!(bytes[..15].iter().all(|b| *b < 40));
        assert!(bytes[26..].iter().all(|b| *b < 40));
    }

    #[test]
    fn silence_reads_as_floor() {
        let mut analyser = Analyser::default();
        assert!(analyser
            .frequency_data()
            .iter()
            .all(|db| *db == f32::NEG_INFINITY));
        assert!(analyser.byte_frequency_data().iter().all(|b| *b == 0));
    }

    #[test]
    fn smoothing_rises_gradually() {
        let mut analyser = Analyser::default();
        let mut buffer = generate_sine(bin_hz(10), RATE, 0.1);
        analyser.process(&mut buffer, RATE);

        let first = analyser.frequency_data()[10];
        let second = analyser.frequency_data()[10];
        assert!(second > first);

        // 0.2 of the full level on the first read is about -14 dB
        analyser.reset();
        analyser.set_smoothing(0.0);
        analyser.process(&mut buffer, RATE);
        let settled = analyser.frequency_data()[10];
        assert!((settled - first - 20.0 * 5.0f32.log10()).abs() < 0.1);
    }

    #[test]
    fn disabled_analyser_keeps_last_window() {
        let mut analyser = Analyser::default();
        analyser.set_smoothing(0.0);
        let mut tone = generate_sine(bin_hz(12), RATE, 0.1);
        analyser.process(&mut tone, RATE);

        analyser.set_enabled(false);
        let mut other = generate_sine(bin_hz(60), RATE, 0.1);
        analyser.process(&mut other, RATE);

        assert_eq!(peak_bin(&analyser.frequency_data()), 12);
    }
}
