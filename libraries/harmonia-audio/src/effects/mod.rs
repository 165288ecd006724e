//! Signal chain nodes
//!
//! Every node operates on interleaved stereo f32 samples in place.
//!
//! Available nodes:
//! - **Equalizer**: N-band graphic equalizer built from biquad sections
//! - **GainNode**: master output gain
//! - **Analyser**: pass-through spectrum tap for visualization

mod analyser;
mod biquad;
mod chain;
mod equalizer;
mod gain;

pub use analyser::{
    Analyser, ANALYSER_FFT_SIZE, ANALYSER_MAX_DECIBELS, ANALYSER_MIN_DECIBELS, ANALYSER_SMOOTHING,
};
pub use biquad::FilterKind;
pub use chain::AudioEffect;
pub use equalizer::{
    EqualizerBand, EqualizerPreset, EqualizerProfile, Equalizer, MAX_BAND_GAIN_DB,
    RICH_FREQUENCIES, SIMPLE_FREQUENCIES,
};
pub use gain::GainNode;

#[cfg(test)]
pub(crate) mod tests {
    /// Generate a stereo sine wave for testing
    pub(crate) fn generate_sine(freq: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        let mut samples = Vec::with_capacity(num_samples * 2);

        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * freq * t).sin();
            samples.push(sample);
            samples.push(sample);
        }

        samples
    }

    /// RMS of the second half of a buffer, after filters have settled
    pub(crate) fn settled_rms(buffer: &[f32]) -> f32 {
        let tail = &buffer[buffer.len() / 2..];
        (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }
}
