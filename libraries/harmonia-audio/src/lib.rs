//! Harmonia Audio
//!
//! Decoding and the processing nodes that make up the player's signal chain:
//! - **Decoder**: container/codec probing with Symphonia, folded to interleaved stereo f32
//! - **Equalizer**: N-band biquad chain (low shelf, peaking bands, high shelf)
//! - **Gain**: master gain with a short ramp on every change
//! - **Analyser**: FFT magnitude bins of the output, computed on request
//!
//! All nodes implement [`AudioEffect`] and operate in place on interleaved
//! stereo buffers.

#![forbid(unsafe_code)]

pub mod decoder;
pub mod effects;
pub mod error;

pub use decoder::SymphoniaDecoder;
pub use effects::{
    Analyser, AudioEffect, EqualizerBand, EqualizerPreset, EqualizerProfile, Equalizer, FilterKind,
    GainNode, ANALYSER_FFT_SIZE, MAX_BAND_GAIN_DB,
};
pub use error::{AudioError, Result};
