//! Error types for the player

use harmonia_audio::AudioError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Input bytes are not decodable audio
    #[error("Decode error: {0}")]
    DecodeError(#[source] AudioError),

    /// The platform refused to create or resume the audio context
    #[error("Audio context unavailable: {0}")]
    AudioContextUnavailable(String),

    /// Operation needs a loaded source
    #[error("No audio source loaded")]
    NoSourceLoaded,

    /// Source nodes play once; a stopped node must be replaced
    #[error("Source node already started")]
    SourceAlreadyStarted,

    /// The graph already has a live source
    #[error("A source is already connected to the graph")]
    SourceAlreadyConnected,

    /// Profile does not match the equalizer built into the graph
    #[error("Equalizer has {expected} bands, profile has {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    /// The direct engine has no filter chain
    #[error("Equalizer is not available on the direct engine")]
    EqualizerUnavailable,
}

impl From<PlaybackError> for harmonia_core::HarmoniaError {
    fn from(err: PlaybackError) -> Self {
        harmonia_core::HarmoniaError::playback(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
