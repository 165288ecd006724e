/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Container or codec not recognised
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Band index or band count does not fit the equalizer
    #[error("Invalid band: {0}")]
    InvalidBand(String),

    /// Parameter outside its accepted range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// True when the input bytes could not be turned into samples
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::DecodeError(_))
    }
}

impl From<AudioError> for harmonia_core::HarmoniaError {
    fn from(err: AudioError) -> Self {
        harmonia_core::HarmoniaError::audio(err.to_string())
    }
}
