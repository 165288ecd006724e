/// Core error types for Harmonia
use thiserror::Error;

/// Result type alias using `HarmoniaError`
pub type Result<T> = std::result::Result<T, HarmoniaError>;

/// Core error type for Harmonia
#[derive(Error, Debug)]
pub enum HarmoniaError {
    /// Audio decoding/processing errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Player or audio context errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Chunking, scheduling or monitoring errors
    #[error("Optimizer error: {0}")]
    Optimizer(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl HarmoniaError {
    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a playback error
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Create an optimizer error
    pub fn optimizer(msg: impl Into<String>) -> Self {
        Self::Optimizer(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<config::ConfigError> for HarmoniaError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
