//! Error types for the transformation API client.

use harmonia_core::HarmoniaError;
use thiserror::Error;

/// Errors that can occur when talking to the transformation backend.
#[derive(Error, Debug)]
pub enum TransformClientError {
    /// Request could not be sent or the connection dropped
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend reported `status: error` for a task
    #[error("Transformation failed: {message}")]
    RemoteTransform { message: String },

    /// Backend answered with a non-success HTTP status
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// File not found for upload
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// IO error during upload/download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transformation client operations.
pub type Result<T> = std::result::Result<T, TransformClientError>;

impl From<TransformClientError> for HarmoniaError {
    fn from(err: TransformClientError) -> Self {
        match err {
            TransformClientError::Io(e) => HarmoniaError::Io(e),
            TransformClientError::InvalidUrl(msg) => HarmoniaError::Config(msg),
            TransformClientError::FileNotFound(path) => {
                HarmoniaError::InvalidInput(format!("File not found: {}", path))
            }
            other => HarmoniaError::Network(other.to_string()),
        }
    }
}
