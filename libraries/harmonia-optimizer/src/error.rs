//! Error types for chunk planning, execution and monitoring

use harmonia_core::HarmoniaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optimizer errors
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Chunk size or overlap cannot produce a valid plan
    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),

    /// Two tasks claim the same result slot
    #[error("Duplicate chunk index {0}")]
    DuplicateChunkIndex(usize),

    /// A task's index has no result slot
    #[error("Chunk index {index} out of range for {len} chunks")]
    ChunkIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of one chunk task, kept in that chunk's result slot
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Chunk {index} failed: {message}")]
pub struct ChunkProcessingError {
    pub index: usize,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

impl From<OptimizerError> for HarmoniaError {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::Io(e) => HarmoniaError::Io(e),
            other => HarmoniaError::Optimizer(other.to_string()),
        }
    }
}

impl From<ChunkProcessingError> for HarmoniaError {
    fn from(err: ChunkProcessingError) -> Self {
        HarmoniaError::Optimizer(err.to_string())
    }
}
