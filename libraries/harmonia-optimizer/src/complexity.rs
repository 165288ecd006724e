//! Processing cost estimates from file size

use serde::{Deserialize, Serialize};

/// Files above this size never get chunks longer than [`LARGE_FILE_CHUNK_CAP_SECS`]
pub const LARGE_FILE_THRESHOLD_MB: f64 = 200.0;

pub const LARGE_FILE_CHUNK_CAP_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingComplexity {
    Low,
    Medium,
    High,
    Extreme,
}

/// Coarse cost class of a file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    pub complexity: ProcessingComplexity,
    pub estimated_time_secs: f64,
    pub recommended_chunk_secs: f64,
}

/// Classify a file by size in MB
///
/// | Size      | Class   | Time | Chunk |
/// |-----------|---------|------|-------|
/// | < 10 MB   | Low     | 5 s  | 60 s  |
/// | < 50 MB   | Medium  | 15 s | 30 s  |
/// | < 100 MB  | High    | 30 s | 15 s  |
/// | otherwise | Extreme | 60 s | 10 s  |
pub fn estimate_complexity(file_size_mb: f64) -> ComplexityEstimate {
    let (complexity, estimated_time_secs, recommended_chunk_secs) = if file_size_mb < 10.0 {
        (ProcessingComplexity::Low, 5.0, 60.0)
    } else if file_size_mb < 50.0 {
        (ProcessingComplexity::Medium, 15.0, 30.0)
    } else if file_size_mb < 100.0 {
        (ProcessingComplexity::High, 30.0, 15.0)
    } else {
        (ProcessingComplexity::Extreme, 60.0, 10.0)
    };

    ComplexityEstimate {
        complexity,
        estimated_time_secs,
        recommended_chunk_secs,
    }
}

/// Chunk length in seconds for a file of `file_size_mb`
///
/// Never longer than `configured_secs` nor than the size class allows, so
/// memory per chunk stays bounded whatever the input size.
pub fn chunk_secs_for_size(file_size_mb: f64, configured_secs: f64) -> f64 {
    let mut secs = configured_secs.min(estimate_complexity(file_size_mb).recommended_chunk_secs);
    if file_size_mb > LARGE_FILE_THRESHOLD_MB {
        secs = secs.min(LARGE_FILE_CHUNK_CAP_SECS);
    }
    secs
}
