//! Chunk planner
//!
//! Splits a decoded source into overlapping time windows so large files can
//! be processed with bounded memory. Window `i` starts at `t = i * size`
//! and spans `[max(0, t - overlap), min(duration, t + size)]`; `t` is
//! computed from the index, never accumulated, so long files do not drift.

use crate::complexity::chunk_secs_for_size;
use crate::error::{OptimizerError, Result};
use crate::monitor::{PerformanceMetrics, BYTES_PER_MB};
use harmonia_core::{AudioSource, ChunkingSettings};
use serde::{Deserialize, Serialize};

/// Bytes per sample in chunk payloads (little-endian f32)
pub const BYTES_PER_SAMPLE: usize = 4;

/// How a source is cut and how many chunks run at once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    pub chunk_size_secs: f64,
    pub overlap_secs: f64,
    pub max_concurrent: usize,
}

impl ChunkingOptions {
    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size_secs: settings.chunk_size_secs,
            overlap_secs: settings.overlap_secs,
            max_concurrent: settings.max_concurrent,
        }
    }

    /// Shrink the chunk length for a file of `file_size_mb`
    ///
    /// The overlap is reduced too when it would no longer fit in a chunk.
    pub fn for_file_size(self, file_size_mb: f64) -> Self {
        self.with_chunk_secs(chunk_secs_for_size(file_size_mb, self.chunk_size_secs))
    }

    /// Size chunks from the monitor's recommended chunk size
    ///
    /// `recommended_chunk_size_mb` becomes seconds through the file's average
    /// byte rate (`duration_secs / file_size_mb`), then gets the same caps as
    /// [`Self::for_file_size`]. Without a usable size or duration this is
    /// just `for_file_size`.
    pub fn for_metrics(self, metrics: &PerformanceMetrics, duration_secs: f64) -> Self {
        let capped = chunk_secs_for_size(metrics.file_size_mb, self.chunk_size_secs);
        let usable = metrics.file_size_mb > 0.0
            && metrics.recommended_chunk_size_mb > 0.0
            && duration_secs.is_finite()
            && duration_secs > 0.0;
        if !usable {
            return self.with_chunk_secs(capped);
        }

        let secs_per_mb = duration_secs / metrics.file_size_mb;
        let secs = (metrics.recommended_chunk_size_mb * secs_per_mb).min(capped);
        tracing::debug!(
            recommended_chunk_size_mb = metrics.recommended_chunk_size_mb,
            chunk_size_secs = secs,
            "Chunk length from metrics"
        );
        self.with_chunk_secs(secs)
    }

    fn with_chunk_secs(self, chunk_size_secs: f64) -> Self {
        let overlap_secs = if self.overlap_secs < chunk_size_secs {
            self.overlap_secs
        } else {
            chunk_size_secs / 4.0
        };

        Self {
            chunk_size_secs,
            overlap_secs,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.chunk_size_secs.is_finite() || self.chunk_size_secs <= 0.0 {
            return Err(OptimizerError::InvalidChunking(format!(
                "chunk size must be positive, got {}",
                self.chunk_size_secs
            )));
        }
        if !self.overlap_secs.is_finite() || self.overlap_secs < 0.0 {
            return Err(OptimizerError::InvalidChunking(format!(
                "overlap must be non-negative, got {}",
                self.overlap_secs
            )));
        }
        if self.overlap_secs >= self.chunk_size_secs {
            return Err(OptimizerError::InvalidChunking(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_secs, self.chunk_size_secs
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self::from_settings(&ChunkingSettings::default())
    }
}

/// Time range of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkWindow {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// One segment of a source, ready to be processed independently
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Interleaved little-endian f32 samples
    pub data: Vec<u8>,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Position in emission order, zero-based
    pub index: usize,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Decode the payload back into interleaved samples
    pub fn samples(&self) -> Vec<f32> {
        self.data
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.data.len() / BYTES_PER_SAMPLE / usize::from(channels),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Plan the windows for a source of `duration_secs`
///
/// An empty source yields no windows. The last window always ends exactly
/// at `duration_secs`, however short it is.
pub fn plan_windows(duration_secs: f64, options: &ChunkingOptions) -> Result<Vec<ChunkWindow>> {
    options.validate()?;
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(OptimizerError::InvalidChunking(format!(
            "duration must be finite and non-negative, got {duration_secs}"
        )));
    }

    let size = options.chunk_size_secs;
    let overlap = options.overlap_secs;
    let mut windows = Vec::new();

    loop {
        let index = windows.len();
        let t = index as f64 * size;
        if t >= duration_secs {
            break;
        }

        windows.push(ChunkWindow {
            index,
            start_secs: (t - overlap).max(0.0),
            end_secs: (t + size).min(duration_secs),
        });
    }

    Ok(windows)
}

/// Cut `source` into chunks
///
/// Sample ranges are `floor(start * rate)..floor(end * rate)`, except that
/// the last chunk always reaches the final frame.
pub fn plan_chunks(source: &AudioSource, options: &ChunkingOptions) -> Result<Vec<AudioChunk>> {
    let windows = plan_windows(source.duration_secs(), options)?;

    let buffer = source.buffer();
    let channels = usize::from(source.channels());
    let rate = f64::from(source.sample_rate().as_hz());
    let total_frames = source.frames();
    let last = windows.len().saturating_sub(1);

    let chunks: Vec<AudioChunk> = windows
        .iter()
        .map(|window| {
            let start_frame = ((window.start_secs * rate).floor() as usize).min(total_frames);
            let end_frame = if window.index == last {
                total_frames
            } else {
                ((window.end_secs * rate).floor() as usize).min(total_frames)
            };

            let samples = &buffer.samples[start_frame * channels..end_frame * channels];
            let mut data = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
            for sample in samples {
                data.extend_from_slice(&sample.to_le_bytes());
            }

            AudioChunk {
                data,
                start_secs: window.start_secs,
                end_secs: window.end_secs,
                index: window.index,
                channels: source.channels(),
                sample_rate: source.sample_rate().as_hz(),
            }
        })
        .collect();

    tracing::debug!(
        chunks = chunks.len(),
        chunk_size_secs = options.chunk_size_secs,
        overlap_secs = options.overlap_secs,
        duration_secs = source.duration_secs(),
        "Planned chunks"
    );

    Ok(chunks)
}

/// Fixed-size slice of an undecoded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteChunk {
    pub index: usize,
    /// Byte offset of `data` in the whole payload
    pub offset: usize,
    pub data: Vec<u8>,
}

/// Cut `data` into pieces of `chunk_size_mb`; the last one may be shorter
pub fn split_bytes(data: &[u8], chunk_size_mb: f64) -> Result<Vec<ByteChunk>> {
    let size = (chunk_size_mb * BYTES_PER_MB).floor();
    if !size.is_finite() || size < 1.0 {
        return Err(OptimizerError::InvalidChunking(format!(
            "byte chunk size must be at least one byte, got {chunk_size_mb} MB"
        )));
    }
    let size = size as usize;

    Ok(data
        .chunks(size)
        .enumerate()
        .map(|(index, piece)| ByteChunk {
            index,
            offset: index * size,
            data: piece.to_vec(),
        })
        .collect())
}
