//! Harmonia Core
//!
//! Platform-agnostic building blocks shared by every Harmonia library.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio Types**: `AudioBuffer`, `AudioFormat`, `SampleRate`, `AudioSource`
//! - **Configuration**: `HarmoniaConfig`, loaded from a file and `HARMONIA_*` environment variables
//! - **Error Handling**: Unified `HarmoniaError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use harmonia_core::{AudioBuffer, AudioFormat, AudioSource, SampleRate};
//!
//! let format = AudioFormat::new(SampleRate::CD_QUALITY, 2, 32);
//! let buffer = AudioBuffer::new(vec![0.0; 88_200], format);
//! let source = AudioSource::new(buffer, 2);
//!
//! assert!((source.duration_secs() - 1.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ChunkingSettings, EngineKind, EqualizerLayout, HarmoniaConfig, OptimizerSettings,
    PlayerSettings, ServerSettings,
};
pub use error::{HarmoniaError, Result};
pub use types::{AudioBuffer, AudioFormat, AudioSource, SampleRate};
