//! Harmonia - Playback
//!
//! The player's real-time signal chain and transport.
//!
//! This crate provides:
//! - Audio graph: single-use buffer source, N-band equalizer, master gain, output analyser
//! - Audio graph manager: load, play, pause, stop, seek, volume, mute, equalizer
//! - Playback clock derived from the context clock (never accumulated)
//! - A frame loop publishing the position and detecting end of track, parked outside playback
//!
//! # Architecture
//!
//! The platform side is behind [`AudioContext`]. [`OfflineContext`] renders
//! on demand and works everywhere; the `desktop` feature adds
//! `CpalContext` on the default output device.
//!
//! # Example
//!
//! ```rust
//! use harmonia_playback::{AudioGraphManager, OfflineContext, PlayerOptions, PlaybackState};
//! use harmonia_core::{AudioBuffer, AudioFormat, AudioSource, SampleRate};
//!
//! let context = OfflineContext::new(44_100);
//! let mut player = AudioGraphManager::new(PlayerOptions::default(), context.factory());
//!
//! // Ten seconds of silence
//! let buffer = AudioBuffer::new(
//!     vec![0.0; 2 * 441_000],
//!     AudioFormat::stereo_f32(SampleRate::CD_QUALITY),
//! );
//! player.load_source(AudioSource::new(buffer, 2));
//!
//! player.play().unwrap();
//! context.advance(2.0);
//! player.pause();
//!
//! assert_eq!(player.playback_state(), PlaybackState::Paused);
//! assert!((player.state().current_time_secs - 2.0).abs() < 1e-3);
//! ```

mod clock;
mod context;
#[cfg(feature = "desktop")]
mod desktop;
mod error;
mod events;
mod frame_loop;
mod graph;
mod manager;
pub mod types;
mod volume;

// Public exports
pub use clock::PlaybackClock;
pub use context::{AudioContext, ContextFactory, ContextState, OfflineContext, RENDER_QUANTUM};
#[cfg(feature = "desktop")]
pub use desktop::CpalContext;
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use frame_loop::{FrameLoop, SharedPlayer, DISPLAY_FRAME};
pub use graph::{lock_graph, AudioGraph, BufferSource, SharedGraph, SourceState};
pub use manager::AudioGraphManager;
pub use types::{AudioGraphState, PlaybackState, PlayerOptions};
pub use volume::Volume;
