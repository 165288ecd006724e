//! Audio graph manager - core orchestration
//!
//! Owns the context, the graph, the decoded source and the playback clock,
//! and is the only thing that mutates any of them. Hosts drive it with
//! explicit calls (`play`, `set_volume`, ...) and one `tick()` per display
//! frame; everything observable comes back as [`PlayerEvent`]s.

use crate::{
    clock::PlaybackClock,
    context::{AudioContext, ContextFactory, ContextState},
    error::{PlaybackError, Result},
    events::PlayerEvent,
    graph::{lock_graph, AudioGraph, BufferSource, SharedGraph},
    types::{AudioGraphState, PlaybackState, PlayerOptions},
    volume::Volume,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use harmonia_audio::{AudioEffect, EqualizerProfile, SymphoniaDecoder};
use harmonia_core::{AudioSource, EngineKind};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Handle of a requested frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameRequest(u64);

/// Player facade over the processing graph
pub struct AudioGraphManager {
    options: PlayerOptions,
    factory: Box<dyn ContextFactory>,
    context: Option<Box<dyn AudioContext>>,
    graph: Option<SharedGraph>,
    decoder: SymphoniaDecoder,

    /// Decoded source; at most one per player
    source: Option<AudioSource>,
    clock: PlaybackClock,
    volume: Volume,

    /// Stored gains, kept while the equalizer is disabled
    profile: EqualizerProfile,
    equalizer_enabled: bool,

    /// Last position published to the host
    current_time: f64,
    is_loading: bool,
    error: Option<String>,

    pending_frame: Option<FrameRequest>,
    next_frame_id: u64,
    /// Woken on every frame request
    frame_signal: Arc<Notify>,

    event_tx: Sender<PlayerEvent>,
    event_rx: Receiver<PlayerEvent>,
}

impl AudioGraphManager {
    /// Create a player; no context is opened until it is first needed
    ///
    /// # Arguments
    /// * `options` - Engine, band layout and initial volume
    /// * `factory` - Opens the platform audio context
    pub fn new(options: PlayerOptions, factory: impl ContextFactory + 'static) -> Self {
        let (event_tx, event_rx) = unbounded();

        Self {
            volume: Volume::new(options.initial_volume),
            profile: options.profile.clone(),
            options,
            factory: Box::new(factory),
            context: None,
            graph: None,
            decoder: SymphoniaDecoder::new(),
            source: None,
            clock: PlaybackClock::new(),
            equalizer_enabled: true,
            current_time: 0.0,
            is_loading: false,
            error: None,
            pending_frame: None,
            next_frame_id: 0,
            frame_signal: Arc::new(Notify::new()),
            event_tx,
            event_rx,
        }
    }

    /// Receiver for player events
    ///
    /// All clones share one queue; each event is delivered to one receiver.
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.event_rx.clone()
    }

    fn emit(&self, event: PlayerEvent) {
        self.event_tx.send(event).ok();
    }

    // ===== Loading =====

    /// Decode `bytes` and make them the current source
    ///
    /// On failure the previous source and transport state are kept, and the
    /// message is recorded in [`AudioGraphState::error`].
    ///
    /// # Arguments
    /// * `bytes` - Complete file contents
    /// * `extension` - Optional extension used as a format hint
    pub fn load(&mut self, bytes: Vec<u8>, extension: Option<&str>) -> Result<f64> {
        self.is_loading = true;

        match self.decoder.decode_bytes(bytes, extension) {
            Ok(source) => Ok(self.load_source(source)),
            Err(e) => {
                self.is_loading = false;
                let err = PlaybackError::DecodeError(e);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Make an already decoded source current; returns its duration
    pub fn load_source(&mut self, source: AudioSource) -> f64 {
        self.halt_source();
        self.cancel_frame();

        let duration = source.duration_secs();
        let was_stopped = self.clock.state() == PlaybackState::Stopped;
        self.clock.set_duration(duration);
        self.source = Some(source);
        self.current_time = 0.0;
        self.is_loading = false;
        self.error = None;

        tracing::info!(duration_secs = duration, "Loaded audio source");
        self.emit(PlayerEvent::Loaded {
            duration_secs: duration,
        });
        if !was_stopped {
            self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
        }

        duration
    }

    /// Drop the current source
    pub fn unload(&mut self) {
        self.stop();
        self.source = None;
        self.clock.set_duration(0.0);
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    // ===== Transport =====

    /// Start or resume playback
    ///
    /// No-op without a source or while already playing. Opens the audio
    /// context on first use and resumes it if the platform suspended it.
    pub fn play(&mut self) -> Result<()> {
        let Some(buffer) = self.source.as_ref().map(|s| Arc::clone(s.buffer())) else {
            return Ok(());
        };
        if self.clock.state() == PlaybackState::Playing {
            return Ok(());
        }

        let graph = self.ensure_graph()?;
        self.ensure_running()?;

        let (sample_rate, now) = match self.context.as_ref() {
            Some(context) => (context.sample_rate(), context.current_time()),
            None => return Err(context_lost()),
        };

        let offset = self.clock.offset();
        let mut node = BufferSource::new(buffer, sample_rate);
        node.start(offset)?;

        {
            let mut graph = lock_graph(&graph);
            if let Some(mut stale) = graph.disconnect_source() {
                stale.stop();
            }
            graph.connect_source(node)?;
        }

        self.clock.start(now);
        self.current_time = offset;
        self.error = None;
        self.request_frame();

        tracing::debug!(offset_secs = offset, "Playback started");
        self.emit(PlayerEvent::StateChanged(PlaybackState::Playing));
        Ok(())
    }

    /// Pause, remembering the position for the next `play()`
    pub fn pause(&mut self) {
        if self.clock.state() != PlaybackState::Playing {
            return;
        }

        let position = self.clock.pause(self.clock_now());
        self.halt_source();
        self.cancel_frame();
        self.current_time = position;

        tracing::debug!(position_secs = position, "Playback paused");
        self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));
        self.emit(PlayerEvent::TimeUpdate {
            position_secs: position,
        });
    }

    /// Stop and rewind to zero
    pub fn stop(&mut self) {
        let was_stopped = self.clock.state() == PlaybackState::Stopped;

        self.halt_source();
        self.cancel_frame();
        self.clock.stop();
        self.current_time = 0.0;

        if !was_stopped {
            tracing::debug!("Playback stopped");
            self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
        }
    }

    /// Move to `target` seconds, clamped to the source duration
    ///
    /// A playing source is paused and replayed at the new offset; source
    /// nodes cannot reposition in place. Returns the clamped position.
    pub fn seek(&mut self, target: f64) -> Result<f64> {
        let was_playing = self.clock.state() == PlaybackState::Playing;
        if was_playing {
            self.pause();
        }

        let position = self.clock.seek(target);
        self.current_time = position;
        self.emit(PlayerEvent::TimeUpdate {
            position_secs: position,
        });

        if was_playing {
            self.play()?;
        }
        Ok(position)
    }

    /// Frame callback: publish the position and detect end of track
    ///
    /// Does nothing unless a frame was requested, so a call after
    /// `pause()`/`stop()` never fires a stray update.
    pub fn tick(&mut self) {
        if self.pending_frame.take().is_none() {
            return;
        }
        if self.clock.state() != PlaybackState::Playing {
            return;
        }

        let now = self.clock_now();
        let position = self.clock.position(now);
        self.current_time = position;
        self.emit(PlayerEvent::TimeUpdate {
            position_secs: position,
        });

        if self.clock.has_reached_end(now) {
            self.finish_track();
        } else {
            self.request_frame();
        }
    }

    fn finish_track(&mut self) {
        self.halt_source();
        if self.clock.finish() {
            self.current_time = 0.0;
            tracing::debug!("Playback reached end of source");
            self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
            self.emit(PlayerEvent::Ended);
        }
    }

    /// Whether a frame callback is outstanding
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Signal raised whenever a frame is requested
    ///
    /// A driver parks on it while no frame is outstanding.
    pub fn frame_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.frame_signal)
    }

    fn request_frame(&mut self) {
        self.next_frame_id += 1;
        self.pending_frame = Some(FrameRequest(self.next_frame_id));
        self.frame_signal.notify_one();
    }

    fn cancel_frame(&mut self) {
        self.pending_frame = None;
    }

    // ===== Volume =====

    /// Set the stored volume (clamped to 0.0-1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume.set_level(volume);
        self.apply_volume();
    }

    /// Mute or unmute without touching the stored volume
    pub fn set_muted(&mut self, muted: bool) {
        self.volume.set_muted(muted);
        self.apply_volume();
    }

    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_volume();
    }

    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    /// Gain the master node applies (0 when muted)
    pub fn master_gain(&self) -> f32 {
        match self.graph.as_ref() {
            Some(graph) => lock_graph(graph).master().gain(),
            None => self.volume.gain(),
        }
    }

    fn apply_volume(&mut self) {
        if let Some(graph) = self.graph.as_ref() {
            lock_graph(graph).master_mut().set_gain(self.volume.gain());
        }
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
        });
    }

    // ===== Equalizer =====

    /// Store `profile` and apply it, or apply 0 dB everywhere when disabled
    ///
    /// The band count must match the layout the player was built with.
    pub fn set_equalizer(&mut self, profile: &EqualizerProfile, enabled: bool) -> Result<()> {
        if self.options.engine == EngineKind::Direct {
            return Err(PlaybackError::EqualizerUnavailable);
        }
        if profile.len() != self.profile.len() {
            return Err(PlaybackError::BandCountMismatch {
                expected: self.profile.len(),
                actual: profile.len(),
            });
        }

        self.profile = profile.clone();
        self.equalizer_enabled = enabled;
        self.apply_equalizer()
    }

    /// Toggle the equalizer while keeping the stored gains
    pub fn set_equalizer_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.options.engine == EngineKind::Direct {
            return Err(PlaybackError::EqualizerUnavailable);
        }
        self.equalizer_enabled = enabled;
        self.apply_equalizer()
    }

    pub fn equalizer_profile(&self) -> &EqualizerProfile {
        &self.profile
    }

    pub fn equalizer_enabled(&self) -> bool {
        self.equalizer_enabled
    }

    /// Gain each band filter applies right now
    pub fn effective_band_gains(&self) -> Vec<f32> {
        if let Some(graph) = self.graph.as_ref() {
            if let Some(eq) = lock_graph(graph).equalizer() {
                return eq.effective_gains();
            }
        }

        match (self.options.engine, self.equalizer_enabled) {
            (EngineKind::Direct, _) => Vec::new(),
            (EngineKind::Graph, true) => self.profile.gains(),
            (EngineKind::Graph, false) => vec![0.0; self.profile.len()],
        }
    }

    fn apply_equalizer(&mut self) -> Result<()> {
        if let Some(graph) = self.graph.as_ref() {
            if let Some(eq) = lock_graph(graph).equalizer_mut() {
                eq.apply(&self.profile, self.equalizer_enabled)
                    .map_err(|_| PlaybackError::BandCountMismatch {
                        expected: eq.band_count(),
                        actual: self.profile.len(),
                    })?;
            }
        }

        tracing::debug!(enabled = self.equalizer_enabled, "Equalizer updated");
        self.emit(PlayerEvent::EqualizerChanged {
            enabled: self.equalizer_enabled,
        });
        Ok(())
    }

    // ===== State =====

    pub fn playback_state(&self) -> PlaybackState {
        self.clock.state()
    }

    /// Snapshot for the host UI
    pub fn state(&self) -> AudioGraphState {
        let current_time = match self.clock.state() {
            PlaybackState::Playing => self.clock.position(self.clock_now()),
            PlaybackState::Paused | PlaybackState::Stopped => self.current_time,
        };

        AudioGraphState {
            is_playing: self.clock.state() == PlaybackState::Playing,
            current_time_secs: current_time,
            duration_secs: self.clock.duration(),
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }

    /// Read position of the live source node, if one is connected
    pub fn output_position_secs(&self) -> Option<f64> {
        let graph = self.graph.as_ref()?;
        let graph = lock_graph(graph);
        graph.source().map(BufferSource::position_secs)
    }

    /// Byte spectrum of the most recent output, for visualization
    ///
    /// 128 bins from 0 Hz up to half the context rate. `None` until a graph
    /// has been built by the first `play()`.
    pub fn analyser_data(&self) -> Option<Vec<u8>> {
        let graph = self.graph.as_ref()?;
        let data = lock_graph(graph).analyser_mut().byte_frequency_data();
        Some(data)
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|c| c.state())
    }

    /// Release the context; the next `play()` opens a new one
    pub fn close(&mut self) {
        self.stop();
        if let Some(mut context) = self.context.take() {
            context.close();
        }
        self.graph = None;
    }

    // ===== Internals =====

    fn clock_now(&self) -> f64 {
        self.context.as_ref().map_or(0.0, |c| c.current_time())
    }

    fn halt_source(&mut self) {
        if let Some(graph) = self.graph.as_ref() {
            if let Some(mut node) = lock_graph(graph).disconnect_source() {
                node.stop();
            }
        }
    }

    /// Open the context and build the graph on first use
    fn ensure_graph(&mut self) -> Result<SharedGraph> {
        if let Some(graph) = self.graph.as_ref() {
            return Ok(Arc::clone(graph));
        }

        let mut context = match self.factory.create() {
            Ok(context) => context,
            Err(e) => {
                let err = into_unavailable(e);
                self.record_error(&err);
                return Err(err);
            }
        };

        let mut graph = AudioGraph::new(
            self.options.engine,
            self.profile.clone(),
            self.options.peaking_q,
            context.sample_rate(),
        );
        graph.master_mut().set_gain(self.volume.gain());
        graph.master_mut().reset();
        if let Some(eq) = graph.equalizer_mut() {
            eq.apply(&self.profile, self.equalizer_enabled)
                .map_err(|_| PlaybackError::BandCountMismatch {
                    expected: eq.band_count(),
                    actual: self.profile.len(),
                })?;
        }

        let graph = Arc::new(Mutex::new(graph));
        if let Err(e) = context.connect(Arc::clone(&graph)) {
            let err = into_unavailable(e);
            self.record_error(&err);
            return Err(err);
        }

        tracing::info!(
            sample_rate = context.sample_rate(),
            engine = ?self.options.engine,
            "Audio context opened"
        );

        self.context = Some(context);
        self.graph = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Resume a suspended context; a closed one is replaced on the next play
    fn ensure_running(&mut self) -> Result<()> {
        let result = match self.context.as_mut() {
            Some(context) => match context.state() {
                ContextState::Running => Ok(()),
                ContextState::Suspended => context.resume().map_err(into_unavailable),
                ContextState::Closed => Err(PlaybackError::AudioContextUnavailable(
                    "context was closed".to_string(),
                )),
            },
            None => Err(context_lost()),
        };

        if let Err(err) = result {
            if self.context_state() == Some(ContextState::Closed) {
                self.context = None;
                self.graph = None;
            }
            self.record_error(&err);
            return Err(err);
        }
        Ok(())
    }

    fn record_error(&mut self, err: &PlaybackError) {
        tracing::warn!(error = %err, "Player operation failed");
        let message = err.to_string();
        self.error = Some(message.clone());
        self.emit(PlayerEvent::Error(message));
    }
}

fn context_lost() -> PlaybackError {
    PlaybackError::AudioContextUnavailable("no audio context".to_string())
}

fn into_unavailable(err: PlaybackError) -> PlaybackError {
    match err {
        PlaybackError::AudioContextUnavailable(_) => err,
        other => PlaybackError::AudioContextUnavailable(other.to_string()),
    }
}

impl Drop for AudioGraphManager {
    fn drop(&mut self) {
        if let Some(mut context) = self.context.take() {
            context.close();
        }
    }
}
