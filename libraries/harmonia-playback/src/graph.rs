//! The processing graph
//!
//! `source -> [band 0 -> ... -> band n-1] -> master gain -> analyser -> destination`
//!
//! The graph owns its nodes. Only the source slot changes after
//! construction: a [`BufferSource`] plays once, so every play replaces it.

use crate::error::{PlaybackError, Result};
use harmonia_audio::{Analyser, AudioEffect, Equalizer, EqualizerProfile, GainNode};
use harmonia_core::{AudioBuffer, EngineKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Graph shared between the player and the context that renders it
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Lock a shared graph, recovering from a poisoned lock
///
/// A panic in a render callback leaves the graph in a consistent (if
/// stale) state, so there is nothing to gain from propagating the poison.
pub fn lock_graph(graph: &SharedGraph) -> MutexGuard<'_, AudioGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lifecycle of a source node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Created, not started
    Idle,
    Playing,
    /// Stopped or ran out of samples; cannot be restarted
    Finished,
}

/// Single-use playback node bound to a decoded buffer
///
/// Reads the buffer at its own rate and converts to the context rate with
/// linear interpolation.
#[derive(Debug)]
pub struct BufferSource {
    buffer: Arc<AudioBuffer>,
    /// Read position in source frames
    position: f64,
    /// Source frames advanced per output frame
    step: f64,
    state: SourceState,
}

impl BufferSource {
    /// # Arguments
    /// * `buffer` - Interleaved samples, any channel count
    /// * `context_rate` - Rate the graph renders at
    pub fn new(buffer: Arc<AudioBuffer>, context_rate: u32) -> Self {
        let buffer_rate = buffer.format.sample_rate.as_hz();
        let step = if context_rate == 0 || buffer_rate == 0 {
            1.0
        } else {
            f64::from(buffer_rate) / f64::from(context_rate)
        };

        Self {
            buffer,
            position: 0.0,
            step,
            state: SourceState::Idle,
        }
    }

    /// Start output at `offset_secs` into the buffer
    pub fn start(&mut self, offset_secs: f64) -> Result<()> {
        if self.state != SourceState::Idle {
            return Err(PlaybackError::SourceAlreadyStarted);
        }

        let rate = f64::from(self.buffer.format.sample_rate.as_hz());
        self.position = (offset_secs.max(0.0) * rate).min(self.buffer.frames() as f64);
        self.state = SourceState::Playing;
        Ok(())
    }

    /// Stop output for good
    pub fn stop(&mut self) {
        self.state = SourceState::Finished;
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Current read position in seconds of source audio
    pub fn position_secs(&self) -> f64 {
        match self.buffer.format.sample_rate.as_hz() {
            0 => 0.0,
            rate => self.position / f64::from(rate),
        }
    }

    /// Write interleaved stereo into `out`, leaving silence past the end
    ///
    /// Mono buffers feed both outputs; wider layouts contribute their
    /// first two channels.
    fn render(&mut self, out: &mut [f32]) {
        if self.state != SourceState::Playing {
            return;
        }

        let samples = &self.buffer.samples;
        let channels = usize::from(self.buffer.format.channels);
        let frames = self.buffer.frames();
        if frames == 0 {
            self.state = SourceState::Finished;
            return;
        }
        let right = usize::from(channels > 1);

        for frame in out.chunks_exact_mut(2) {
            if self.position >= frames as f64 {
                self.state = SourceState::Finished;
                break;
            }

            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let next = (index + 1).min(frames - 1);

            for (slot, channel) in frame.iter_mut().zip([0, right]) {
                let a = samples[index * channels + channel];
                let b = samples[next * channels + channel];
                *slot = a + (b - a) * frac;
            }

            self.position += self.step;
        }
    }
}

/// Source, optional filter chain, master gain and output analyser
pub struct AudioGraph {
    sample_rate: u32,
    source: Option<BufferSource>,
    equalizer: Option<Equalizer>,
    master: GainNode,
    analyser: Analyser,
}

impl AudioGraph {
    /// Build the node chain for `engine`
    ///
    /// # Arguments
    /// * `engine` - `Graph` builds one filter per band of `profile`, `Direct` none
    /// * `profile` - Initial bands
    /// * `peaking_q` - Q of the interior bands
    /// * `sample_rate` - Rate of the rendering context
    pub fn new(
        engine: EngineKind,
        profile: EqualizerProfile,
        peaking_q: f32,
        sample_rate: u32,
    ) -> Self {
        let equalizer = match engine {
            EngineKind::Graph => {
                let mut eq = Equalizer::new(profile, peaking_q);
                // Settle coefficients at the context rate before the first render
                eq.process(&mut [], sample_rate);
                eq.reset();
                Some(eq)
            }
            EngineKind::Direct => None,
        };

        tracing::debug!(
            ?engine,
            sample_rate,
            bands = equalizer.as_ref().map_or(0, Equalizer::band_count),
            "Built audio graph"
        );

        Self {
            sample_rate,
            source: None,
            equalizer,
            master: GainNode::default(),
            analyser: Analyser::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Attach a source node in front of the filter chain
    pub fn connect_source(&mut self, source: BufferSource) -> Result<()> {
        if self.source.is_some() {
            return Err(PlaybackError::SourceAlreadyConnected);
        }
        self.source = Some(source);
        Ok(())
    }

    /// Detach the current source node, if any
    pub fn disconnect_source(&mut self) -> Option<BufferSource> {
        self.source.take()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&BufferSource> {
        self.source.as_ref()
    }

    pub fn equalizer(&self) -> Option<&Equalizer> {
        self.equalizer.as_ref()
    }

    pub fn equalizer_mut(&mut self) -> Option<&mut Equalizer> {
        self.equalizer.as_mut()
    }

    pub fn master(&self) -> &GainNode {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut GainNode {
        &mut self.master
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    pub fn analyser_mut(&mut self) -> &mut Analyser {
        &mut self.analyser
    }

    /// Render one block of interleaved stereo output
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        if let Some(source) = self.source.as_mut() {
            source.render(out);
        }

        if let Some(eq) = self.equalizer.as_mut() {
            eq.process(out, self.sample_rate);
        }

        self.master.process(out, self.sample_rate);
        self.analyser.process(out, self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmonia_core::{AudioFormat, SampleRate};

    fn ramp_buffer(frames: usize, rate: u32) -> Arc<AudioBuffer> {
        let samples = (0..frames)
            .flat_map(|i| {
                let v = i as f32 / frames as f32;
                [v, v]
            })
            .collect();
        Arc::new(AudioBuffer::new(
            samples,
            AudioFormat::stereo_f32(SampleRate::new(rate)),
        ))
    }

    #[test]
    fn source_is_single_use() {
        let mut source = BufferSource::new(ramp_buffer(100, 48_000), 48_000);
        source.start(0.0).unwrap();
        source.stop();
        assert!(matches!(
            source.start(0.0),
            Err(PlaybackError::SourceAlreadyStarted)
        ));
    }

    #[test]
    fn source_starts_at_offset() {
        let mut source = BufferSource::new(ramp_buffer(48_000, 48_000), 48_000);
        source.start(0.5).unwrap();
        assert!((source.position_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn source_finishes_at_end_of_buffer() {
        let mut source = BufferSource::new(ramp_buffer(10, 48_000), 48_000);
        source.start(0.0).unwrap();

        let mut out = vec![0.0; 64];
        source.render(&mut out);

        assert_eq!(source.state(), SourceState::Finished);
        assert!(out[20..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn source_resamples_to_context_rate() {
        let mut source = BufferSource::new(ramp_buffer(24_000, 24_000), 48_000);
        source.start(0.0).unwrap();

        let mut out = vec![0.0; 2 * 4_800];
        source.render(&mut out);

        // 4800 output frames at 48k is 0.1s of source audio
        assert!((source.position_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn mono_source_feeds_both_outputs() {
        let buffer = Arc::new(AudioBuffer::new(
            (0..100).map(|i| i as f32 / 100.0).collect(),
            AudioFormat::new(SampleRate::new(48_000), 1, 32),
        ));
        let mut source = BufferSource::new(buffer, 48_000);
        source.start(0.0).unwrap();

        let mut out = vec![0.0; 2 * 256];
        source.render(&mut out);

        assert_eq!(source.state(), SourceState::Finished);
        assert_eq!(&out[20..24], &[0.1, 0.1, 0.11, 0.11]);
        assert!(out[200..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn wide_source_takes_front_pair() {
        // Four channels: L, R, then two that must not reach the output
        let samples = (0..50).flat_map(|_| [0.25, -0.25, 0.9, 0.9]).collect();
        let buffer = Arc::new(AudioBuffer::new(
            samples,
            AudioFormat::new(SampleRate::new(48_000), 4, 32),
        ));
        let mut source = BufferSource::new(buffer, 48_000);
        source.start(0.0).unwrap();

        let mut out = vec![0.0; 2 * 64];
        source.render(&mut out);

        assert!(out.chunks_exact(2).take(50).all(|f| f == [0.25, -0.25]));
        assert!(out[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn channelless_source_finishes_silently() {
        let buffer = Arc::new(AudioBuffer::new(
            vec![0.5; 16],
            AudioFormat::new(SampleRate::new(48_000), 0, 32),
        ));
        let mut source = BufferSource::new(buffer, 48_000);
        source.start(0.0).unwrap();

        let mut out = vec![0.0; 32];
        source.render(&mut out);
        assert_eq!(source.state(), SourceState::Finished);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn graph_rejects_second_source() {
        let buffer = ramp_buffer(100, 44_100);
        let mut graph = AudioGraph::new(EngineKind::Graph, EqualizerProfile::rich(), 1.0, 44_100);

        graph
            .connect_source(BufferSource::new(Arc::clone(&buffer), 44_100))
            .unwrap();
        assert!(matches!(
            graph.connect_source(BufferSource::new(buffer, 44_100)),
            Err(PlaybackError::SourceAlreadyConnected)
        ));

        assert!(graph.disconnect_source().is_some());
        assert!(!graph.has_source());
    }

    #[test]
    fn analyser_sees_post_gain_output() {
        // 1500 Hz sits in bin 8 of a 256-point window at 48 kHz
        let samples = (0..4_800)
            .flat_map(|i| {
                let s = (2.0 * std::f32::consts::PI * 1500.0 * i as f32 / 48_000.0).sin();
                [s, s]
            })
            .collect();
        let buffer = Arc::new(AudioBuffer::new(
            samples,
            AudioFormat::stereo_f32(SampleRate::new(48_000)),
        ));
        let mut graph = AudioGraph::new(EngineKind::Direct, EqualizerProfile::rich(), 1.0, 48_000);
        graph.analyser_mut().set_smoothing(0.0);

        let mut source = BufferSource::new(buffer, 48_000);
        source.start(0.0).unwrap();
        graph.connect_source(source).unwrap();
        let mut out = vec![0.0; 2 * 1024];
        graph.render(&mut out);
        let loud = graph.analyser_mut().frequency_data()[8];

        graph.master_mut().set_gain(0.1);
        graph.master_mut().reset();
        graph.render(&mut out);
        let quiet = graph.analyser_mut().frequency_data()[8];

        assert!((loud - quiet - 20.0).abs() < 0.5, "{loud} vs {quiet}");
    }

    #[test]
    fn direct_engine_has_no_equalizer() {
        let graph = AudioGraph::new(EngineKind::Direct, EqualizerProfile::rich(), 1.0, 44_100);
        assert!(graph.equalizer().is_none());
    }

    #[test]
    fn render_without_source_is_silent() {
        let mut graph = AudioGraph::new(EngineKind::Graph, EqualizerProfile::rich(), 1.0, 44_100);
        let mut out = vec![0.5; 256];
        graph.render(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn master_gain_scales_output() {
        let buffer = Arc::new(AudioBuffer::new(
            vec![0.5; 2 * 1024],
            AudioFormat::stereo_f32(SampleRate::new(44_100)),
        ));
        let mut graph = AudioGraph::new(EngineKind::Direct, EqualizerProfile::rich(), 1.0, 44_100);
        graph.master_mut().set_gain(0.5);
        graph.master_mut().reset();

        let mut source = BufferSource::new(buffer, 44_100);
        source.start(0.0).unwrap();
        graph.connect_source(source).unwrap();

        let mut out = vec![0.0; 2 * 512];
        graph.render(&mut out);
        assert!(out.iter().all(|s| (*s - 0.25).abs() < 1e-6));
    }
}
