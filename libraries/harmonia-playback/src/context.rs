//! Audio contexts
//!
//! A context owns the clock and the destination the graph renders into.
//! [`OfflineContext`] renders on demand and is what tests and headless
//! hosts use; the `desktop` feature adds a cpal-backed real-time context.

use crate::error::{PlaybackError, Result};
use crate::graph::{lock_graph, SharedGraph};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Frames per render quantum, as in browser audio graphs
pub const RENDER_QUANTUM: usize = 128;

/// Lifecycle of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not rendering; often waiting on a user gesture
    Suspended,
    Running,
    Closed,
}

/// Platform side of the audio graph
pub trait AudioContext: Send {
    fn state(&self) -> ContextState;

    /// Start or continue rendering
    fn resume(&mut self) -> Result<()>;

    /// Hardware clock in seconds; only advances while running
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Route `graph` to the destination
    fn connect(&mut self, graph: SharedGraph) -> Result<()>;

    /// Release the device; the context cannot be resumed afterwards
    fn close(&mut self);
}

/// Creates contexts on demand
///
/// The player asks for a context the first time it needs one and again
/// after a failure, so a user gesture can retry a refused creation.
pub trait ContextFactory: Send {
    fn create(&mut self) -> Result<Box<dyn AudioContext>>;
}

impl<F> ContextFactory for F
where
    F: FnMut() -> Result<Box<dyn AudioContext>> + Send,
{
    fn create(&mut self) -> Result<Box<dyn AudioContext>> {
        self()
    }
}

struct OfflineInner {
    state: ContextState,
    sample_rate: u32,
    frames_rendered: u64,
    graph: Option<SharedGraph>,
    refuse_resume: bool,
}

/// Context whose clock advances only when frames are rendered
///
/// Cloning yields another handle to the same context, so a host can give
/// one handle to the player and keep one to drive rendering.
#[derive(Clone)]
pub struct OfflineContext {
    inner: Arc<Mutex<OfflineInner>>,
}

impl OfflineContext {
    /// Running context at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, ContextState::Running)
    }

    /// Context that waits for `resume()`
    pub fn suspended(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, ContextState::Suspended)
    }

    fn with_state(sample_rate: u32, state: ContextState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OfflineInner {
                state,
                sample_rate,
                frames_rendered: 0,
                graph: None,
                refuse_resume: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OfflineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Factory handing out handles to this context
    pub fn factory(&self) -> impl ContextFactory + 'static {
        let context = self.clone();
        move || -> Result<Box<dyn AudioContext>> { Ok(Box::new(context.clone())) }
    }

    /// Make `resume()` fail, as a platform blocking autoplay would
    pub fn set_refuse_resume(&self, refuse: bool) {
        self.lock().refuse_resume = refuse;
    }

    /// Pause rendering until the next `resume()`
    pub fn suspend(&self) {
        let mut inner = self.lock();
        if inner.state == ContextState::Running {
            inner.state = ContextState::Suspended;
        }
    }

    /// Render `frames` frames of interleaved stereo
    ///
    /// A context that is not running renders nothing and its clock stays put.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let graph = {
            let inner = self.lock();
            if inner.state != ContextState::Running {
                return Vec::new();
            }
            inner.graph.clone()
        };

        let mut out = vec![0.0; frames * 2];
        if let Some(graph) = graph {
            for block in out.chunks_mut(RENDER_QUANTUM * 2) {
                lock_graph(&graph).render(block);
            }
        }

        self.lock().frames_rendered += frames as u64;
        out
    }

    /// Render `secs` seconds and drop the output
    pub fn advance(&self, secs: f64) {
        let frames = (secs.max(0.0) * f64::from(self.sample_rate())).round() as usize;
        let mut remaining = frames;
        while remaining > 0 {
            let block = remaining.min(RENDER_QUANTUM * 64);
            if self.render(block).is_empty() {
                break;
            }
            remaining -= block;
        }
    }
}

impl AudioContext for OfflineContext {
    fn state(&self) -> ContextState {
        self.lock().state
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            ContextState::Closed => Err(PlaybackError::AudioContextUnavailable(
                "context is closed".to_string(),
            )),
            _ if inner.refuse_resume => Err(PlaybackError::AudioContextUnavailable(
                "resume was refused".to_string(),
            )),
            _ => {
                inner.state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn current_time(&self) -> f64 {
        let inner = self.lock();
        match inner.sample_rate {
            0 => 0.0,
            rate => inner.frames_rendered as f64 / f64::from(rate),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.lock().sample_rate
    }

    fn connect(&mut self, graph: SharedGraph) -> Result<()> {
        let mut inner = self.lock();
        if inner.state == ContextState::Closed {
            return Err(PlaybackError::AudioContextUnavailable(
                "context is closed".to_string(),
            ));
        }
        inner.graph = Some(graph);
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        inner.state = ContextState::Closed;
        inner.graph = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_only_while_running() {
        let context = OfflineContext::suspended(48_000);
        assert!(context.render(480).is_empty());
        assert_eq!(context.current_time(), 0.0);

        let mut handle = context.clone();
        handle.resume().unwrap();
        context.advance(0.5);
        assert!((context.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn refused_resume_reports_unavailable() {
        let context = OfflineContext::suspended(44_100);
        context.set_refuse_resume(true);

        let mut handle = context.clone();
        assert!(matches!(
            handle.resume(),
            Err(PlaybackError::AudioContextUnavailable(_))
        ));
        assert_eq!(context.state(), ContextState::Suspended);
    }

    #[test]
    fn closed_context_cannot_resume() {
        let mut context = OfflineContext::new(44_100);
        context.close();
        assert!(context.resume().is_err());
    }

    #[test]
    fn factory_hands_out_shared_handles() {
        let context = OfflineContext::new(44_100);
        let mut factory = context.factory();
        let created = factory.create().unwrap();

        context.advance(1.0);
        assert!((created.current_time() - 1.0).abs() < 1e-9);
    }
}
