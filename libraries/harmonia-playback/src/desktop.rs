/// Real-time audio context on the default cpal output device
use crate::context::{AudioContext, ContextFactory, ContextState};
use crate::error::{PlaybackError, Result};
use crate::graph::{lock_graph, SharedGraph};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Commands sent to the audio thread
enum ContextCommand {
    Resume(Sender<Result<()>>),
    Suspend,
    Shutdown,
}

/// State shared with the output callback
struct Shared {
    graph: Mutex<Option<SharedGraph>>,
    frames_rendered: AtomicU64,
    state: Mutex<ContextState>,
}

/// cpal-backed [`AudioContext`]
///
/// A dedicated thread owns the `Stream`, since it is not `Send` on every
/// platform; this handle talks to it over a channel. The stream is built
/// paused, so the context starts `Suspended` until the first `resume()`.
pub struct CpalContext {
    command_tx: Sender<ContextCommand>,
    sample_rate: u32,
    shared: Arc<Shared>,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalContext {
    /// Open the default output device
    ///
    /// # Errors
    /// `AudioContextUnavailable` when there is no device or the stream
    /// cannot be built.
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| unavailable("no output device found"))?;

        let config = device
            .default_output_config()
            .map_err(|e| unavailable(e.to_string()))?;

        let sample_rate = config.sample_rate();
        let config = config.config();

        let shared = Arc::new(Shared {
            graph: Mutex::new(None),
            frames_rendered: AtomicU64::new(0),
            state: Mutex::new(ContextState::Suspended),
        });

        let (command_tx, command_rx) = bounded::<ContextCommand>(32);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let thread_shared = Arc::clone(&shared);
        let audio_thread = thread::Builder::new()
            .name("harmonia-audio".to_string())
            .spawn(move || audio_thread_run(device, config, thread_shared, command_rx, ready_tx))
            .map_err(|e| unavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| unavailable("audio thread exited during startup"))??;

        tracing::info!(sample_rate, "Opened output device");

        Ok(Self {
            command_tx,
            sample_rate,
            shared,
            audio_thread: Some(audio_thread),
        })
    }

    /// Factory opening a fresh context on every call
    pub fn factory() -> impl ContextFactory + 'static {
        || -> Result<Box<dyn AudioContext>> { Ok(Box::new(CpalContext::open_default()?)) }
    }

    fn set_state(&self, state: ContextState) {
        *self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn unavailable(message: impl Into<String>) -> PlaybackError {
    PlaybackError::AudioContextUnavailable(message.into())
}

fn audio_thread_run(
    device: Device,
    config: StreamConfig,
    shared: Arc<Shared>,
    command_rx: Receiver<ContextCommand>,
    ready_tx: Sender<Result<()>>,
) {
    let channels = usize::from(config.channels);
    let callback_shared = Arc::clone(&shared);
    let mut scratch: Vec<f32> = Vec::new();

    let stream: Stream = match device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            render_callback(data, channels, &callback_shared, &mut scratch);
        },
        |err| tracing::error!(error = %err, "Audio stream error"),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            ready_tx.send(Err(unavailable(e.to_string()))).ok();
            return;
        }
    };

    // Some hosts start streams immediately
    stream.pause().ok();
    ready_tx.send(Ok(())).ok();

    while let Ok(command) = command_rx.recv() {
        match command {
            ContextCommand::Resume(reply) => {
                let result = stream.play().map_err(|e| unavailable(e.to_string()));
                reply.send(result).ok();
            }
            ContextCommand::Suspend => {
                if let Err(e) = stream.pause() {
                    tracing::warn!(error = %e, "Failed to pause stream");
                }
            }
            ContextCommand::Shutdown => break,
        }
    }

    drop(stream);
    *shared.state.lock().unwrap_or_else(PoisonError::into_inner) = ContextState::Closed;
}

/// Output callback (real-time thread)
fn render_callback(data: &mut [f32], channels: usize, shared: &Shared, scratch: &mut Vec<f32>) {
    if channels == 0 {
        return;
    }
    let frames = data.len() / channels;

    let running = *shared.state.lock().unwrap_or_else(PoisonError::into_inner)
        == ContextState::Running;
    let graph = shared
        .graph
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    let Some(graph) = graph.filter(|_| running) else {
        data.fill(0.0);
        return;
    };

    scratch.resize(frames * 2, 0.0);
    lock_graph(&graph).render(scratch);

    for (out, frame) in data.chunks_exact_mut(channels).zip(scratch.chunks_exact(2)) {
        match out.len() {
            1 => out[0] = (frame[0] + frame[1]) * 0.5,
            _ => {
                out[0] = frame[0];
                out[1] = frame[1];
                out[2..].fill(0.0);
            }
        }
    }

    shared
        .frames_rendered
        .fetch_add(frames as u64, Ordering::Relaxed);
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        *self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn resume(&mut self) -> Result<()> {
        match self.state() {
            ContextState::Running => return Ok(()),
            ContextState::Closed => return Err(unavailable("context is closed")),
            ContextState::Suspended => {}
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(ContextCommand::Resume(reply_tx))
            .map_err(|_| unavailable("audio thread is gone"))?;
        reply_rx
            .recv()
            .map_err(|_| unavailable("audio thread is gone"))??;

        self.set_state(ContextState::Running);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        match self.sample_rate {
            0 => 0.0,
            rate => self.shared.frames_rendered.load(Ordering::Relaxed) as f64 / f64::from(rate),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect(&mut self, graph: SharedGraph) -> Result<()> {
        if self.state() == ContextState::Closed {
            return Err(unavailable("context is closed"));
        }
        *self
            .shared
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(graph);
        Ok(())
    }

    fn close(&mut self) {
        if self.state() == ContextState::Running {
            self.command_tx.send(ContextCommand::Suspend).ok();
        }
        self.command_tx.send(ContextCommand::Shutdown).ok();
        self.set_state(ContextState::Closed);
        *self
            .shared
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;

        if let Some(handle) = self.audio_thread.take() {
            handle.join().ok();
        }
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        if self.audio_thread.is_some() {
            self.close();
        }
    }
}
