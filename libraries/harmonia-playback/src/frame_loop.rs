//! Display-rate driver for [`AudioGraphManager::tick`]

use crate::manager::AudioGraphManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Player shared between the host and the frame loop
pub type SharedPlayer = Arc<Mutex<AudioGraphManager>>;

/// One display frame at 60 Hz
pub const DISPLAY_FRAME: Duration = Duration::from_micros(16_667);

/// Background task calling `tick()` once per period while a frame is pending
///
/// Outside of playback no frame is outstanding, so the task parks on the
/// player's frame signal and wakes on the next `play()`. Dropping the handle
/// aborts the task.
pub struct FrameLoop {
    handle: JoinHandle<()>,
    frames: Arc<AtomicU64>,
}

impl FrameLoop {
    /// Spawn on the current tokio runtime
    pub fn spawn(player: SharedPlayer, period: Duration) -> Self {
        let frames = Arc::new(AtomicU64::new(0));
        let signal = lock_player(&player).frame_signal();
        let delivered = Arc::clone(&frames);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let pending = lock_player(&player).has_pending_frame();
                if !pending {
                    tracing::trace!("Frame loop parked");
                    signal.notified().await;
                    interval.reset();
                    continue;
                }

                interval.tick().await;
                // The frame may have been cancelled while waiting
                let ticked = {
                    let mut player = lock_player(&player);
                    let pending = player.has_pending_frame();
                    if pending {
                        player.tick();
                    }
                    pending
                };
                if ticked {
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        tracing::debug!(period_ms = period.as_millis() as u64, "Frame loop started");
        Self { handle, frames }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Number of `tick()` calls made so far
    pub fn frames_delivered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn lock_player(player: &SharedPlayer) -> MutexGuard<'_, AudioGraphManager> {
    player.lock().unwrap_or_else(PoisonError::into_inner)
}
