//! Playback clock
//!
//! Position is derived, never accumulated:
//! `position = clock_now - start_clock_time + paused_offset`, clamped to the
//! source duration. Pause folds the elapsed time into `paused_offset`, so
//! resuming continues from the same point.

use crate::types::PlaybackState;

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    start_clock_time: f64,
    paused_offset: f64,
    duration: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            start_clock_time: 0.0,
            paused_offset: 0.0,
            duration: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Offset the next `start` resumes from
    pub fn offset(&self) -> f64 {
        self.paused_offset
    }

    /// Bind to a new source; stops the clock
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.stop();
    }

    /// Anchor the clock at `now` and enter `Playing`
    ///
    /// Returns false if already playing.
    pub fn start(&mut self, now: f64) -> bool {
        if self.state == PlaybackState::Playing {
            return false;
        }
        self.start_clock_time = now;
        self.state = PlaybackState::Playing;
        true
    }

    /// Current position at clock time `now`
    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            PlaybackState::Playing => {
                self.clamp(now - self.start_clock_time + self.paused_offset)
            }
            PlaybackState::Paused | PlaybackState::Stopped => self.paused_offset,
        }
    }

    /// Freeze the position at `now`; returns it
    pub fn pause(&mut self, now: f64) -> f64 {
        if self.state == PlaybackState::Playing {
            self.paused_offset = self.position(now);
            self.state = PlaybackState::Paused;
        }
        self.paused_offset
    }

    /// Back to zero
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.paused_offset = 0.0;
        self.start_clock_time = 0.0;
    }

    /// Move the stored offset; returns the clamped target
    ///
    /// Only valid while not playing; a playing clock is paused first by the
    /// caller because the source node cannot reposition in place.
    pub fn seek(&mut self, target: f64) -> f64 {
        self.paused_offset = self.clamp(target);
        self.paused_offset
    }

    /// True once a playing clock reaches the end of the source
    pub fn has_reached_end(&self, now: f64) -> bool {
        self.state == PlaybackState::Playing && self.position(now) >= self.duration
    }

    /// Leave `Playing` at end of track
    ///
    /// Returns true only for the transition itself, so the caller notifies
    /// "ended" once per play-through.
    pub fn finish(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.stop();
        true
    }

    fn clamp(&self, position: f64) -> f64 {
        if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, self.duration)
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(duration: f64) -> PlaybackClock {
        let mut clock = PlaybackClock::new();
        clock.set_duration(duration);
        clock
    }

    #[test]
    fn position_follows_clock_while_playing() {
        let mut clock = clock(180.0);
        clock.start(10.0);
        assert_eq!(clock.position(12.5), 2.5);
    }

    #[test]
    fn pause_then_resume_continues() {
        let mut clock = clock(180.0);
        clock.start(0.0);
        assert_eq!(clock.pause(90.0), 90.0);
        assert_eq!(clock.state(), PlaybackState::Paused);

        // Clock keeps running while paused; position must not
        assert_eq!(clock.position(200.0), 90.0);

        clock.start(200.0);
        assert_eq!(clock.position(201.0), 91.0);
    }

    #[test]
    fn stop_resets_offset() {
        let mut clock = clock(180.0);
        clock.start(0.0);
        clock.pause(30.0);
        clock.stop();
        assert_eq!(clock.offset(), 0.0);
        assert_eq!(clock.state(), PlaybackState::Stopped);
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut clock = clock(60.0);
        assert_eq!(clock.seek(-5.0), 0.0);
        assert_eq!(clock.seek(75.0), 60.0);
        assert_eq!(clock.seek(f64::NAN), 0.0);
    }

    #[test]
    fn position_never_exceeds_duration() {
        let mut clock = clock(10.0);
        clock.start(0.0);
        assert_eq!(clock.position(50.0), 10.0);
        assert!(clock.has_reached_end(50.0));
    }

    #[test]
    fn finish_reports_once() {
        let mut clock = clock(10.0);
        clock.start(0.0);
        assert!(clock.finish());
        assert!(!clock.finish());
        assert_eq!(clock.offset(), 0.0);
    }

    #[test]
    fn start_is_idempotent_while_playing() {
        let mut clock = clock(10.0);
        assert!(clock.start(1.0));
        assert!(!clock.start(5.0));
        assert_eq!(clock.position(2.0), 1.0);
    }
}
