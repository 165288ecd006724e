//! Sample containers shared by the decoder, the graph and the device output
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Frames per second of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub const CD_QUALITY: Self = Self(44_100);
    /// Rate most desktop output devices run at
    pub const DVD_QUALITY: Self = Self(48_000);

    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Layout of the samples in an [`AudioBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: SampleRate,

    /// Interleaved channel count
    pub channels: u16,

    /// Depth of the source material; decoded samples are always f32
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: SampleRate, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Interleaved 32-bit float stereo, the layout every decoded source uses
    pub fn stereo_f32(sample_rate: SampleRate) -> Self {
        Self::new(sample_rate, 2, 32)
    }
}

/// Fully decoded track held in memory.
///
/// `samples` is interleaved, nominally within `-1.0..=1.0`.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub format: AudioFormat,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Frames in the buffer, zero when the format declares no channels
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }

    /// Playable length at the buffer's own rate
    pub fn duration_secs(&self) -> f64 {
        match self.format.sample_rate.as_hz() {
            0 => 0.0,
            hz => self.frames() as f64 / f64::from(hz),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interleaved sample count (frames times channels)
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A decoded audio asset owned by one player.
///
/// The sample data sits behind an `Arc` so the rendering side of the graph
/// can read it without copying. `source_channels` keeps the channel count of
/// the file before it was folded into the interleaved stereo buffer.
#[derive(Debug, Clone)]
pub struct AudioSource {
    buffer: Arc<AudioBuffer>,
    source_channels: u16,
}

impl AudioSource {
    /// Wrap a decoded buffer
    ///
    /// # Arguments
    /// * `buffer` - Interleaved samples at the decoded sample rate
    /// * `source_channels` - Channel count reported by the container
    pub fn new(buffer: AudioBuffer, source_channels: u16) -> Self {
        Self {
            buffer: Arc::new(buffer),
            source_channels,
        }
    }

    /// Shared handle to the sample data
    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.buffer.format.sample_rate
    }

    /// Channels in the interleaved buffer
    pub fn channels(&self) -> u16 {
        self.buffer.format.channels
    }

    /// Channels in the original file
    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    pub fn frames(&self) -> usize {
        self.buffer.frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(samples: usize, rate: u32) -> AudioBuffer {
        AudioBuffer::new(vec![0.0; samples], AudioFormat::stereo_f32(SampleRate::new(rate)))
    }

    #[test]
    fn stereo_layout_is_32_bit_float() {
        let format = AudioFormat::stereo_f32(SampleRate::CD_QUALITY);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 32);
        assert_eq!(format.sample_rate.as_hz(), 44_100);
    }

    #[test]
    fn frames_count_interleaved_pairs() {
        let buffer = stereo(8, 44_100);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.frames(), 4);
    }

    #[test]
    fn two_seconds_at_cd_rate() {
        let buffer = stereo(2 * 2 * 44_100, 44_100);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_formats_report_zero() {
        let no_channels = AudioBuffer::new(
            vec![0.0; 10],
            AudioFormat::new(SampleRate::new(44_100), 0, 32),
        );
        assert_eq!(no_channels.frames(), 0);
        assert_eq!(no_channels.duration_secs(), 0.0);

        let no_rate = stereo(10, 0);
        assert_eq!(no_rate.frames(), 5);
        assert_eq!(no_rate.duration_secs(), 0.0);

        assert!(stereo(0, 48_000).is_empty());
    }

    #[test]
    fn audio_source_shares_buffer() {
        let format = AudioFormat::stereo_f32(SampleRate::DVD_QUALITY);
        let source = AudioSource::new(AudioBuffer::new(vec![0.0; 96_000], format), 1);
        let handle = Arc::clone(source.buffer());

        assert_eq!(Arc::strong_count(&handle), 2);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.source_channels(), 1);
        assert!((source.duration_secs() - 1.0).abs() < 1e-9);
    }
}
