/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use harmonia_core::{AudioBuffer, AudioFormat, AudioSource, SampleRate};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// ITU-R BS.775-1 coefficient for center and surround channels (-3dB)
const CENTER_MIX: f32 = 0.707;

/// In-memory decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/MP4
///
/// Output is always interleaved stereo f32; mono is duplicated and
/// multichannel layouts are folded down.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a complete file held in memory
    ///
    /// # Arguments
    /// * `bytes` - Raw file contents
    /// * `extension` - Optional file extension used as a probing hint
    ///
    /// # Errors
    /// `UnsupportedFormat` when no container/codec matches, `DecodeError`
    /// when the stream is corrupt or contains no audio.
    pub fn decode_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioSource> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeError("input is empty".to_string()));
        }

        let byte_len = bytes.len();
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to probe input: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut source_channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut scratch: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioError::DecodeError(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // A corrupt packet is skipped, the rest of the stream may be fine
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!(error = %e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            let channels = spec.channels.count();
            source_channels.get_or_insert(channels as u16);

            let needed = decoded.capacity() * channels;
            if scratch.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                scratch = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            if let Some(buffer) = scratch.as_mut() {
                buffer.copy_interleaved_ref(decoded);
                fold_to_stereo(buffer.samples(), channels, &mut samples);
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| AudioError::DecodeError("Unknown sample rate".to_string()))?;

        if samples.is_empty() {
            return Err(AudioError::DecodeError(
                "Stream contains no audio frames".to_string(),
            ));
        }

        let buffer = AudioBuffer::new(
            samples,
            AudioFormat::stereo_f32(SampleRate::new(sample_rate)),
        );

        tracing::debug!(
            bytes = byte_len,
            sample_rate,
            frames = buffer.frames(),
            duration_secs = buffer.duration_secs(),
            "Decoded audio"
        );

        Ok(AudioSource::new(buffer, source_channels.unwrap_or(2)))
    }
}

/// Append interleaved `input` with `channels` channels to `output` as stereo
///
/// Layouts follow the usual channel order: L, R, C, LFE, SL, SR.
fn fold_to_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
    if channels == 0 {
        return;
    }

    output.reserve(input.len() / channels * 2);

    for frame in input.chunks_exact(channels) {
        let (l, r) = match channels {
            1 => (frame[0], frame[0]),
            2 => (frame[0], frame[1]),
            3 => {
                let c = frame[2] * CENTER_MIX;
                (frame[0] + c, frame[1] + c)
            }
            4 => (
                frame[0] + frame[2] * CENTER_MIX,
                frame[1] + frame[3] * CENTER_MIX,
            ),
            5 => {
                let c = frame[2] * CENTER_MIX;
                (
                    frame[0] + c + frame[3] * CENTER_MIX,
                    frame[1] + c + frame[4] * CENTER_MIX,
                )
            }
            _ => {
                let c = (frame[2] + frame[3]) * CENTER_MIX;
                (
                    frame[0] + c + frame[4] * CENTER_MIX,
                    frame[1] + c + frame[5] * CENTER_MIX,
                )
            }
        };
        output.push(l.clamp(-1.0, 1.0));
        output.push(r.clamp(-1.0, 1.0));
    }
}
