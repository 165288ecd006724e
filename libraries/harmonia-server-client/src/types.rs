//! Types for transformation API requests and responses.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Transformation Settings
// =============================================================================

/// Brainwave band a binaural beat is tuned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainwaveType {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl BrainwaveType {
    /// Beat frequency the backend generates for this band, in Hz.
    pub fn beat_frequency_hz(self) -> f64 {
        match self {
            Self::Delta => 2.0,
            Self::Theta => 6.0,
            Self::Alpha => 10.0,
            Self::Beta => 20.0,
            Self::Gamma => 40.0,
        }
    }

    /// Frequency range of the band, in Hz.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Self::Delta => (0.5, 4.0),
            Self::Theta => (4.0, 8.0),
            Self::Alpha => (8.0, 13.0),
            Self::Beta => (13.0, 30.0),
            Self::Gamma => (30.0, 100.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Theta => "theta",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Gamma => "gamma",
        }
    }
}

impl fmt::Display for BrainwaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binaural beat layered over the transformed track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinauralBeat {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: BrainwaveType,
    /// Mix level, 0.0 to 1.0
    pub volume: f64,
}

/// Body of `POST /api/process/{file_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationSettings {
    /// Reference pitch for A4 in Hz (430-450)
    pub tuning: f64,
    /// Tempo change in percent (-20 to +20)
    pub bpm_adjustment: f64,
    pub binaural_beat: BinauralBeat,
    /// Solfeggio tone mixed under the track, in Hz
    pub therapeutic_frequency: f64,
    pub intention: String,
}

impl TransformationSettings {
    /// Settings the questionnaire applies for a top-level intention.
    pub fn for_intention(intention: EmotionalIntention) -> Self {
        Self {
            tuning: intention.tuning(),
            bpm_adjustment: intention.bpm_adjustment(),
            binaural_beat: BinauralBeat {
                enabled: true,
                kind: intention.brainwave(),
                volume: DEFAULT_BINAURAL_VOLUME,
            },
            therapeutic_frequency: intention.frequencies()[0],
            intention: intention.id().to_string(),
        }
    }

    /// Same settings with a different therapeutic tone.
    ///
    /// The intention id becomes `<intention>_<option>`, matching what the
    /// backend logs for refined choices.
    pub fn with_frequency(mut self, option: &str, frequency_hz: f64) -> Self {
        self.therapeutic_frequency = frequency_hz;
        self.intention = format!("{}_{}", self.intention, option);
        self
    }
}

/// Mix level used when an intention enables the binaural beat.
pub const DEFAULT_BINAURAL_VOLUME: f64 = 0.3;

/// Emotional goal a transformation is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalIntention {
    /// Pain relief, regeneration, restorative sleep
    Healing,
    /// Releasing fear, balance, stress reduction
    Wellbeing,
    /// Focus, creativity, drive
    Energy,
    /// Intuition, awakening
    Spirituality,
}

impl EmotionalIntention {
    pub const ALL: [Self; 4] = [
        Self::Healing,
        Self::Wellbeing,
        Self::Energy,
        Self::Spirituality,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Healing => "healing",
            Self::Wellbeing => "wellbeing",
            Self::Energy => "energy",
            Self::Spirituality => "spirituality",
        }
    }

    /// Solfeggio tones associated with the intention; the first is the default.
    pub fn frequencies(self) -> &'static [f64] {
        match self {
            Self::Healing => &[174.0, 285.0],
            Self::Wellbeing => &[396.0, 528.0, 639.0],
            Self::Energy => &[417.0],
            Self::Spirituality => &[741.0, 852.0, 963.0],
        }
    }

    pub fn bpm_adjustment(self) -> f64 {
        match self {
            Self::Healing => -20.0,
            Self::Wellbeing => -10.0,
            Self::Energy => 10.0,
            Self::Spirituality => 0.0,
        }
    }

    pub fn brainwave(self) -> BrainwaveType {
        match self {
            Self::Healing => BrainwaveType::Delta,
            Self::Wellbeing => BrainwaveType::Alpha,
            Self::Energy => BrainwaveType::Beta,
            Self::Spirituality => BrainwaveType::Theta,
        }
    }

    pub fn tuning(self) -> f64 {
        match self {
            Self::Energy => 440.0,
            _ => 432.0,
        }
    }

    /// Look up an intention by its wire id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.id() == id)
    }
}

// =============================================================================
// Upload / Processing Types
// =============================================================================

/// Response from `POST /api/upload`.
///
/// Only `file_id` is guaranteed. The analysis fields are whatever the
/// backend chose to report; `bpm` and `key` may be estimates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Response from `POST /api/process/{file_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessResponse {
    pub task_id: String,
    pub status: Option<TransformStatus>,
}

/// Server-side task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

impl TransformStatus {
    /// `completed` and `error` end a task; everything else keeps polling.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Response from `GET /api/status/{task_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcessingStatus {
    pub status: TransformStatus,
    /// 0 to 100
    #[serde(default)]
    pub progress: f32,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ProcessingStatus {
    /// Text to surface for a failed task: `message`, then `error`.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Processing failed".to_string())
    }
}

/// Everything a one-shot [`transform`](crate::TransformClient::transform) produced.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub upload: UploadResponse,
    pub task_id: String,
    /// The terminal `completed` status
    pub status: ProcessingStatus,
}

// =============================================================================
// Export / Download Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Wav,
    Mp3,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    #[default]
    Standard,
    /// 320k MP3 or 24-bit WAV
    High,
}

/// Body of `POST /api/export/{task_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub quality: ExportQuality,
}

/// Download progress information.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub task_id: String,
    pub bytes_received: u64,
    pub bytes_total: Option<u64>,
    /// Progress as 0.0 to 1.0
    pub progress: f32,
}

/// Response from `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: String,
}
