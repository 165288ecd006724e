//! Harmonia Server Client
//!
//! HTTP client for the remote transformation backend.
//!
//! # Features
//!
//! - **Upload**: in-memory or streamed from disk, with the backend's analysis
//! - **Processing**: start a transformation and poll its status to completion
//! - **Download/Export**: fetch the result as bytes, to a file, or re-encoded
//! - **Presets**: emotional intentions mapped to transformation settings
//!
//! # Example
//!
//! ```ignore
//! use harmonia_core::HarmoniaConfig;
//! use harmonia_server_client::{EmotionalIntention, TransformClient, TransformationSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarmoniaConfig::load(None)?;
//!     let client = TransformClient::new(&config.server)?;
//!
//!     let upload = client.upload_file("track.mp3".as_ref()).await?;
//!     let settings = TransformationSettings::for_intention(EmotionalIntention::Wellbeing);
//!     let task_id = client.start_processing(&upload.file_id, &settings).await?;
//!
//!     client
//!         .wait_for_completion(&task_id, |s| println!("{:?} {:.0}%", s.status, s.progress))
//!         .await?;
//!     client.download_to_path(&task_id, "out.wav".as_ref(), |_| {}).await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod download;
mod error;
mod types;
mod upload;

pub use client::TransformClient;
pub use error::{Result, TransformClientError};
pub use types::{
    BinauralBeat, BrainwaveType, DownloadProgress, EmotionalIntention, ExportFormat,
    ExportQuality, ExportSettings, HealthResponse, ProcessResponse, ProcessingStatus,
    TransformOutcome, TransformStatus, TransformationSettings, UploadResponse,
    DEFAULT_BINAURAL_VOLUME,
};
