//! Source upload for the transformation backend.

use crate::client::{check_status, parse_json, TransformClient};
use crate::error::{Result, TransformClientError};
use crate::types::UploadResponse;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

impl TransformClient {
    /// Upload an in-memory audio file.
    ///
    /// Returns the backend's file id along with whatever analysis it ran.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadResponse> {
        let size = bytes.len();
        debug!(file = %filename, size, "Uploading audio");

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type_for_file(Path::new(filename)))?;

        self.send_upload(Form::new().part("file", part), filename, size as u64)
            .await
    }

    /// Upload a file from disk without reading it into memory first.
    pub async fn upload_file(&self, file_path: &Path) -> Result<UploadResponse> {
        if !file_path.exists() {
            return Err(TransformClientError::FileNotFound(
                file_path.display().to_string(),
            ));
        }

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        let file = File::open(file_path).await?;
        let size = file.metadata().await?.len();
        debug!(file = %file_path.display(), size, "Uploading audio file");

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, size)
            .file_name(file_name.clone())
            .mime_str(mime_type_for_file(file_path))?;

        self.send_upload(Form::new().part("file", part), &file_name, size)
            .await
    }

    async fn send_upload(&self, form: Form, file_name: &str, size: u64) -> Result<UploadResponse> {
        let url = self.endpoint("/api/upload");

        let response = self.http.post(&url).multipart(form).send().await?;
        let upload: UploadResponse = parse_json(check_status(response).await?, "upload").await?;

        info!(
            file_id = %upload.file_id,
            file = %file_name,
            size,
            duration = ?upload.duration,
            bpm = ?upload.bpm,
            key = ?upload.key,
            "Audio uploaded"
        );

        Ok(upload)
    }
}

/// Get MIME type for audio file.
fn mime_type_for_file(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("aac") => "audio/aac",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
