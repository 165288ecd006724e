//! Fetching transformed audio.

use crate::client::{check_status, TransformClient};
use crate::error::Result;
use crate::types::{DownloadProgress, ExportSettings};
use futures_util::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

impl TransformClient {
    /// Download the transformed audio of a completed task.
    pub async fn download(&self, task_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("/api/download/{}", task_id));
        debug!(url = %url, task_id = %task_id, "Downloading transformed audio");

        let response = check_status(self.http.get(&url).send().await?).await?;
        let bytes = response.bytes().await?;

        info!(task_id = %task_id, size = bytes.len(), "Transformed audio downloaded");
        Ok(bytes.to_vec())
    }

    /// Stream the transformed audio of a completed task to disk.
    ///
    /// Parent directories are created as needed. `progress_callback` is
    /// called after every received chunk.
    pub async fn download_to_path<F>(
        &self,
        task_id: &str,
        dest_path: &Path,
        mut progress_callback: F,
    ) -> Result<u64>
    where
        F: FnMut(DownloadProgress),
    {
        let url = self.endpoint(&format!("/api/download/{}", task_id));
        debug!(url = %url, task_id = %task_id, dest = %dest_path.display(), "Downloading to file");

        let response = check_status(self.http.get(&url).send().await?).await?;
        let expected = response.content_length();

        if let Some(dir) = dest_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut out = File::create(dest_path).await?;
        let mut received: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(piece) = body.next().await {
            let piece = piece?;
            out.write_all(&piece).await?;
            received += piece.len() as u64;

            progress_callback(DownloadProgress {
                task_id: task_id.to_string(),
                bytes_received: received,
                bytes_total: expected,
                progress: match expected {
                    Some(total) if total > 0 => received as f32 / total as f32,
                    _ => 0.0,
                },
            });
        }

        out.flush().await?;

        info!(
            task_id = %task_id,
            dest = %dest_path.display(),
            size = received,
            "Transformed audio saved"
        );

        Ok(received)
    }

    /// Re-encode a completed task's result and return the exported file.
    pub async fn export(&self, task_id: &str, settings: ExportSettings) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("/api/export/{}", task_id));
        debug!(
            task_id = %task_id,
            format = ?settings.format,
            quality = ?settings.quality,
            "Exporting"
        );

        let response = check_status(self.http.post(&url).json(&settings).send().await?).await?;
        let bytes = response.bytes().await?;

        info!(
            task_id = %task_id,
            format = settings.format.extension(),
            size = bytes.len(),
            "Export ready"
        );
        Ok(bytes.to_vec())
    }
}
