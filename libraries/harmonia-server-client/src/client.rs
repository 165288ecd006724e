//! Transformation API client.

use crate::error::{Result, TransformClientError};
use crate::types::{
    ErrorBody, HealthResponse, ProcessResponse, ProcessingStatus, TransformOutcome,
    TransformStatus, TransformationSettings,
};
use harmonia_core::ServerSettings;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the Harmonia transformation backend.
///
/// Drives the upload → process → poll → download cycle. Each call is a
/// single request except [`wait_for_completion`](Self::wait_for_completion),
/// which polls until the task reaches a terminal state.
///
/// # Example
///
/// ```ignore
/// use harmonia_server_client::{EmotionalIntention, TransformClient, TransformationSettings};
///
/// let client = TransformClient::from_url("http://localhost:8000")?;
/// let settings = TransformationSettings::for_intention(EmotionalIntention::Healing);
///
/// let outcome = client
///     .transform(bytes, "track.mp3", &settings, |s| println!("{:.0}%", s.progress))
///     .await?;
/// let audio = client.download(&outcome.task_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransformClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    poll_interval: Duration,
}

impl TransformClient {
    /// Create a client from the `server` configuration section.
    pub fn new(settings: &ServerSettings) -> Result<Self> {
        let base_url = normalize_url(&settings.url)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Harmonia/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
        })
    }

    /// Create a client for `url` with default timeouts and poll interval.
    pub fn from_url(url: &str) -> Result<Self> {
        Self::new(&ServerSettings {
            url: url.to_string(),
            ..ServerSettings::default()
        })
    }

    /// Base URL with trailing slashes removed.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Check that the backend is reachable.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("/api/health");
        debug!(url = %url, "Checking backend health");

        let response = self.http.get(&url).send().await?;
        let health: HealthResponse = parse_json(check_status(response).await?, "health").await?;

        info!(status = %health.status, service = ?health.service, "Backend reachable");
        Ok(health)
    }

    /// Start server-side processing of an uploaded file.
    ///
    /// Returns the task id to poll.
    pub async fn start_processing(
        &self,
        file_id: &str,
        settings: &TransformationSettings,
    ) -> Result<String> {
        let url = self.endpoint(&format!("/api/process/{}", file_id));
        debug!(
            file_id = %file_id,
            intention = %settings.intention,
            tuning = settings.tuning,
            "Starting transformation"
        );

        let response = self.http.post(&url).json(settings).send().await?;
        let process: ProcessResponse =
            parse_json(check_status(response).await?, "process").await?;

        info!(file_id = %file_id, task_id = %process.task_id, "Transformation started");
        Ok(process.task_id)
    }

    /// Fetch the current state of a task once.
    pub async fn status(&self, task_id: &str) -> Result<ProcessingStatus> {
        let url = self.endpoint(&format!("/api/status/{}", task_id));

        let response = self.http.get(&url).send().await?;
        parse_json(check_status(response).await?, "status").await
    }

    /// Poll a task until it completes or fails.
    ///
    /// `on_status` sees every status received, including the terminal one.
    /// `idle` and `processing` keep polling at the configured interval with
    /// no deadline. A failed request ends the loop immediately; there is no
    /// retry.
    pub async fn wait_for_completion<F>(
        &self,
        task_id: &str,
        mut on_status: F,
    ) -> Result<ProcessingStatus>
    where
        F: FnMut(&ProcessingStatus),
    {
        let mut polls = 0u32;

        loop {
            let status = match self.status(task_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(task_id = %task_id, polls, error = %e, "Status poll failed");
                    return Err(e);
                }
            };
            polls += 1;

            debug!(
                task_id = %task_id,
                status = ?status.status,
                progress = status.progress,
                "Task status"
            );
            on_status(&status);

            match status.status {
                TransformStatus::Completed => {
                    info!(task_id = %task_id, polls, "Transformation completed");
                    return Ok(status);
                }
                TransformStatus::Error => {
                    let message = status.failure_message();
                    warn!(task_id = %task_id, message = %message, "Transformation failed");
                    return Err(TransformClientError::RemoteTransform { message });
                }
                TransformStatus::Idle | TransformStatus::Processing => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Upload, start processing and wait for the result in one call.
    pub async fn transform<F>(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        settings: &TransformationSettings,
        on_status: F,
    ) -> Result<TransformOutcome>
    where
        F: FnMut(&ProcessingStatus),
    {
        let upload = self.upload(bytes, filename).await?;
        let task_id = self.start_processing(&upload.file_id, settings).await?;
        let status = self.wait_for_completion(&task_id, on_status).await?;

        Ok(TransformOutcome {
            upload,
            task_id,
            status,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransformClientError::InvalidUrl(
            "URL cannot be empty".into(),
        ));
    }

    let parsed = Url::parse(trimmed).map_err(|e| TransformClientError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TransformClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Turn a non-success response into `ServerError`, using FastAPI's
/// `detail` field when present.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.detail)
        .unwrap_or(body);

    Err(TransformClientError::ServerError {
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response.json().await.map_err(|e| {
        TransformClientError::ParseError(format!("Failed to parse {} response: {}", what, e))
    })
}
