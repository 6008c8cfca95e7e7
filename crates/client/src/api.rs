//! REST API client for the photo/video editing service.
//!
//! Wraps the service's HTTP endpoints (upload, job submission, status,
//! download, health, capabilities) using [`reqwest`].

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use editkit_core::job::JobStatus;
use editkit_core::media::{FileCandidate, MediaKind};
use editkit_core::params::TransformParameters;
use editkit_core::session::UploadInfo;
use editkit_core::types::{JobHandle, UploadHandle};

use crate::messages::{
    submit_request, ErrorBody, HealthResponse, ServiceInfo, StatusResponse, SubmitResponse,
    UploadResponse,
};
use crate::upload::{progress_body, ProgressFn};

/// HTTP client for one editing service instance.
#[derive(Clone)]
pub struct EditorApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, bad JSON).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{message} (HTTP {status})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The service's `error` text, or the raw body when it has none.
        message: String,
    },

    /// Reading the input file or writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Human-readable message without transport noise, for notifications.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl EditorApi {
    /// Create a new API client.
    ///
    /// * `base_url` - service root, e.g. `http://localhost:5000`. A
    ///   trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Create an API client whose requests time out after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a service-relative path (or pass an absolute URL through).
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Upload a file as multipart field `file`.
    ///
    /// The body is streamed from disk; `progress` is called for every
    /// chunk handed to the transport.
    pub async fn upload(
        &self,
        kind: MediaKind,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<UploadInfo, ApiError> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let candidate = FileCandidate::new(file_name.clone(), total);

        let part = reqwest::multipart::Part::stream_with_length(
            progress_body(file, total, progress),
            total,
        )
        .file_name(file_name)
        .mime_str(&candidate.mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/api/{kind}/upload")))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::parse_response(response).await?;
        Ok(body.into_info(kind))
    }

    /// Submit a transformation job for a previously uploaded file.
    pub async fn submit(
        &self,
        upload: &UploadHandle,
        params: &TransformParameters,
    ) -> Result<JobStatus, ApiError> {
        let (route, body) = submit_request(upload, params);

        let response = self.client.post(self.url(route)).json(&body).send().await?;

        let body: SubmitResponse = Self::parse_response(response).await?;
        Ok(body.into_status())
    }

    /// Query the current status of a job.
    pub async fn status(&self, kind: MediaKind, job: &JobHandle) -> Result<JobStatus, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/{kind}/status/{job}")))
            .send()
            .await?;

        let body: StatusResponse = Self::parse_response(response).await?;
        Ok(body.into_status(job.clone()))
    }

    /// Default download path for a finished job.
    pub fn download_path(kind: MediaKind, job: &JobHandle) -> String {
        format!("/api/{kind}/download/{job}")
    }

    /// Stream the resource at `url` into `destination`, returning the
    /// number of bytes written. A partially written file is removed on
    /// failure.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64, ApiError> {
        let response = self.client.get(self.url(url)).send().await?;
        let response = Self::ensure_success(response).await?;

        let result = Self::write_stream(response, destination).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(destination).await;
        }
        result
    }

    /// Service liveness check.
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        Self::parse_response(response).await
    }

    /// Service capabilities (filters, presets, formats).
    pub async fn info(&self) -> Result<ServiceInfo, ApiError> {
        let response = self.client.get(self.url("/api/info")).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    async fn write_stream(
        response: reqwest::Response,
        destination: &Path,
    ) -> Result<u64, ApiError> {
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying
    /// the service's `error` text (or the raw body) on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
