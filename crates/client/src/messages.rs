//! Wire types exchanged with the editing service.
//!
//! Responses are JSON objects; failures carry `{"error": "..."}` with a
//! non-2xx status. Request bodies are built with `serde_json::json!` from
//! the strongly-typed [`TransformParameters`].

use serde::Deserialize;

use editkit_core::job::{JobState, JobStatus};
use editkit_core::media::MediaKind;
use editkit_core::params::{TransformParameters, VideoTransform};
use editkit_core::session::UploadInfo;
use editkit_core::types::{Dimensions, JobHandle, UploadHandle};

/// Body of every error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response of `POST /api/{kind}/upload`.
///
/// Photos report `dimensions`; videos report `resolution` and `duration`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub upload_id: String,
    pub filename: String,
    /// Size in bytes. Videos report it as a float.
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub resolution: Option<Dimensions>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl UploadResponse {
    pub fn into_info(self, kind: MediaKind) -> UploadInfo {
        UploadInfo {
            handle: UploadHandle::new(self.upload_id),
            kind,
            file_name: self.filename,
            size_bytes: if self.size.is_finite() && self.size > 0.0 {
                self.size.round() as u64
            } else {
                0
            },
            dimensions: self.dimensions.or(self.resolution),
            duration_secs: self.duration,
        }
    }
}

/// Response of the job submission routes.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl SubmitResponse {
    /// The status implied by the submission itself (progress 0 unless the
    /// service already finished the job).
    pub fn into_status(self) -> JobStatus {
        JobStatus::new(JobHandle::new(self.job_id), self.status, 0.0, None)
            .with_download_url(self.download_url)
    }
}

/// Response of `GET /api/{kind}/status/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: JobState,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl StatusResponse {
    /// Convert to a [`JobStatus`] for `job`. The echoed `job_id`, when
    /// present, is informational only.
    pub fn into_status(self, job: JobHandle) -> JobStatus {
        JobStatus::new(job, self.status, self.progress, self.error)
            .with_download_url(self.download_url)
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Response of `GET /api/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub photo_processing: PhotoCapabilities,
    pub video_processing: VideoCapabilities,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoCapabilities {
    pub filters: Vec<String>,
    pub enhancers: Vec<String>,
    pub enhancer_range: (f64, f64),
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoCapabilities {
    pub resolutions: Vec<String>,
    pub quality_presets: Vec<String>,
    pub resize_types: Vec<String>,
    pub supported_formats: Vec<String>,
}

/// Route (relative to the base URL) and JSON body for submitting
/// `params` against `upload`.
pub fn submit_request(
    upload: &UploadHandle,
    params: &TransformParameters,
) -> (&'static str, serde_json::Value) {
    let upload_id = upload.as_str();
    match params {
        TransformParameters::Photo(effects) => (
            "/api/photo/process",
            serde_json::json!({
                "upload_id": upload_id,
                "effects": effects,
            }),
        ),
        TransformParameters::Video(VideoTransform::Upscale {
            resolution,
            quality,
        }) => (
            "/api/video/upscale",
            serde_json::json!({
                "upload_id": upload_id,
                "resolution": resolution,
                "quality": quality,
            }),
        ),
        TransformParameters::Video(VideoTransform::ResizeFileSize { target_mb }) => (
            "/api/video/resize",
            serde_json::json!({
                "upload_id": upload_id,
                "resize_type": "filesize",
                "target_mb": target_mb,
            }),
        ),
        TransformParameters::Video(VideoTransform::Trim {
            start_time,
            duration,
        }) => {
            let mut body = serde_json::json!({
                "upload_id": upload_id,
                "resize_type": "duration",
                "start_time": start_time,
            });
            if let Some(d) = duration {
                body["duration"] = serde_json::json!(d);
            }
            ("/api/video/resize", body)
        }
        TransformParameters::Video(VideoTransform::ResizeDimensions {
            width,
            height,
            maintain_aspect,
            quality,
        }) => (
            "/api/video/resize",
            serde_json::json!({
                "upload_id": upload_id,
                "resize_type": "dimensions",
                "width": width,
                "height": height,
                "maintain_aspect": maintain_aspect,
                "quality": quality,
            }),
        ),
    }
}
