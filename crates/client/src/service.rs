//! The remote media service as seen by the job controller.
//!
//! [`MediaService`] is the seam between the lifecycle logic and HTTP:
//! [`EditorApi`] implements it for the real service, tests substitute a
//! scripted implementation.

use std::path::Path;

use async_trait::async_trait;

use editkit_core::job::JobStatus;
use editkit_core::media::MediaKind;
use editkit_core::params::TransformParameters;
use editkit_core::session::UploadInfo;
use editkit_core::types::{JobHandle, UploadHandle};

use crate::api::{ApiError, EditorApi};
use crate::upload::ProgressFn;

#[async_trait]
pub trait MediaService: Send + Sync {
    /// Transfer a file and return its handle plus metadata.
    async fn upload(
        &self,
        kind: MediaKind,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<UploadInfo, ApiError>;

    /// Submit a job; the returned status carries the new [`JobHandle`].
    async fn submit(
        &self,
        upload: &UploadHandle,
        params: &TransformParameters,
    ) -> Result<JobStatus, ApiError>;

    /// Current status of a job.
    async fn status(&self, kind: MediaKind, job: &JobHandle) -> Result<JobStatus, ApiError>;

    /// Absolute URL of a finished artifact. `advertised` is the
    /// service-provided `download_url`, when it sent one.
    fn artifact_url(&self, kind: MediaKind, job: &JobHandle, advertised: Option<&str>) -> String;

    /// Stream an artifact to `destination`, returning bytes written.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, ApiError>;
}

#[async_trait]
impl MediaService for EditorApi {
    async fn upload(
        &self,
        kind: MediaKind,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<UploadInfo, ApiError> {
        EditorApi::upload(self, kind, path, progress).await
    }

    async fn submit(
        &self,
        upload: &UploadHandle,
        params: &TransformParameters,
    ) -> Result<JobStatus, ApiError> {
        EditorApi::submit(self, upload, params).await
    }

    async fn status(&self, kind: MediaKind, job: &JobHandle) -> Result<JobStatus, ApiError> {
        EditorApi::status(self, kind, job).await
    }

    fn artifact_url(
        &self,
        kind: MediaKind,
        job: &JobHandle,
        advertised: Option<&str>,
    ) -> String {
        match advertised {
            Some(path) => self.url(path),
            None => self.url(&EditorApi::download_path(kind, job)),
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64, ApiError> {
        EditorApi::download(self, url, destination).await
    }
}
