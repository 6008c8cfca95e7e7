//! Per-controller editing session state.
//!
//! An [`EditSession`] is an explicit value rather than process-wide state,
//! so any number of independent sessions can coexist.

use serde::Serialize;
use uuid::Uuid;

use crate::job::JobStatus;
use crate::media::MediaKind;
use crate::params::TransformParameters;
use crate::types::{Dimensions, JobHandle, UploadHandle};

/// Metadata returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadInfo {
    pub handle: UploadHandle,
    pub kind: MediaKind,
    /// Sanitised file name as stored by the service.
    pub file_name: String,
    pub size_bytes: u64,
    pub dimensions: Option<Dimensions>,
    /// Video duration in seconds.
    pub duration_secs: Option<f64>,
}

/// Everything one editing panel knows about its current work.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub id: Uuid,
    pub upload: Option<UploadInfo>,
    pub parameters: Option<TransformParameters>,
    pub job: Option<JobHandle>,
    pub last_status: Option<JobStatus>,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            upload: None,
            parameters: None,
            job: None,
            last_status: None,
        }
    }

    /// The job handle, if a job was submitted and has not reached a
    /// terminal state.
    pub fn active_job(&self) -> Option<&JobHandle> {
        let job = self.job.as_ref()?;
        match &self.last_status {
            Some(status) if status.job == *job && status.is_terminal() => None,
            _ => Some(job),
        }
    }

    /// Drop the job and its status while keeping the upload.
    pub fn clear_job(&mut self) {
        self.parameters = None;
        self.job = None;
        self.last_status = None;
    }

    /// Return to a clean state. The session id is kept.
    pub fn reset(&mut self) {
        self.upload = None;
        self.clear_job();
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}
