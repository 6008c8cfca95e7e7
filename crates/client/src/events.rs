//! Lifecycle events emitted by the job controller.
//!
//! These represent state changes a presentation layer cares about
//! (progress bars, enabling the download button). User-facing messages
//! travel separately as notifications.

use serde::Serialize;
use uuid::Uuid;

use editkit_core::job::JobState;
use editkit_core::media::MediaKind;
use editkit_core::types::{JobHandle, UploadHandle};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JobEvent {
    /// A file was accepted by the service.
    Uploaded {
        session_id: Uuid,
        upload: UploadHandle,
        kind: MediaKind,
    },

    /// A job was accepted and polling is about to start.
    Submitted {
        session_id: Uuid,
        job: JobHandle,
        operation: &'static str,
    },

    /// A non-terminal status was observed.
    Progress {
        session_id: Uuid,
        job: JobHandle,
        state: JobState,
        /// Completion percentage (0-100), never lower than the previous event.
        percent: u8,
    },

    /// The job finished; the artifact can be retrieved.
    Completed {
        session_id: Uuid,
        job: JobHandle,
        download_url: Option<String>,
    },

    /// The service reported a terminal failure.
    Failed {
        session_id: Uuid,
        job: JobHandle,
        error: String,
    },

    /// Polling was stopped by the caller before a terminal state.
    PollingCancelled { session_id: Uuid, job: JobHandle },

    /// Polling hit the configured attempt cap before a terminal state.
    PollingAbandoned {
        session_id: Uuid,
        job: JobHandle,
        attempts: u32,
    },
}

impl JobEvent {
    /// The job this event concerns, if any.
    pub fn job(&self) -> Option<&JobHandle> {
        match self {
            Self::Uploaded { .. } => None,
            Self::Submitted { job, .. }
            | Self::Progress { job, .. }
            | Self::Completed { job, .. }
            | Self::Failed { job, .. }
            | Self::PollingCancelled { job, .. }
            | Self::PollingAbandoned { job, .. } => Some(job),
        }
    }
}
