//! Job states and the status value reconstructed from each poll.

use serde::{Deserialize, Serialize};

use crate::types::{JobHandle, Timestamp};

/// Highest progress value a job can report.
pub const PROGRESS_MAX: u8 = 100;

/// Lifecycle state of a remote transformation job.
///
/// `queued` and `pending` are the same state on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// `completed` and `failed` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job as observed by one status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub job: JobHandle,
    pub state: JobState,
    /// Completion percentage, 0-100.
    pub progress: u8,
    /// Present only when `state` is [`JobState::Failed`].
    pub error: Option<String>,
    /// Service-relative path of the finished artifact, when advertised.
    pub download_url: Option<String>,
    pub observed_at: Timestamp,
}

impl JobStatus {
    /// Build a status from raw wire values.
    ///
    /// Progress is clamped to 0-100 and forced to 100 for completed jobs.
    /// An error text is kept only for failed jobs; a failed job without
    /// one gets `"Unknown error"`.
    pub fn new(job: JobHandle, state: JobState, progress: f64, error: Option<String>) -> Self {
        let progress = if state == JobState::Completed {
            PROGRESS_MAX
        } else {
            clamp_progress(progress)
        };
        let error = match state {
            JobState::Failed => Some(error.unwrap_or_else(|| "Unknown error".to_string())),
            _ => None,
        };
        Self {
            job,
            state,
            progress,
            error,
            download_url: None,
            observed_at: chrono::Utc::now(),
        }
    }

    pub fn with_download_url(mut self, url: Option<String>) -> Self {
        self.download_url = url;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Enforce non-decreasing progress relative to an earlier observation
    /// of the same job. Returns `true` when the value had to be raised.
    pub fn carry_progress_from(&mut self, previous: &JobStatus) -> bool {
        if previous.job == self.job && self.progress < previous.progress {
            self.progress = previous.progress;
            true
        } else {
            false
        }
    }
}

/// Clamp a reported progress value into 0-100. NaN counts as 0.
pub fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() || raw <= 0.0 {
        0
    } else if raw >= f64::from(PROGRESS_MAX) {
        PROGRESS_MAX
    } else {
        raw.floor() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobHandle {
        JobHandle::new("J1")
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Processing.is_terminal());
    }

    #[test]
    fn pending_is_an_alias_for_queued() {
        let state: JobState = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(state, JobState::Queued);
        let state: JobState = serde_json::from_str(r#""queued""#).unwrap();
        assert_eq!(state, JobState::Queued);
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(serde_json::from_str::<JobState>(r#""exploded""#).is_err());
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(clamp_progress(-5.0), 0);
        assert_eq!(clamp_progress(f64::NAN), 0);
        assert_eq!(clamp_progress(42.9), 42);
        assert_eq!(clamp_progress(250.0), 100);
    }

    #[test]
    fn completed_forces_full_progress() {
        let status = JobStatus::new(job(), JobState::Completed, 10.0, None);
        assert_eq!(status.progress, 100);
    }

    #[test]
    fn error_only_kept_for_failed() {
        let ok = JobStatus::new(job(), JobState::Processing, 5.0, Some("noise".into()));
        assert!(ok.error.is_none());

        let failed = JobStatus::new(job(), JobState::Failed, 5.0, None);
        assert_eq!(failed.error.as_deref(), Some("Unknown error"));
    }

    #[test]
    fn progress_never_goes_backwards_for_same_job() {
        let earlier = JobStatus::new(job(), JobState::Processing, 60.0, None);
        let mut later = JobStatus::new(job(), JobState::Processing, 40.0, None);
        assert!(later.carry_progress_from(&earlier));
        assert_eq!(later.progress, 60);

        let mut other = JobStatus::new(JobHandle::new("J2"), JobState::Processing, 0.0, None);
        assert!(!other.carry_progress_from(&earlier));
        assert_eq!(other.progress, 0);
    }
}
