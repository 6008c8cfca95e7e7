//! Job lifecycle controller.
//!
//! [`JobController`] drives one editing session through
//! upload -> submit -> poll -> resolve against a [`MediaService`]. Each
//! controller owns exactly one [`EditSession`]; independent panels use
//! independent controllers.
//!
//! Polling runs as a spawned task holding a child of the controller's
//! master [`CancellationToken`]. At most one polling task exists at a
//! time: a new submission, [`cancel_polling`](JobController::cancel_polling),
//! [`reset`](JobController::reset) or [`shutdown`](JobController::shutdown)
//! stops the previous one before anything else happens.
//!
//! Lifecycle events are broadcast via [`JobController::subscribe`];
//! user-visible messages via [`JobController::notifications`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use editkit_core::job::{JobState, JobStatus};
use editkit_core::media::{FileCandidate, MediaKind};
use editkit_core::notification::Notification;
use editkit_core::params::TransformParameters;
use editkit_core::session::{EditSession, UploadInfo};
use editkit_core::types::{JobHandle, UploadHandle};
use editkit_core::CoreError;

use crate::events::JobEvent;
use crate::notifier::Notifier;
use crate::poller::{run_polling, PollConfig, PollExit, PollStep};
use crate::service::MediaService;
use crate::upload::ProgressFn;

/// Broadcast channel capacity for lifecycle events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for a cancelled polling task before aborting it.
const POLL_TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Where to fetch the artifact of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub job: JobHandle,
    pub kind: MediaKind,
    /// Absolute download URL.
    pub url: String,
}

/// Drives one editing session against a remote media service.
pub struct JobController {
    inner: Arc<Inner>,
    /// The active polling task. Held across a whole submission so that
    /// overlapping submissions are serialised.
    poll_task: Mutex<Option<PollTask>>,
    /// Master cancellation token, cancelled on shutdown or drop.
    cancel: CancellationToken,
}

/// State shared with the polling task.
struct Inner {
    service: Arc<dyn MediaService>,
    poll_config: PollConfig,
    session: Mutex<EditSession>,
    event_tx: broadcast::Sender<JobEvent>,
    notifier: Notifier,
    /// Latest status of the session's job; `None` when no job is being
    /// tracked or tracking stopped early.
    status_tx: watch::Sender<Option<JobStatus>>,
}

struct PollTask {
    job: JobHandle,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Result of folding one observed status into the session.
enum Applied {
    /// The status belongs to a job the session no longer tracks.
    Stale,
    Progress(JobStatus),
    /// First terminal observation; notifications have been emitted.
    Terminal(JobStatus),
    /// The job was already terminal; nothing was emitted.
    AlreadyTerminal(JobStatus),
}

impl JobController {
    /// Create a controller with its own notification channel.
    pub fn new(service: Arc<dyn MediaService>, poll_config: PollConfig) -> Self {
        Self::with_notifier(service, poll_config, Notifier::default())
    }

    /// Create a controller that publishes to a shared [`Notifier`], so
    /// several panels can feed one notification surface.
    pub fn with_notifier(
        service: Arc<dyn MediaService>,
        poll_config: PollConfig,
        notifier: Notifier,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                service,
                poll_config,
                session: Mutex::new(EditSession::new()),
                event_tx,
                notifier,
                status_tx,
            }),
            poll_task: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to user-visible notifications.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    /// Snapshot of the session state.
    pub async fn session(&self) -> EditSession {
        self.inner.session.lock().await.clone()
    }

    /// Validate `path` against the policy for `kind`, then upload it.
    ///
    /// Policy violations are reported before any network call. A
    /// successful upload replaces the session's previous upload and
    /// stops tracking any previous job.
    pub async fn upload(
        &self,
        path: &Path,
        kind: MediaKind,
        progress: Option<ProgressFn>,
    ) -> Result<UploadInfo, ControllerError> {
        let checked = match inspect_file(path).await {
            Ok(candidate) => kind.policy().validate(&candidate),
            Err(e) => Err(e),
        };
        if let Err(e) = checked {
            tracing::info!(path = %path.display(), %kind, error = %e, "File rejected");
            self.inner.notifier.error(e.to_string());
            return Err(e.into());
        }

        self.cancel_polling().await;

        let info = match self.inner.service.upload(kind, path, progress).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(path = %path.display(), %kind, error = %e, "Upload failed");
                let message = e.user_message();
                self.inner
                    .notifier
                    .error(format!("Upload failed: {message}"));
                return Err(ControllerError::Upload(message));
            }
        };

        let session_id = {
            let mut session = self.inner.session.lock().await;
            session.reset();
            session.upload = Some(info.clone());
            session.id
        };
        self.inner.status_tx.send_replace(None);

        tracing::info!(
            %session_id,
            upload_id = %info.handle,
            %kind,
            size_bytes = info.size_bytes,
            "File uploaded",
        );
        let _ = self.inner.event_tx.send(JobEvent::Uploaded {
            session_id,
            upload: info.handle.clone(),
            kind,
        });
        self.inner
            .notifier
            .success(format!("Uploaded {}", info.file_name));

        Ok(info)
    }

    /// Submit a job for `upload` and start polling it.
    ///
    /// Any polling loop from an earlier submission is cancelled first.
    /// If the service reports the job as already terminal, no polling
    /// loop is started.
    pub async fn submit(
        &self,
        upload: &UploadHandle,
        params: TransformParameters,
    ) -> Result<JobHandle, ControllerError> {
        let kind = {
            let session = self.inner.session.lock().await;
            match &session.upload {
                Some(info) if upload.is_valid() && info.handle == *upload => info.kind,
                _ => {
                    let message = format!("Unknown upload handle '{upload}'");
                    self.inner
                        .notifier
                        .error(format!("Submission failed: {message}"));
                    return Err(ControllerError::Submission(message));
                }
            }
        };
        if let Err(e) = params.validate_for(kind) {
            self.inner.notifier.error(e.to_string());
            return Err(e.into());
        }

        let mut slot = self.poll_task.lock().await;
        if let Some(previous) = slot.take() {
            self.stop_task(previous).await;
        }

        let initial = match self.inner.service.submit(upload, &params).await {
            Ok(status) if status.job.is_valid() => status,
            Ok(_) => {
                let message = "service returned an empty job id".to_string();
                self.inner
                    .notifier
                    .error(format!("Submission failed: {message}"));
                return Err(ControllerError::Submission(message));
            }
            Err(e) => {
                tracing::warn!(upload_id = %upload, error = %e, "Submission failed");
                let message = e.user_message();
                self.inner
                    .notifier
                    .error(format!("Submission failed: {message}"));
                return Err(ControllerError::Submission(message));
            }
        };
        let job = initial.job.clone();
        let operation = params.operation();

        let session_id = {
            let mut session = self.inner.session.lock().await;
            session.parameters = Some(params);
            session.job = Some(job.clone());
            session.last_status = None;
            session.id
        };

        tracing::info!(%session_id, job_id = %job, upload_id = %upload, operation, "Job submitted");
        let _ = self.inner.event_tx.send(JobEvent::Submitted {
            session_id,
            job: job.clone(),
            operation,
        });
        self.inner.notifier.info(format!("Job {job} submitted"));

        match self.inner.apply_status(initial).await {
            Applied::Terminal(_) | Applied::AlreadyTerminal(_) => {}
            Applied::Progress(_) | Applied::Stale => {
                *slot = Some(self.spawn_poll_task(kind, job.clone()));
            }
        }

        Ok(job)
    }

    /// Query the status of the active job once.
    ///
    /// Returns `Ok(None)` without contacting the service when no job is
    /// active. A terminal result stops the polling loop.
    pub async fn poll(&self) -> Result<Option<JobStatus>, ControllerError> {
        let (kind, job) = {
            let session = self.inner.session.lock().await;
            match (session.active_job(), &session.upload) {
                (Some(job), Some(upload)) => (upload.kind, job.clone()),
                _ => return Ok(None),
            }
        };

        let status = match self.inner.service.status(kind, &job).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(job_id = %job, error = %e, "Status check failed");
                return Err(ControllerError::Poll(e.user_message()));
            }
        };

        match self.inner.apply_status(status).await {
            Applied::Progress(status) => Ok(Some(status)),
            Applied::Terminal(status) | Applied::AlreadyTerminal(status) => {
                self.cancel_polling_for(&job).await;
                Ok(Some(status))
            }
            Applied::Stale => Ok(None),
        }
    }

    /// Stop the polling loop without contacting the service.
    ///
    /// Returns `true` if a running loop was stopped.
    pub async fn cancel_polling(&self) -> bool {
        let task = self.poll_task.lock().await.take();
        self.stop_if_running(task).await
    }

    /// Stop the polling loop only if it still belongs to `job`. A
    /// submission racing with this call may already have installed the
    /// loop of a newer job, which must keep running.
    async fn cancel_polling_for(&self, job: &JobHandle) -> bool {
        let task = {
            let mut slot = self.poll_task.lock().await;
            if slot.as_ref().is_some_and(|task| task.job == *job) {
                slot.take()
            } else {
                None
            }
        };
        self.stop_if_running(task).await
    }

    async fn stop_if_running(&self, task: Option<PollTask>) -> bool {
        match task {
            Some(task) => {
                let was_running = !task.handle.is_finished();
                self.stop_task(task).await;
                was_running
            }
            None => false,
        }
    }

    /// Build the retrieval reference for a completed job.
    pub async fn retrieve_artifact(
        &self,
        job: &JobHandle,
    ) -> Result<ArtifactRef, ControllerError> {
        let session = self.inner.session.lock().await;
        let status = session.last_status.as_ref().filter(|s| s.job == *job);
        let kind = session.upload.as_ref().map(|u| u.kind);

        match (status, kind) {
            (Some(status), Some(kind)) if status.state == JobState::Completed => Ok(ArtifactRef {
                job: job.clone(),
                kind,
                url: self.inner.service.artifact_url(
                    kind,
                    job,
                    status.download_url.as_deref(),
                ),
            }),
            (status, _) => Err(ControllerError::NotReady {
                job: job.clone(),
                state: status
                    .map(|s| s.state.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }

    /// Stream a completed artifact to `destination`.
    pub async fn download(
        &self,
        artifact: &ArtifactRef,
        destination: &Path,
    ) -> Result<u64, ControllerError> {
        match self.inner.service.download(&artifact.url, destination).await {
            Ok(bytes) => {
                tracing::info!(
                    job_id = %artifact.job,
                    bytes,
                    destination = %destination.display(),
                    "Artifact downloaded",
                );
                Ok(bytes)
            }
            Err(e) => {
                tracing::warn!(job_id = %artifact.job, error = %e, "Download failed");
                let message = e.user_message();
                self.inner
                    .notifier
                    .error(format!("Download failed: {message}"));
                Err(ControllerError::Download(message))
            }
        }
    }

    /// Wait until the active job reaches a terminal state.
    ///
    /// Resolves with the completed status, or fails with
    /// [`ControllerError::JobFailed`], or with
    /// [`ControllerError::PollingStopped`] when tracking ends first
    /// (cancellation, reset, superseding submission, attempt cap).
    pub async fn wait_for_terminal(&self) -> Result<JobStatus, ControllerError> {
        let mut rx = self.inner.status_tx.subscribe();
        let job = self
            .inner
            .session
            .lock()
            .await
            .job
            .clone()
            .ok_or(ControllerError::NoActiveJob)?;

        loop {
            let current = rx.borrow_and_update().clone();
            match current {
                Some(status) if status.job == job => {
                    if status.state == JobState::Failed {
                        return Err(ControllerError::JobFailed {
                            job,
                            error: status.error.unwrap_or_default(),
                        });
                    }
                    if status.is_terminal() {
                        return Ok(status);
                    }
                }
                _ => return Err(ControllerError::PollingStopped(job)),
            }
            if rx.changed().await.is_err() {
                return Err(ControllerError::PollingStopped(job));
            }
        }
    }

    /// Cancel polling and return to a clean session.
    pub async fn reset(&self) {
        self.cancel_polling().await;
        let session_id = {
            let mut session = self.inner.session.lock().await;
            session.reset();
            session.id
        };
        self.inner.status_tx.send_replace(None);
        tracing::debug!(%session_id, "Session reset");
    }

    /// Stop all background work. The controller should not be used
    /// afterwards.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job controller");
        self.cancel.cancel();
        self.cancel_polling().await;
    }

    // ---- private helpers ----

    fn spawn_poll_task(&self, kind: MediaKind, job: JobHandle) -> PollTask {
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let task_job = job.clone();

        let handle = tokio::spawn(async move {
            let inner_ref: &Inner = &inner;
            let job_ref = &task_job;
            let exit = run_polling(&inner.poll_config, &task_cancel, move |attempt| {
                inner_ref.poll_once(kind, job_ref, attempt)
            })
            .await;

            match exit {
                PollExit::Stopped { attempts } => {
                    tracing::debug!(job_id = %task_job, attempts, "Polling finished");
                }
                PollExit::Cancelled { attempts } => {
                    tracing::debug!(job_id = %task_job, attempts, "Polling cancelled");
                }
                PollExit::Exhausted { attempts } => {
                    inner.abandon(&task_job, attempts).await;
                }
            }
        });

        PollTask {
            job,
            cancel,
            handle,
        }
    }

    /// Cancel a polling task and wait (bounded) for it to exit.
    async fn stop_task(&self, task: PollTask) {
        task.cancel.cancel();
        let abort = task.handle.abort_handle();
        if tokio::time::timeout(POLL_TASK_STOP_TIMEOUT, task.handle)
            .await
            .is_err()
        {
            tracing::warn!(job_id = %task.job, "Polling task did not stop in time, aborting");
            abort.abort();
        }
        self.inner.mark_polling_cancelled(&task.job).await;
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Inner {
    /// One iteration of the polling loop. Transient failures are logged
    /// and retried on the next tick.
    async fn poll_once(&self, kind: MediaKind, job: &JobHandle, attempt: u32) -> PollStep {
        match self.service.status(kind, job).await {
            Ok(status) => match self.apply_status(status).await {
                Applied::Progress(status) => {
                    tracing::debug!(
                        job_id = %job,
                        attempt,
                        state = %status.state,
                        progress = status.progress,
                        "Job status",
                    );
                    PollStep::Continue
                }
                Applied::Terminal(_) | Applied::AlreadyTerminal(_) | Applied::Stale => {
                    PollStep::Stop
                }
            },
            Err(e) => {
                tracing::warn!(
                    job_id = %job,
                    attempt,
                    error = %e,
                    "Status check failed, retrying on next tick",
                );
                PollStep::Continue
            }
        }
    }

    /// Fold an observed status into the session and emit the matching
    /// event. Runs under the session lock so terminal handling happens
    /// exactly once per job and progress events stay ordered.
    async fn apply_status(&self, mut status: JobStatus) -> Applied {
        let mut session = self.session.lock().await;
        if session.job.as_ref() != Some(&status.job) {
            return Applied::Stale;
        }
        if let Some(previous) = &session.last_status {
            if previous.is_terminal() {
                return Applied::AlreadyTerminal(previous.clone());
            }
            if status.carry_progress_from(previous) {
                tracing::debug!(
                    job_id = %status.job,
                    reported_below = previous.progress,
                    "Ignoring progress regression",
                );
            }
        }
        session.last_status = Some(status.clone());
        self.status_tx.send_replace(Some(status.clone()));

        let session_id = session.id;
        let job = status.job.clone();
        match status.state {
            JobState::Completed => {
                tracing::info!(%session_id, job_id = %job, "Job completed");
                let _ = self.event_tx.send(JobEvent::Completed {
                    session_id,
                    job: job.clone(),
                    download_url: status.download_url.clone(),
                });
                self.notifier.success(format!("Job {job} completed"));
                Applied::Terminal(status)
            }
            JobState::Failed => {
                let error = status.error.clone().unwrap_or_default();
                tracing::warn!(%session_id, job_id = %job, error = %error, "Job failed");
                let _ = self.event_tx.send(JobEvent::Failed {
                    session_id,
                    job,
                    error: error.clone(),
                });
                self.notifier.error(format!("Processing failed: {error}"));
                Applied::Terminal(status)
            }
            JobState::Queued | JobState::Processing => {
                let _ = self.event_tx.send(JobEvent::Progress {
                    session_id,
                    job,
                    state: status.state,
                    percent: status.progress,
                });
                Applied::Progress(status)
            }
        }
    }

    /// Record that polling for `job` stopped early, if it is still the
    /// session's active job.
    async fn mark_polling_cancelled(&self, job: &JobHandle) {
        let session = self.session.lock().await;
        if session.active_job() == Some(job) {
            self.status_tx.send_replace(None);
            let _ = self.event_tx.send(JobEvent::PollingCancelled {
                session_id: session.id,
                job: job.clone(),
            });
        }
    }

    /// Give up on `job` after the attempt cap was reached.
    async fn abandon(&self, job: &JobHandle, attempts: u32) {
        let session = self.session.lock().await;
        if session.active_job() != Some(job) {
            return;
        }
        tracing::warn!(job_id = %job, attempts, "Polling attempt limit reached");
        self.status_tx.send_replace(None);
        let _ = self.event_tx.send(JobEvent::PollingAbandoned {
            session_id: session.id,
            job: job.clone(),
            attempts,
        });
        self.notifier.error(format!(
            "Stopped waiting for job {job} after {attempts} status checks"
        ));
    }
}

/// Describe a local file for the acceptance policy.
async fn inspect_file(path: &Path) -> Result<FileCandidate, CoreError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        CoreError::Validation(format!("Cannot read '{}': {e}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(CoreError::Validation(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(FileCandidate::new(file_name, metadata.len()))
}

/// Errors returned by [`JobController`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The file or parameters failed local checks; nothing was sent.
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Upload failed: {0}")]
    Upload(String),

    /// Unknown upload handle, or the submit call failed.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// A single status query failed.
    #[error("Status check failed: {0}")]
    Poll(String),

    /// The service reported a terminal failure.
    #[error("Job {job} failed: {error}")]
    JobFailed { job: JobHandle, error: String },

    #[error("Job {job} is not ready for retrieval (state: {state})")]
    NotReady { job: JobHandle, state: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("No job has been submitted")]
    NoActiveJob,

    #[error("Polling for job {0} stopped before it finished")]
    PollingStopped(JobHandle),
}
