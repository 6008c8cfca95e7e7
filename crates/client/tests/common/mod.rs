#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use editkit_client::api::ApiError;
use editkit_client::service::MediaService;
use editkit_client::upload::ProgressFn;
use editkit_client::{JobController, JobEvent, PollConfig};
use editkit_core::job::{JobState, JobStatus};
use editkit_core::media::MediaKind;
use editkit_core::notification::{Notification, Severity};
use editkit_core::params::TransformParameters;
use editkit_core::session::UploadInfo;
use editkit_core::types::{JobHandle, UploadHandle};

/// One scripted answer to a status query.
#[derive(Debug, Clone)]
pub enum Step {
    Status(JobState, f64, Option<&'static str>),
    NetworkError,
}

pub fn processing(progress: f64) -> Step {
    Step::Status(JobState::Processing, progress, None)
}

pub fn completed() -> Step {
    Step::Status(JobState::Completed, 100.0, None)
}

pub fn failed(error: &'static str) -> Step {
    Step::Status(JobState::Failed, 0.0, Some(error))
}

/// Holds calls until opened. Starts open.
pub struct Gate {
    open: watch::Sender<bool>,
    waiting: AtomicUsize,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            open: watch::channel(true).0,
            waiting: AtomicUsize::new(0),
        }
    }
}

impl Gate {
    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Number of calls currently held.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Yield to other tasks until `count` calls are held.
    pub async fn until_waiting(&self, count: usize) {
        while self.waiting() < count {
            tokio::task::yield_now().await;
        }
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _ = rx.wait_for(|open| *open).await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Yield to other tasks until `condition` holds.
pub async fn until(condition: impl Fn() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct Script {
    upload_error: Option<String>,
    submit_error: Option<String>,
    submit_state: Option<JobState>,
    held_job: Option<String>,
    statuses: VecDeque<Step>,
    uploads: u32,
    submits: Vec<TransformParameters>,
    polls: Vec<(JobHandle, Instant)>,
    downloads: Vec<String>,
}

/// In-memory [`MediaService`] answering from a script and recording calls.
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<Script>,
    /// Holds status queries for the job passed to `hold_status`.
    pub status_gate: Gate,
    /// Holds every submission while closed.
    pub submit_gate: Gate,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue status answers. The last one repeats once the queue is
    /// drained; with an empty script jobs stay `processing` at 0.
    pub fn with_statuses(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        let service = Self::default();
        service.script.lock().unwrap().statuses = steps.into_iter().collect();
        Arc::new(service)
    }

    pub fn set_submit_state(&self, state: JobState) {
        self.script.lock().unwrap().submit_state = Some(state);
    }

    pub fn fail_uploads(&self, message: &str) {
        self.script.lock().unwrap().upload_error = Some(message.to_string());
    }

    pub fn fail_submits(&self, message: &str) {
        self.script.lock().unwrap().submit_error = Some(message.to_string());
    }

    /// Hold status queries for `job` until `status_gate` opens. The
    /// answer is taken from the script when the query arrives.
    pub fn hold_status(&self, job: &str) {
        self.script.lock().unwrap().held_job = Some(job.to_string());
        self.status_gate.close();
    }

    pub fn upload_count(&self) -> u32 {
        self.script.lock().unwrap().uploads
    }

    pub fn submit_count(&self) -> usize {
        self.script.lock().unwrap().submits.len()
    }

    pub fn poll_count(&self) -> usize {
        self.script.lock().unwrap().polls.len()
    }

    pub fn polls_for(&self, job: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .polls
            .iter()
            .filter(|(j, _)| j.as_str() == job)
            .count()
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.script
            .lock()
            .unwrap()
            .polls
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.script.lock().unwrap().downloads.clone()
    }
}

fn api_error(message: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl MediaService for ScriptedService {
    async fn upload(
        &self,
        kind: MediaKind,
        path: &Path,
        _progress: Option<ProgressFn>,
    ) -> Result<UploadInfo, ApiError> {
        let mut script = self.script.lock().unwrap();
        script.uploads += 1;
        if let Some(message) = &script.upload_error {
            return Err(api_error(message));
        }
        Ok(UploadInfo {
            handle: UploadHandle::new(format!("U{}", script.uploads)),
            kind,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: 0,
            dimensions: None,
            duration_secs: None,
        })
    }

    async fn submit(
        &self,
        _upload: &UploadHandle,
        params: &TransformParameters,
    ) -> Result<JobStatus, ApiError> {
        let answer = {
            let mut script = self.script.lock().unwrap();
            if let Some(message) = &script.submit_error {
                return Err(api_error(message));
            }
            script.submits.push(params.clone());
            let job = JobHandle::new(format!("J{}", script.submits.len()));
            let state = script.submit_state.unwrap_or(JobState::Queued);
            JobStatus::new(job, state, 0.0, None)
        };
        self.submit_gate.pass().await;
        Ok(answer)
    }

    async fn status(&self, _kind: MediaKind, job: &JobHandle) -> Result<JobStatus, ApiError> {
        let (step, held) = {
            let mut script = self.script.lock().unwrap();
            script.polls.push((job.clone(), Instant::now()));
            let step = if script.statuses.len() > 1 {
                script.statuses.pop_front()
            } else {
                script.statuses.front().cloned()
            };
            (step, script.held_job.as_deref() == Some(job.as_str()))
        };
        if held {
            self.status_gate.pass().await;
        }
        match step.unwrap_or_else(|| processing(0.0)) {
            Step::Status(state, progress, error) => Ok(JobStatus::new(
                job.clone(),
                state,
                progress,
                error.map(str::to_string),
            )),
            Step::NetworkError => Err(api_error("connection reset")),
        }
    }

    fn artifact_url(
        &self,
        kind: MediaKind,
        job: &JobHandle,
        advertised: Option<&str>,
    ) -> String {
        match advertised {
            Some(path) => format!("http://fake{path}"),
            None => format!("http://fake/api/{kind}/download/{job}"),
        }
    }

    async fn download(&self, url: &str, _destination: &Path) -> Result<u64, ApiError> {
        self.script.lock().unwrap().downloads.push(url.to_string());
        Ok(42)
    }
}

pub fn controller(service: &Arc<ScriptedService>) -> JobController {
    controller_with(service, PollConfig::default())
}

pub fn controller_with(service: &Arc<ScriptedService>, config: PollConfig) -> JobController {
    let service: Arc<dyn MediaService> = service.clone();
    JobController::new(service, config)
}

/// Create a sparse file of `size` bytes named `name` inside `dir`.
pub fn media_file(dir: &tempfile::TempDir, name: &str, size: u64) -> PathBuf {
    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    path
}

pub fn drain_events(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(n) = rx.try_recv() {
        notifications.push(n);
    }
    notifications
}

pub fn errors(notifications: &[Notification]) -> Vec<&str> {
    notifications
        .iter()
        .filter(|n| n.severity == Severity::Error)
        .map(|n| n.message.as_str())
        .collect()
}

pub fn infos(notifications: &[Notification]) -> Vec<&str> {
    notifications
        .iter()
        .filter(|n| n.severity == Severity::Info)
        .map(|n| n.message.as_str())
        .collect()
}

pub fn successes(notifications: &[Notification]) -> Vec<&str> {
    notifications
        .iter()
        .filter(|n| n.severity == Severity::Success)
        .map(|n| n.message.as_str())
        .collect()
}

pub const MB: u64 = 1024 * 1024;
