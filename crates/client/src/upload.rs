//! Upload progress reporting.
//!
//! The upload body is streamed from disk; every chunk handed to the HTTP
//! layer advances an [`UploadProgress`] that is passed to the caller's
//! callback.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::io::ReaderStream;

/// Callback invoked for every chunk sent.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Bytes handed to the transport so far, out of the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Fraction transferred, 0.0-1.0. An empty body counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.sent as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Wrap an open file into a streaming request body that reports progress.
pub fn progress_body(
    file: tokio::fs::File,
    total: u64,
    progress: Option<ProgressFn>,
) -> reqwest::Body {
    let mut sent = 0u64;
    let stream = ReaderStream::new(file).map(move |chunk| {
        if let (Ok(bytes), Some(callback)) = (&chunk, &progress) {
            sent += bytes.len() as u64;
            callback(UploadProgress { sent, total });
        }
        chunk
    });
    reqwest::Body::wrap_stream(stream)
}
