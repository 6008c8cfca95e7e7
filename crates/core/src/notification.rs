//! User-visible notifications.
//!
//! Notifications are ephemeral, auto-dismissing messages. The core only
//! describes them; the client crate decides when to raise them and the
//! presentation layer decides how to render them.

use std::time::Duration;

use serde::Serialize;

use crate::types::Timestamp;

/// Default display time for success and info messages.
pub const DEFAULT_INFO_DURATION: Duration = Duration::from_secs(3);

/// Default display time for error messages.
pub const DEFAULT_ERROR_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl Severity {
    pub fn default_duration(self) -> Duration {
        match self {
            Self::Error => DEFAULT_ERROR_DURATION,
            Self::Success | Self::Info => DEFAULT_INFO_DURATION,
        }
    }
}

/// A message to show the user for `duration`, then dismiss.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub created_at: Timestamp,
}

impl Notification {
    /// Create a notification with the severity's default duration.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            duration: severity.default_duration(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Override the display duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Instant after which the message should no longer be shown.
    pub fn expires_at(&self) -> Timestamp {
        let span = chrono::Duration::from_std(self.duration).unwrap_or(chrono::Duration::zero());
        self.created_at + span
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
