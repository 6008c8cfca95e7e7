//! Media kinds and the local file-acceptance policy.
//!
//! Every file is checked against the policy for its [`MediaKind`] before
//! any network call is made: the MIME type (guessed from the file name
//! when the caller does not supply one) must be on the kind's allow-list
//! and the size must be non-zero and within the kind's limit.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum accepted photo size (50 MiB).
pub const MAX_PHOTO_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum accepted video size (500 MiB).
pub const MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;

/// Photo extensions accepted by the editing service.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// Video extensions accepted by the editing service.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv"];

const PHOTO_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/gif",
    "image/tiff",
    "image/webp",
];

const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/x-msvideo",
    "video/quicktime",
    "video/x-matroska",
    "video/webm",
    "video/x-flv",
    "video/x-ms-wmv",
];

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// The two media families the editing service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Route segment used by the service (`/api/{kind}/...`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    /// The acceptance policy for this kind.
    pub fn policy(self) -> FilePolicy {
        match self {
            Self::Photo => FilePolicy {
                kind: self,
                extensions: PHOTO_EXTENSIONS,
                mime_types: PHOTO_MIME_TYPES,
                max_bytes: MAX_PHOTO_BYTES,
            },
            Self::Video => FilePolicy {
                kind: self,
                extensions: VIDEO_EXTENSIONS,
                mime_types: VIDEO_MIME_TYPES,
                max_bytes: MAX_VIDEO_BYTES,
            },
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileCandidate
// ---------------------------------------------------------------------------

/// A file the caller wants to upload, described without reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl FileCandidate {
    /// Describe a file by name and size, guessing the MIME type from the
    /// extension. Unknown extensions map to `application/octet-stream`.
    pub fn new(file_name: impl Into<String>, size: u64) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            mime_type,
            size,
        }
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

// ---------------------------------------------------------------------------
// FilePolicy
// ---------------------------------------------------------------------------

/// Allow-list and size limit for one [`MediaKind`].
#[derive(Debug, Clone, Copy)]
pub struct FilePolicy {
    pub kind: MediaKind,
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    pub max_bytes: u64,
}

impl FilePolicy {
    /// Check a candidate file. Returns a descriptive error suitable for
    /// showing to the user.
    pub fn validate(&self, file: &FileCandidate) -> Result<(), CoreError> {
        let mime = file.mime_type.to_ascii_lowercase();
        if !self.mime_types.contains(&mime.as_str()) {
            return Err(CoreError::UnsupportedType {
                kind: self.kind.as_str(),
                detail: format!(
                    "'{}' ({mime}). Allowed formats: {}",
                    file.file_name,
                    self.allowed_formats()
                ),
            });
        }
        if file.size == 0 {
            return Err(CoreError::Validation(format!(
                "File '{}' is empty",
                file.file_name
            )));
        }
        if file.size > self.max_bytes {
            return Err(CoreError::TooLarge {
                kind: self.kind.as_str(),
                size: file.size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Upper-cased extension list for error messages, e.g. `JPG, PNG`.
    pub fn allowed_formats(&self) -> String {
        self.extensions
            .iter()
            .map(|e| e.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
