//! Client side of the photo/video editing service.
//!
//! - [`api::EditorApi`] talks HTTP to the service.
//! - [`controller::JobController`] runs the upload, submit, poll and
//!   retrieve lifecycle for one editing session.
//! - [`notifier::Notifier`] fans out user-visible notifications.

pub mod api;
pub mod controller;
pub mod events;
pub mod messages;
pub mod notifier;
pub mod poller;
pub mod service;
pub mod upload;

pub use api::{ApiError, EditorApi};
pub use controller::{ArtifactRef, ControllerError, JobController};
pub use events::JobEvent;
pub use notifier::Notifier;
pub use poller::PollConfig;
pub use service::MediaService;
