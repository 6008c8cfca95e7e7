//! Domain types for the editkit photo/video editing client.
//!
//! Pure values and validation only: opaque upload/job handles, job
//! status, transformation parameters, the local file-acceptance policy,
//! notifications and per-session state. No I/O lives here.

pub mod error;
pub mod job;
pub mod media;
pub mod notification;
pub mod params;
pub mod session;
pub mod types;

pub use error::CoreError;
