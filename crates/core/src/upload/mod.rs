//! Uploading and deleting recitation files.
//!
//! A file record is only inserted once its transcoded audio is on disk, and
//! deleting a record takes its audio and timings with it.

mod error;
mod service;

pub use error::UploadError;
pub use service::UploadService;
