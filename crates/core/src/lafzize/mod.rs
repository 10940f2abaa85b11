//! Lafzize job coordination.
//!
//! A recitation file has at most one lafzize job at a time. Ownership is the
//! file's persisted `lafzize_processing` flag, taken and released through the
//! recitation store's guarded updates; there is no in-memory job registry.
//! Manual timing edits take the same flag for their duration.

mod coordinator;
mod error;
mod types;

pub use coordinator::LafzizeCoordinator;
pub use error::{JobError, LafzizeError};
pub use types::{JobOutcome, JobStage, Submission};
