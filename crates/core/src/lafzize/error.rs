use thiserror::Error;

use super::JobStage;
use crate::aligner::AlignerError;
use crate::artifact::ArtifactError;
use crate::recitation::{FileKey, RecitationError};

/// Errors returned synchronously to the caller.
#[derive(Debug, Error)]
pub enum LafzizeError {
    #[error("Recitation file not found: {0}")]
    NotFound(FileKey),

    /// Another job or edit holds the file.
    #[error("Lafzize already in progress for {0}")]
    AlreadyInProgress(FileKey),

    #[error("Audio missing for {0}")]
    AudioMissing(FileKey),

    #[error("No timings for {0}")]
    NoTimings(FileKey),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<RecitationError> for LafzizeError {
    fn from(e: RecitationError) -> Self {
        match e {
            RecitationError::FileNotFound(key) => LafzizeError::NotFound(key),
            RecitationError::InProgress(key) => LafzizeError::AlreadyInProgress(key),
            RecitationError::Invalid(msg) => LafzizeError::Invalid(msg),
            other => LafzizeError::Store(other.to_string()),
        }
    }
}

/// Errors inside a background job. These never reach the submitter; they
/// are logged and recorded in the [`JobOutcome`](super::JobOutcome).
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Upstream(#[from] AlignerError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Persistence(#[from] RecitationError),
}

impl JobError {
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Upstream(_) => JobStage::Upstream,
            JobError::Artifact(_) => JobStage::Artifact,
            JobError::Persistence(_) => JobStage::Persistence,
        }
    }

    /// False when the job no longer owns the file, so there is nothing left
    /// for it to release.
    pub fn still_claimed(&self) -> bool {
        !matches!(
            self,
            JobError::Persistence(RecitationError::FileNotFound(_))
                | JobError::Persistence(RecitationError::NotClaimed(_))
        )
    }
}
