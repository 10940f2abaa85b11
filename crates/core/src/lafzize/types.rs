use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::recitation::RecitationFile;

/// Where a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Talking to the alignment service, including reading its response.
    Upstream,
    /// Writing the timings file.
    Artifact,
    /// Releasing the file's processing flag.
    Persistence,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Upstream => "upstream",
            JobStage::Artifact => "artifact",
            JobStage::Persistence => "persistence",
        }
    }
}

/// Terminal state of a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Timings were written and the file released with `has_timings` set.
    Completed { bytes: u64 },
    Failed { stage: JobStage, error: String },
}

impl JobOutcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::Failed { stage, .. } => stage.as_str(),
        }
    }
}

/// An accepted job.
#[derive(Debug)]
pub struct Submission {
    /// The file as it was right after it was claimed.
    pub file: RecitationFile,
    /// Resolves when the job ends. Dropping it detaches the job.
    pub handle: JoinHandle<JobOutcome>,
}
