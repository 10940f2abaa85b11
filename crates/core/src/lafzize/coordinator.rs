//! Job coordinator implementation.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::{JobError, JobOutcome, LafzizeError, Submission};
use crate::aligner::Aligner;
use crate::artifact::FsArtifactStore;
use crate::auth::Identity;
use crate::config::FailurePolicy;
use crate::metrics;
use crate::recitation::{
    Claim, FileKey, RecitationError, RecitationFile, RecitationStore, Timing,
};

/// Runs lafzize jobs and manual timing edits against recitation files.
///
/// Collaborators are injected at construction; the coordinator itself keeps
/// no state between calls. Cloning is cheap and every background job runs on
/// its own clone.
#[derive(Clone)]
pub struct LafzizeCoordinator {
    store: Arc<dyn RecitationStore>,
    artifacts: Arc<FsArtifactStore>,
    aligner: Arc<dyn Aligner>,
    on_failure: FailurePolicy,
}

impl LafzizeCoordinator {
    pub fn new(
        store: Arc<dyn RecitationStore>,
        artifacts: Arc<FsArtifactStore>,
        aligner: Arc<dyn Aligner>,
        on_failure: FailurePolicy,
    ) -> Self {
        Self {
            store,
            artifacts,
            aligner,
            on_failure,
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    /// Look up a file and refuse it while a job holds it.
    fn idle_file(&self, key: &FileKey) -> Result<RecitationFile, LafzizeError> {
        let file = self
            .store
            .get_file(key)?
            .ok_or_else(|| LafzizeError::NotFound(key.clone()))?;
        if file.lafzize_processing {
            return Err(LafzizeError::AlreadyInProgress(key.clone()));
        }
        Ok(file)
    }

    /// Release a claim outside the job path, logging instead of failing.
    fn release_quietly(&self, key: &FileKey, claim: &Claim, has_timings: bool) {
        if let Err(e) = self.store.finish_processing(key, &claim.token, has_timings) {
            warn!(
                reciter = %key.reciter,
                slug = %key.slug,
                verse_key = %key.verse_key,
                error = %e,
                "Failed to release recitation file"
            );
        }
    }

    /// Accept a lafzize job for one of the caller's files.
    ///
    /// When this returns the file is claimed (`lafzize_processing` set,
    /// `has_timings` clear) and its old timings are gone. The job itself runs
    /// in the background; await [`Submission::handle`] to observe its outcome.
    pub async fn submit(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
    ) -> Result<Submission, LafzizeError> {
        let key = FileKey::new(&identity.username, slug, verse_key);
        self.idle_file(&key)?;

        if !self.artifacts.audio_exists(&key).await {
            return Err(LafzizeError::AudioMissing(key));
        }

        let claim = self.store.begin_processing(&key)?;

        if let Err(e) = self.artifacts.remove_timings(&key).await {
            self.release_quietly(&key, &claim, false);
            return Err(e.into());
        }

        metrics::LAFZIZE_JOBS_SUBMITTED.inc();
        metrics::LAFZIZE_JOBS_IN_FLIGHT.inc();
        info!(
            reciter = %key.reciter,
            slug = %key.slug,
            verse_key = %key.verse_key,
            aligner = self.aligner.name(),
            "Lafzize job accepted"
        );

        let file = claim.file.clone();
        let coordinator = self.clone();
        let handle = tokio::spawn(async move { coordinator.run_job(key, claim).await });

        Ok(Submission { file, handle })
    }

    async fn run_job(self, key: FileKey, claim: Claim) -> JobOutcome {
        let start = Instant::now();
        let result = self.align_and_store(&key, &claim.token).await;

        let outcome = match result {
            Ok(bytes) => {
                info!(
                    reciter = %key.reciter,
                    slug = %key.slug,
                    verse_key = %key.verse_key,
                    bytes,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Lafzize job completed"
                );
                JobOutcome::Completed { bytes }
            }
            Err(e) => {
                let stage = e.stage();
                error!(
                    reciter = %key.reciter,
                    slug = %key.slug,
                    verse_key = %key.verse_key,
                    stage = stage.as_str(),
                    error = %e,
                    "Lafzize job failed"
                );

                if self.on_failure == FailurePolicy::Release && e.still_claimed() {
                    self.release_quietly(&key, &claim, false);
                }

                JobOutcome::Failed {
                    stage,
                    error: e.to_string(),
                }
            }
        };

        let label = outcome.label();
        metrics::LAFZIZE_JOBS_FINISHED
            .with_label_values(&[label])
            .inc();
        metrics::LAFZIZE_JOB_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());
        metrics::LAFZIZE_JOBS_IN_FLIGHT.dec();

        outcome
    }

    /// Call the aligner, stream its answer into the timings file and release
    /// the file with `has_timings` set. Returns the number of bytes written.
    async fn align_and_store(&self, key: &FileKey, claim_token: &str) -> Result<u64, JobError> {
        let audio_path = self.artifacts.audio_path(key);
        let mut stream = self.aligner.align(&audio_path, &key.verse_key).await?;

        let mut writer = self.artifacts.create_timings(key, claim_token).await?;
        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(bytes) => writer.write_chunk(&bytes).await.map_err(JobError::from),
                Err(e) => Err(JobError::from(e)),
            };
            if let Err(e) = written {
                writer.abort().await;
                return Err(e);
            }
        }

        // The file may have been deleted (or deleted and uploaded again)
        // while the aligner was busy. Only the claim holder may publish.
        if let Err(e) = self.store.check_claim(key, claim_token) {
            writer.abort().await;
            return Err(e.into());
        }

        // The claim can still be lost between the check and the publish.
        // Never replace timings someone else published in that window.
        let bytes = writer.commit_new().await?;

        match self.store.finish_processing(key, claim_token, true) {
            Ok(_) => Ok(bytes),
            Err(e) => {
                self.discard_unclaimed_timings(key, &e).await;
                Err(e.into())
            }
        }
    }

    /// Remove timings a job published after losing its claim, unless the
    /// current record may own them.
    async fn discard_unclaimed_timings(&self, key: &FileKey, lost: &RecitationError) {
        let orphaned = match lost {
            RecitationError::FileNotFound(_) => true,
            RecitationError::NotClaimed(_) => matches!(
                self.store.get_file(key),
                Ok(Some(file)) if !file.lafzize_processing && !file.has_timings
            ),
            _ => false,
        };
        if !orphaned {
            return;
        }

        debug!(file = %key, "Removing timings published without a claim");
        if let Err(e) = self.artifacts.remove_timings(key).await {
            warn!(file = %key, error = %e, "Failed to remove orphaned timings");
        }
    }

    /// Replace a file's timings with a manually edited document.
    ///
    /// The file is claimed for the duration of the write, so a lafzize
    /// submission racing with the edit is rejected. If the write fails the
    /// previous timings are left in place and the file is released as it was.
    pub async fn replace_timing(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
        timing: &Timing,
    ) -> Result<RecitationFile, LafzizeError> {
        validate_timing(timing)?;
        let key = FileKey::new(&identity.username, slug, verse_key);
        let before = self.idle_file(&key)?;
        let claim = self.store.begin_processing(&key)?;

        if let Err(e) = self.artifacts.write_timing(&key, &claim.token, timing).await {
            self.release_quietly(&key, &claim, before.has_timings);
            return Err(e.into());
        }

        let file = match self.store.finish_processing(&key, &claim.token, true) {
            Ok(file) => file,
            Err(e) => {
                // The new timings are on disk either way
                self.release_quietly(&key, &claim, true);
                return Err(e.into());
            }
        };
        info!(file = %key, segments = timing.segments.len(), "Timings replaced");
        Ok(file)
    }

    /// Delete a file's timings.
    pub async fn remove_timing(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
    ) -> Result<RecitationFile, LafzizeError> {
        let key = FileKey::new(&identity.username, slug, verse_key);
        let before = self.idle_file(&key)?;
        if !before.has_timings {
            return Err(LafzizeError::NoTimings(key));
        }
        let claim = self.store.begin_processing(&key)?;

        if let Err(e) = self.artifacts.remove_timings(&key).await {
            self.release_quietly(&key, &claim, true);
            return Err(e.into());
        }

        let file = match self.store.finish_processing(&key, &claim.token, false) {
            Ok(file) => file,
            Err(e) => {
                self.release_quietly(&key, &claim, false);
                return Err(e.into());
            }
        };
        info!(file = %key, "Timings removed");
        Ok(file)
    }

    /// Release every file left claimed by a previous run of the process.
    ///
    /// Jobs do not outlive the process, so at startup every claimed file is
    /// orphaned. Each one is reset to no timings and its timing files are
    /// removed. Must run before any job is submitted.
    pub async fn recover_orphaned(&self) -> Result<Vec<FileKey>, LafzizeError> {
        let keys = self.store.reset_processing()?;

        for key in &keys {
            if let Err(e) = self.artifacts.remove_timings(key).await {
                warn!(file = %key, error = %e, "Failed to remove timings during recovery");
            }
            if let Err(e) = self.artifacts.remove_partial_timings(key).await {
                warn!(file = %key, error = %e, "Failed to remove partial timings during recovery");
            }
        }

        metrics::LAFZIZE_JOBS_RECOVERED.inc_by(keys.len() as u64);
        if !keys.is_empty() {
            info!(count = keys.len(), "Released orphaned lafzize claims");
        }
        Ok(keys)
    }
}

fn validate_timing(timing: &Timing) -> Result<(), LafzizeError> {
    for (index, segment) in timing.segments.iter().enumerate() {
        if !segment.start.is_finite() || !segment.end.is_finite() || segment.start > segment.end {
            return Err(LafzizeError::Invalid(format!(
                "segment {} has an invalid time range",
                index
            )));
        }
    }
    Ok(())
}
