//! Upload directory layout.
//!
//! ```text
//! <uploads>/<reciter>/<slug>/<verse_key>.<upload>.raw       upload before transcoding
//! <uploads>/<reciter>/<slug>/<verse_key>.<upload>.part.mp3  transcoded, not yet published
//! <uploads>/<reciter>/<slug>/<verse_key>.mp3                audio
//! <uploads>/<reciter>/<slug>/<verse_key>.json               timings
//! <uploads>/<reciter>/<slug>/<verse_key>.json.<claim>.part  timings being written
//! ```
//!
//! Uploads and timings are written under a name private to the upload or
//! claim that writes them and only then moved under the final name.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ArtifactError;
use crate::recitation::{FileKey, Timing};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.root
    }

    pub fn reciter_dir(&self, reciter: &str) -> PathBuf {
        self.root.join(reciter)
    }

    pub fn recitation_dir(&self, reciter: &str, slug: &str) -> PathBuf {
        self.root.join(reciter).join(slug)
    }

    fn file_path(&self, key: &FileKey, extension: &str) -> PathBuf {
        self.recitation_dir(&key.reciter, &key.slug)
            .join(format!("{}.{}", key.verse_key, extension))
    }

    pub fn audio_path(&self, key: &FileKey) -> PathBuf {
        self.file_path(key, "mp3")
    }

    pub fn timings_path(&self, key: &FileKey) -> PathBuf {
        self.file_path(key, "json")
    }

    fn partial_timings_path(&self, key: &FileKey, claim_token: &str) -> PathBuf {
        self.file_path(key, &format!("json.{}.part", claim_token))
    }

    async fn ensure_recitation_dir(&self, key: &FileKey) -> Result<(), ArtifactError> {
        let dir = self.recitation_dir(&key.reciter, &key.slug);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ArtifactError::io(&dir, e))
    }

    pub async fn audio_exists(&self, key: &FileKey) -> bool {
        fs::metadata(self.audio_path(key))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Store an uploaded file as-is, ahead of transcoding, under names
    /// private to this upload.
    pub async fn stage_upload(
        &self,
        key: &FileKey,
        bytes: &[u8],
    ) -> Result<StagedUpload, ArtifactError> {
        self.ensure_recitation_dir(key).await?;
        let upload = Uuid::new_v4().simple().to_string();
        let staged = StagedUpload {
            raw_path: self.file_path(key, &format!("{}.raw", upload)),
            staged_audio_path: self.file_path(key, &format!("{}.part.mp3", upload)),
            audio_path: self.audio_path(key),
        };
        fs::write(&staged.raw_path, bytes)
            .await
            .map_err(|e| ArtifactError::io(&staged.raw_path, e))?;
        Ok(staged)
    }

    pub async fn remove_audio(&self, key: &FileKey) -> Result<(), ArtifactError> {
        remove_if_exists(&self.audio_path(key)).await
    }

    /// Start writing a new timings file on behalf of a claim. Nothing appears
    /// under the final name until [`TimingsWriter::commit`].
    ///
    /// The recitation directory must exist. It is created by uploads only,
    /// so a job for a deleted recitation fails here instead of bringing the
    /// directory back.
    pub async fn create_timings(
        &self,
        key: &FileKey,
        claim_token: &str,
    ) -> Result<TimingsWriter, ArtifactError> {
        let partial_path = self.partial_timings_path(key, claim_token);
        let file = fs::File::create(&partial_path)
            .await
            .map_err(|e| ArtifactError::io(&partial_path, e))?;

        Ok(TimingsWriter {
            inner: BufWriter::new(file),
            partial_path,
            final_path: self.timings_path(key),
            written: 0,
        })
    }

    /// Serialize and store a timing document in one go.
    pub async fn write_timing(
        &self,
        key: &FileKey,
        claim_token: &str,
        timing: &Timing,
    ) -> Result<(), ArtifactError> {
        let payload = serde_json::to_vec(timing).map_err(|e| ArtifactError::InvalidPayload {
            path: self.timings_path(key),
            reason: e.to_string(),
        })?;
        let mut writer = self.create_timings(key, claim_token).await?;
        if let Err(e) = writer.write_chunk(&payload).await {
            writer.abort().await;
            return Err(e);
        }
        writer.commit().await?;
        Ok(())
    }

    pub async fn read_timing(&self, key: &FileKey) -> Result<Timing, ArtifactError> {
        let path = self.timings_path(key);
        let bytes = fs::read(&path)
            .await
            .map_err(|e| ArtifactError::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::InvalidPayload {
            path,
            reason: e.to_string(),
        })
    }

    /// Remove the timings file. A missing file is fine.
    pub async fn remove_timings(&self, key: &FileKey) -> Result<(), ArtifactError> {
        remove_if_exists(&self.timings_path(key)).await
    }

    /// Remove half-written timings left behind by any claim, e.g. after a
    /// crash. Returns how many were removed.
    pub async fn remove_partial_timings(&self, key: &FileKey) -> Result<usize, ArtifactError> {
        let dir = self.recitation_dir(&key.reciter, &key.slug);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ArtifactError::io(&dir, e)),
        };

        let prefix = format!("{}.json.", key.verse_key);
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArtifactError::io(&dir, e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".part") {
                remove_if_exists(&entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn remove_recitation(&self, reciter: &str, slug: &str) -> Result<(), ArtifactError> {
        remove_dir_if_exists(&self.recitation_dir(reciter, slug)).await
    }

    pub async fn remove_reciter(&self, reciter: &str) -> Result<(), ArtifactError> {
        remove_dir_if_exists(&self.reciter_dir(reciter)).await
    }
}

/// An upload on its way to becoming a file's audio.
#[derive(Debug)]
pub struct StagedUpload {
    raw_path: PathBuf,
    staged_audio_path: PathBuf,
    audio_path: PathBuf,
}

impl StagedUpload {
    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    /// Transcoder output. Keeps the `.mp3` extension, ffmpeg picks the
    /// output format from it.
    pub fn staged_audio_path(&self) -> &Path {
        &self.staged_audio_path
    }

    pub async fn remove_raw(&self) -> Result<(), ArtifactError> {
        remove_if_exists(&self.raw_path).await
    }

    /// Move the transcoded audio under the verse's audio name. Fails with
    /// [`ArtifactError::AlreadyExists`] if another upload published first.
    /// The staged files are gone afterwards either way.
    pub async fn publish(self) -> Result<PathBuf, ArtifactError> {
        let linked = link_new(&self.staged_audio_path, &self.audio_path).await;
        self.discard().await;
        linked.map(|()| self.audio_path)
    }

    /// Remove the staged files.
    pub async fn discard(&self) {
        for path in [&self.raw_path, &self.staged_audio_path] {
            if let Err(e) = remove_if_exists(path).await {
                warn!(error = %e, "Failed to remove staged upload");
            }
        }
    }
}

/// A timings file being written. Dropping it without calling
/// [`commit`](Self::commit) or [`abort`](Self::abort) leaves the `.part`
/// file behind.
pub struct TimingsWriter {
    inner: BufWriter<fs::File>,
    partial_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl TimingsWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ArtifactError> {
        self.inner
            .write_all(chunk)
            .await
            .map_err(|e| ArtifactError::io(&self.partial_path, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush to disk and move the file under its final name, replacing any
    /// timings already there. Returns the number of bytes written. On
    /// failure the partial file is removed.
    pub async fn commit(self) -> Result<u64, ArtifactError> {
        self.finish(false).await
    }

    /// Like [`commit`](Self::commit), but fails with
    /// [`ArtifactError::AlreadyExists`] instead of replacing timings that
    /// appeared while this writer was open.
    pub async fn commit_new(self) -> Result<u64, ArtifactError> {
        self.finish(true).await
    }

    async fn finish(mut self, exclusive: bool) -> Result<u64, ArtifactError> {
        let persisted = self.persist(exclusive).await;
        // A link leaves the partial name behind even on success
        if let Err(e) = remove_if_exists(&self.partial_path).await {
            warn!(error = %e, "Failed to remove partial timings");
        }
        persisted?;

        debug!(path = %self.final_path.display(), bytes = self.written, "Timings committed");
        Ok(self.written)
    }

    async fn persist(&mut self, exclusive: bool) -> Result<(), ArtifactError> {
        self.inner
            .flush()
            .await
            .map_err(|e| ArtifactError::io(&self.partial_path, e))?;
        self.inner
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| ArtifactError::io(&self.partial_path, e))?;

        if exclusive {
            link_new(&self.partial_path, &self.final_path).await
        } else {
            fs::rename(&self.partial_path, &self.final_path)
                .await
                .map_err(|e| ArtifactError::io(&self.final_path, e))
        }
    }

    /// Discard what was written so far.
    pub async fn abort(self) {
        let TimingsWriter {
            inner,
            partial_path,
            ..
        } = self;
        drop(inner);
        if let Err(e) = remove_if_exists(&partial_path).await {
            warn!(error = %e, "Failed to remove partial timings");
        }
    }
}

/// Give `from` the additional name `to`, unless `to` exists.
async fn link_new(from: &Path, to: &Path) -> Result<(), ArtifactError> {
    match fs::hard_link(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(ArtifactError::AlreadyExists {
                path: to.to_path_buf(),
            })
        }
        Err(e) => Err(ArtifactError::io(to, e)),
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), ArtifactError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArtifactError::io(path, e)),
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), ArtifactError> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArtifactError::io(path, e)),
    }
}
