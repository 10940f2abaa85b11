//! Upload service implementation.

use std::sync::Arc;

use tracing::{info, warn};

use super::UploadError;
use crate::artifact::{ArtifactError, FsArtifactStore};
use crate::auth::Identity;
use crate::metrics;
use crate::recitation::{
    validate_verse_key, FileKey, RecitationFile, RecitationStore,
};
use crate::transcoder::Transcoder;

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn RecitationStore>,
    artifacts: Arc<FsArtifactStore>,
    transcoder: Arc<dyn Transcoder>,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn RecitationStore>,
        artifacts: Arc<FsArtifactStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            store,
            artifacts,
            transcoder,
        }
    }

    /// Store and transcode an uploaded verse of one of the caller's
    /// recitations, then record it with both flags clear.
    pub async fn upload(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
        bytes: &[u8],
    ) -> Result<RecitationFile, UploadError> {
        let result = self.ingest(identity, slug, verse_key, bytes).await;
        let label = match &result {
            Ok(_) => "success",
            Err(UploadError::Transcode(_)) => "transcode_failed",
            Err(_) => "rejected",
        };
        metrics::UPLOADS_TOTAL.with_label_values(&[label]).inc();
        result
    }

    async fn ingest(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
        bytes: &[u8],
    ) -> Result<RecitationFile, UploadError> {
        validate_verse_key(verse_key)?;
        if bytes.is_empty() {
            return Err(UploadError::Invalid("uploaded file is empty".to_string()));
        }

        let reciter = identity.username.as_str();
        if self.store.get_recitation(reciter, slug)?.is_none() {
            return Err(UploadError::RecitationNotFound(format!("{}/{}", reciter, slug)));
        }

        let key = FileKey::new(reciter, slug, verse_key);
        if self.store.get_file(&key)?.is_some() {
            return Err(UploadError::AlreadyExists(key.to_string()));
        }

        // Concurrent uploads of one verse each transcode into their own
        // staged files. Only the first to publish gets the audio name.
        let staged = self.artifacts.stage_upload(&key, bytes).await?;
        let transcoded = self
            .transcoder
            .transcode(staged.raw_path(), staged.staged_audio_path())
            .await;
        if let Err(e) = staged.remove_raw().await {
            warn!(file = %key, error = %e, "Failed to remove raw upload");
        }

        if let Err(e) = transcoded {
            warn!(file = %key, error = %e, "Transcoding upload failed");
            staged.discard().await;
            return Err(e.into());
        }

        match staged.publish().await {
            Ok(_) => {}
            Err(ArtifactError::AlreadyExists { .. }) => {
                return Err(UploadError::AlreadyExists(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // The audio name is ours alone from here on
        match self.store.create_file(&key) {
            Ok(file) => {
                info!(
                    file = %key,
                    bytes = bytes.len(),
                    transcoder = self.transcoder.name(),
                    "Recitation file uploaded"
                );
                Ok(file)
            }
            Err(e) => {
                self.discard_audio(&key).await;
                Err(e.into())
            }
        }
    }

    /// Delete one of the caller's files with its audio and timings. Allowed
    /// while a lafzize job holds the file.
    pub async fn delete(
        &self,
        identity: &Identity,
        slug: &str,
        verse_key: &str,
    ) -> Result<RecitationFile, UploadError> {
        let key = FileKey::new(&identity.username, slug, verse_key);
        let file = self.store.delete_file(&key)?;

        if let Err(e) = self.artifacts.remove_audio(&key).await {
            warn!(file = %key, error = %e, "Failed to remove audio");
        }
        if let Err(e) = self.artifacts.remove_timings(&key).await {
            warn!(file = %key, error = %e, "Failed to remove timings");
        }

        info!(file = %key, in_progress = file.lafzize_processing, "Recitation file deleted");
        Ok(file)
    }

    async fn discard_audio(&self, key: &FileKey) {
        if let Err(e) = self.artifacts.remove_audio(key).await {
            warn!(file = %key, error = %e, "Failed to remove audio");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStore, SqliteAccountStore};
    use crate::db::Database;
    use crate::recitation::SqliteRecitationStore;
    use crate::testing::{fixtures, MockTranscoder};
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        _dir: TempDir,
        store: Arc<SqliteRecitationStore>,
        artifacts: Arc<FsArtifactStore>,
        transcoder: Arc<MockTranscoder>,
        service: UploadService,
        alice: Identity,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::in_memory().unwrap());
        SqliteAccountStore::new(Arc::clone(&db))
            .register("alice", "secret")
            .unwrap();
        let store = Arc::new(SqliteRecitationStore::new(db));
        store.create_recitation("alice", "hafs", None).unwrap();

        let artifacts = Arc::new(FsArtifactStore::new(dir.path().join("uploads")));
        let transcoder = Arc::new(MockTranscoder::new());
        let service = UploadService::new(store.clone(), Arc::clone(&artifacts), transcoder.clone());

        Fixture {
            _dir: dir,
            store,
            artifacts,
            transcoder,
            service,
            alice: Identity::new("alice", "session"),
        }
    }

    async fn recitation_entries(f: &Fixture) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(f.artifacts.recitation_dir("alice", "hafs")).await
        else {
            return names;
        };
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_upload_transcodes_then_records() {
        let f = fixture();
        let file = f
            .service
            .upload(&f.alice, "hafs", "1:1", b"RIFF wav data")
            .await
            .unwrap();
        assert_eq!(file.verse_key, "1:1");
        assert!(!file.has_timings);
        assert!(!file.lafzize_processing);

        let key = file.key();
        assert_eq!(
            tokio::fs::read(f.artifacts.audio_path(&key)).await.unwrap(),
            b"RIFF wav data"
        );
        let calls = f.transcoder.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        let (raw, staged) = &calls[0];
        assert!(!raw.exists());
        assert!(!staged.exists());
        assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert_eq!(recitation_entries(&f).await, vec!["1:1.mp3"]);
    }

    #[tokio::test]
    async fn test_upload_requires_recitation() {
        let f = fixture();
        let result = f.service.upload(&f.alice, "warsh", "1:1", b"data").await;
        assert!(matches!(result, Err(UploadError::RecitationNotFound(_))));
        assert!(f.transcoder.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_existing_verse() {
        let f = fixture();
        assert_ok!(f.service.upload(&f.alice, "hafs", "1:1", b"first").await);

        let err = assert_err!(f.service.upload(&f.alice, "hafs", "1:1", b"second").await);
        assert!(matches!(err, UploadError::AlreadyExists(_)));

        let key = FileKey::new("alice", "hafs", "1:1");
        assert_eq!(
            tokio::fs::read(f.artifacts.audio_path(&key)).await.unwrap(),
            b"first"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_input() {
        let f = fixture();
        assert!(matches!(
            f.service.upload(&f.alice, "hafs", "../1", b"data").await,
            Err(UploadError::Invalid(_))
        ));
        assert!(matches!(
            f.service.upload(&f.alice, "hafs", "1:1", b"").await,
            Err(UploadError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_transcode_failure_leaves_nothing() {
        let f = fixture();
        f.transcoder.set_failure(Some("unsupported codec")).await;

        let result = f.service.upload(&f.alice, "hafs", "1:1", b"garbage").await;
        assert!(matches!(result, Err(UploadError::Transcode(_))));

        let key = FileKey::new("alice", "hafs", "1:1");
        assert!(f.store.get_file(&key).unwrap().is_none());
        assert!(recitation_entries(&f).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_of_one_verse() {
        let f = fixture();
        f.transcoder.hold();

        let release = async {
            while f.transcoder.recorded_calls().await.len() < 2 {
                tokio::task::yield_now().await;
            }
            f.transcoder.release();
        };
        let (first, second, ()) = tokio::join!(
            f.service.upload(&f.alice, "hafs", "1:1", b"first"),
            f.service.upload(&f.alice, "hafs", "1:1", b"second"),
            release
        );

        let (winner, loser) = match (first, second) {
            (Ok(file), Err(e)) => ((file, &b"first"[..]), e),
            (Err(e), Ok(file)) => ((file, &b"second"[..]), e),
            other => panic!("expected exactly one upload to win, got {:?}", other),
        };
        assert!(matches!(loser, UploadError::AlreadyExists(_)));

        let key = winner.0.key();
        assert!(f.store.get_file(&key).unwrap().is_some());
        assert_eq!(
            tokio::fs::read(f.artifacts.audio_path(&key)).await.unwrap(),
            winner.1
        );
        assert_eq!(recitation_entries(&f).await, vec!["1:1.mp3"]);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_artifacts() {
        let f = fixture();
        let file = f
            .service
            .upload(&f.alice, "hafs", "1:1", b"audio")
            .await
            .unwrap();
        let key = file.key();
        f.artifacts
            .write_timing(&key, "manual", &fixtures::timing())
            .await
            .unwrap();

        let deleted = f.service.delete(&f.alice, "hafs", "1:1").await.unwrap();
        assert_eq!(deleted.verse_key, "1:1");
        assert!(f.store.get_file(&key).unwrap().is_none());
        assert!(!f.artifacts.audio_path(&key).exists());
        assert!(!f.artifacts.timings_path(&key).exists());

        assert!(matches!(
            f.service.delete(&f.alice, "hafs", "1:1").await,
            Err(UploadError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_allowed_while_processing() {
        let f = fixture();
        let file = f
            .service
            .upload(&f.alice, "hafs", "1:1", b"audio")
            .await
            .unwrap();
        f.store.begin_processing(&file.key()).unwrap();

        let deleted = f.service.delete(&f.alice, "hafs", "1:1").await.unwrap();
        assert!(deleted.lafzize_processing);
    }
}
