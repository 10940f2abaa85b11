//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::transcoder::{TranscodeError, Transcoder};

/// Mock implementation of the Transcoder trait.
///
/// Copies the input to the output unchanged, or fails with the configured
/// message. Every call is recorded. [`hold`](Self::hold) parks calls after
/// recording them, so tests can line up concurrent uploads.
#[derive(Debug)]
pub struct MockTranscoder {
    calls: Arc<RwLock<Vec<(PathBuf, PathBuf)>>>,
    failure: Arc<RwLock<Option<String>>>,
    gate: watch::Sender<bool>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            gate,
        }
    }

    /// Make every following call fail, or succeed again with `None`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(|m| m.to_string());
    }

    /// Recorded `(input, output)` pairs.
    pub async fn recorded_calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.read().await.clone()
    }

    /// Park calls until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future calls through.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.calls
            .write()
            .await
            .push((input.to_path_buf(), output.to_path_buf()));

        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow_and_update();
            if open || gate.changed().await.is_err() {
                break;
            }
        }

        if let Some(message) = self.failure.read().await.clone() {
            return Err(TranscodeError::failed(message, None));
        }

        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}
