//! HTTP client for the lafzize alignment service.
//!
//! The service takes a multipart form with the audio under `file` and the
//! verse key under `verse_key`, and answers with the timing JSON.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{multipart, Client};
use std::path::Path;
use tracing::debug;

use super::{Aligner, AlignerError, AlignmentStream};

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 512;

pub struct LafzizeClient {
    client: Client,
    endpoint: String,
}

impl LafzizeClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Aligner for LafzizeClient {
    fn name(&self) -> &str {
        "lafzize"
    }

    async fn align(
        &self,
        audio_path: &Path,
        verse_key: &str,
    ) -> Result<AlignmentStream, AlignerError> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| AlignerError::AudioUnreadable {
                path: audio_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.mp3", verse_key));

        let part = multipart::Part::bytes(audio)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| AlignerError::Request(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("verse_key", verse_key.to_string());

        debug!(endpoint = %self.endpoint, verse_key, "Submitting audio for alignment");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AlignerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(AlignerError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let stream = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| AlignerError::Stream(e.to_string()));

        Ok(Box::pin(stream))
    }
}
