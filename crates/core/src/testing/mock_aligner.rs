//! Mock aligner for testing.

use async_trait::async_trait;
use futures::stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::aligner::{Aligner, AlignerError, AlignmentStream};

/// A recorded alignment request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlignment {
    pub audio_path: PathBuf,
    pub verse_key: String,
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockAlignment {
    /// Stream these bytes, split into two chunks.
    Payload(Vec<u8>),
    /// Fail before any payload arrives.
    RequestFailure(String),
    /// The service answers with an error status.
    ServiceFailure { status: u16, message: String },
    /// Stream these bytes, then break the stream.
    BrokenStream(Vec<u8>),
}

/// Mock implementation of the Aligner trait.
///
/// Provides controllable behavior for testing:
/// - Record every request
/// - Answer with a payload or one of the failure modes
/// - Hold requests until released, to observe a job mid-flight
///
/// # Example
///
/// ```rust,ignore
/// use tilawah_core::testing::MockAligner;
///
/// let aligner = MockAligner::new();
/// aligner.set_payload(br#"{"segments":[]}"#.to_vec()).await;
/// aligner.hold();
///
/// // Submit a job; it stays in flight...
/// aligner.release();
/// ```
#[derive(Debug)]
pub struct MockAligner {
    requests: Arc<RwLock<Vec<RecordedAlignment>>>,
    response: Arc<RwLock<MockAlignment>>,
    gate: watch::Sender<bool>,
}

impl Default for MockAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAligner {
    /// Create a new mock aligner answering with an empty timing document.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            response: Arc::new(RwLock::new(MockAlignment::Payload(
                br#"{"segments":[]}"#.to_vec(),
            ))),
            gate,
        }
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedAlignment> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests received.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn set_response(&self, response: MockAlignment) {
        *self.response.write().await = response;
    }

    pub async fn set_payload(&self, payload: Vec<u8>) {
        self.set_response(MockAlignment::Payload(payload)).await;
    }

    pub async fn set_request_failure(&self, message: impl Into<String>) {
        self.set_response(MockAlignment::RequestFailure(message.into()))
            .await;
    }

    /// Make requests wait until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future requests through.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl Aligner for MockAligner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn align(
        &self,
        audio_path: &Path,
        verse_key: &str,
    ) -> Result<AlignmentStream, AlignerError> {
        self.requests.write().await.push(RecordedAlignment {
            audio_path: audio_path.to_path_buf(),
            verse_key: verse_key.to_string(),
        });

        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow_and_update();
            if open || gate.changed().await.is_err() {
                break;
            }
        }

        let response = self.response.read().await.clone();
        match response {
            MockAlignment::Payload(payload) => {
                let chunks = split_in_two(payload)
                    .into_iter()
                    .map(Ok)
                    .collect::<Vec<_>>();
                Ok(Box::pin(stream::iter(chunks)))
            }
            MockAlignment::RequestFailure(message) => Err(AlignerError::Request(message)),
            MockAlignment::ServiceFailure { status, message } => {
                Err(AlignerError::Service { status, message })
            }
            MockAlignment::BrokenStream(payload) => {
                let mut chunks: Vec<Result<Vec<u8>, AlignerError>> =
                    split_in_two(payload).into_iter().map(Ok).collect();
                chunks.push(Err(AlignerError::Stream("connection reset".to_string())));
                Ok(Box::pin(stream::iter(chunks)))
            }
        }
    }
}

fn split_in_two(mut payload: Vec<u8>) -> Vec<Vec<u8>> {
    let tail = payload.split_off(payload.len() / 2);
    vec![payload, tail]
}
