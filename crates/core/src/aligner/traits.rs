use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::Path;

use super::AlignerError;

/// Raw alignment payload as it arrives from the service.
pub type AlignmentStream = BoxStream<'static, Result<Vec<u8>, AlignerError>>;

/// Produces word-level timings for a verse recitation.
#[async_trait]
pub trait Aligner: Send + Sync {
    /// Returns the name of this aligner implementation.
    fn name(&self) -> &str;

    /// Submit the audio and verse key. Resolves once the service has accepted
    /// the request and started answering; the payload is then streamed.
    async fn align(&self, audio_path: &Path, verse_key: &str)
        -> Result<AlignmentStream, AlignerError>;
}
