use async_trait::async_trait;
use std::path::Path;

use super::error::TranscodeError;

/// Turns an uploaded audio file of any format into the served mp3.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Transcode `input` into `output`, replacing `output` if it exists.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}
