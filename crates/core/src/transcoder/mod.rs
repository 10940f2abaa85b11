//! Upload transcoding.

mod error;
mod ffmpeg;
mod traits;

pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
