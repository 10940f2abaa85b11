//! FFmpeg-based transcoder.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::TranscodeError;
use super::traits::Transcoder;

pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// The output container and codec follow from the output extension.
    fn build_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(TranscodeError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let args = Self::build_args(input, output);
        debug!(ffmpeg = %self.ffmpeg_path.display(), ?args, "Running ffmpeg");

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(TranscodeError::failed(
                format!("FFmpeg exited with code: {:?}", result.status.code()),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        let produced = tokio::fs::metadata(output)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(TranscodeError::failed("Output file not created", None));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let args = FfmpegTranscoder::build_args(Path::new("/in/1:1.raw"), Path::new("/out/1:1.mp3"));
        assert_eq!(args[0], "-y");
        assert_eq!(args[1], "-i");
        assert_eq!(args[2], "/in/1:1.raw");
        assert_eq!(args.last().unwrap(), "/out/1:1.mp3");
        assert!(args.contains(&"-loglevel".to_string()));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let transcoder = FfmpegTranscoder::new("ffmpeg");
        let result = transcoder
            .transcode(&dir.path().join("nope.raw"), &dir.path().join("out.mp3"))
            .await;
        assert!(matches!(result, Err(TranscodeError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.raw");
        tokio::fs::write(&input, b"data").await.unwrap();

        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        let result = transcoder.transcode(&input, &dir.path().join("out.mp3")).await;
        assert!(matches!(result, Err(TranscodeError::FfmpegNotFound { .. })));
    }
}
