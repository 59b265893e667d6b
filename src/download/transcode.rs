//! Conversion of raw streams into the configured output format.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::error::PostProcessError;
use crate::session::AudioQuality;

/// Characters of transcoder stderr kept in error messages.
const STDERR_EXCERPT_CHARS: usize = 400;

/// Converts a raw audio file into the output container and bitrate.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Writes `output` from `input`; the output format follows the extension of `output`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        quality: AudioQuality,
    ) -> Result<(), PostProcessError>;
}

/// Transcoder backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Creates a transcoder running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn arguments(input: &Path, output: &Path, quality: AudioQuality) -> Vec<std::ffi::OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-ab".into(),
            quality.bitrate().into(),
            output.as_os_str().to_owned(),
        ]
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        quality: AudioQuality,
    ) -> Result<(), PostProcessError> {
        let result = Command::new(&self.program)
            .args(Self::arguments(input, output, quality))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PostProcessError::transcode(format!(
                    "cannot start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(PostProcessError::transcode(format!(
                "{} exited with {}: {excerpt}",
                self.program.display(),
                result.status
            )));
        }
        debug!(output = %output.display(), bitrate = quality.bitrate(), "transcoded");
        Ok(())
    }
}
