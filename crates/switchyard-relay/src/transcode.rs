use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Turns an arbitrary audio file into something the master shows as a voice
/// note.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Write an OGG/Opus rendition next to `input` and return its path. The
    /// caller removes the output.
    async fn to_voice(&self, input: &Path) -> Result<PathBuf>;
}

/// Shells out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

pub(crate) fn voice_output_path(input: &Path) -> PathBuf {
    let mut out = input.as_os_str().to_owned();
    out.push(".ogg");
    PathBuf::from(out)
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn to_voice(&self, input: &Path) -> Result<PathBuf> {
        let output = voice_output_path(input);
        debug!(input = %input.display(), output = %output.display(), "transcoding audio");
        let result = Command::new(&self.program)
            .arg("-y")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-c:a", "libopus", "-f", "ogg"])
            .arg(&output)
            .output()
            .await
            .map_err(|e| RelayError::Transcode(format!("{}: {e}", self.program)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let _ = tokio::fs::remove_file(&output).await;
            return Err(RelayError::Transcode(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}
