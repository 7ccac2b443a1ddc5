//! Local Whisper transcription through the `whisper` command-line program.

use super::Transcriber;
use crate::error::{Result, YoutubotError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Whisper running on this machine.
pub struct LocalWhisper {
    binary: String,
    model: String,
}

impl LocalWhisper {
    /// Create a transcriber without checking that the program exists.
    pub fn new(binary: &str, model: &str) -> Self {
        Self {
            binary: binary.to_string(),
            model: model.to_string(),
        }
    }

    /// Probe for a working Whisper install.
    ///
    /// Returns `None` (and logs a warning) when the program is missing, so
    /// callers can keep running with captions only.
    pub fn detect(binary: &str, model: &str) -> Option<Self> {
        match std::process::Command::new(binary)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                info!("Local Whisper found ({}, model '{}')", binary, model);
                Some(Self::new(binary, model))
            }
            Ok(status) => {
                warn!("{} --help exited with {}; local transcription unavailable", binary, status);
                None
            }
            Err(e) => {
                warn!("Could not run {}: {}; local transcription unavailable", binary, e);
                None
            }
        }
    }

    /// Model name passed to Whisper.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Transcriber for LocalWhisper {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<String> {
        let output_dir = audio_path
            .parent()
            .ok_or_else(|| YoutubotError::Transcription("Audio path has no parent directory".to_string()))?;

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| YoutubotError::Transcription("Audio path has no file name".to_string()))?;

        let mut command = Command::new(&self.binary);
        command
            .arg(audio_path)
            .arg("--model").arg(&self.model)
            .arg("--output_format").arg("txt")
            .arg("--output_dir").arg(output_dir)
            .arg("--fp16").arg("False")
            .arg("--verbose").arg("False");

        if let Some(lang) = language {
            command.arg("--language").arg(lang);
        }

        debug!("Running {} on {:?}", self.binary, audio_path);

        let output = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    YoutubotError::ToolNotFound(self.binary.clone())
                } else {
                    YoutubotError::Transcription(format!("Failed to run {}: {}", self.binary, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YoutubotError::ToolFailed(format!(
                "{} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        let text_path = output_dir.join(format!("{}.txt", stem));
        let text = tokio::fs::read_to_string(&text_path).await.map_err(|e| {
            YoutubotError::Transcription(format!("Whisper produced no transcript at {:?}: {}", text_path, e))
        })?;

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!("Transcribed {} characters", text.len());
        Ok(text)
    }
}
