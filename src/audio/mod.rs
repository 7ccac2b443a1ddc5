//! Audio download utilities.
//!
//! Downloads the audio track of a video with yt-dlp so it can be fed to local
//! speech-to-text.

use crate::error::{Result, YoutubotError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// File stem used for downloaded audio inside a scratch directory.
const AUDIO_STEM: &str = "audio";

/// Downloads the audio of `url` into `output_dir` as MP3.
///
/// `output_dir` is expected to be a directory owned by the caller for the
/// duration of one transcription; the caller is responsible for removing it.
#[instrument(skip(output_dir))]
pub async fn download_audio(url: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", AUDIO_STEM));

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio/best")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("192K")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--no-check-certificate")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(YoutubotError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(YoutubotError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(YoutubotError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
    }

    find_audio_file(output_dir)
}

/// Locates the downloaded audio file in a scratch directory.
fn find_audio_file(dir: &Path) -> Result<PathBuf> {
    // Common audio formats that yt-dlp may produce
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", AUDIO_STEM, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir)
        .map_err(|e| YoutubotError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(AUDIO_STEM) {
            return Ok(entry.path());
        }
    }

    Err(YoutubotError::AudioDownload("Audio file not found after download".into()))
}
