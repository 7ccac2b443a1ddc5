//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting operations
//! that would otherwise fail midway.

use crate::error::{Result, YoutubotError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion resolves metadata and playlists with yt-dlp.
    Ingest,
    /// Local transcription also needs ffmpeg for audio extraction.
    LocalTranscription,
    /// Answering questions has no local tool requirements.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_tool("yt-dlp")?;
        }
        Operation::LocalTranscription => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
        }
        Operation::Ask => {}
    }
    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        "whisper" => "--help",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(YoutubotError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(YoutubotError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(YoutubotError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
