//! Transcript acquisition for Youtubot.
//!
//! A transcript is obtained through a ranked list of strategies:
//!
//! - **Captions**: the platform's caption store, in the requested language
//!   and then English.
//! - **Local transcription**: download the audio and run Whisper locally.
//!   Only used when the caller enables it and a Whisper install was found.

mod acquire;
mod local;

pub use acquire::{TranscriptAcquirer, TranscriptOutcome, TranscriptPolicy, TranscriptStrategy};
pub use local::LocalWhisper;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech-to-text engines.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into plain text.
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<String>;
}
