//! Platform captions via the YouTube transcript endpoint.

use super::CaptionProvider;
use crate::error::{Result, YoutubotError};
use async_trait::async_trait;
use tracing::{debug, instrument};
use yt_transcript_rs::api::YouTubeTranscriptApi;

/// Caption provider backed by `yt-transcript-rs`.
pub struct YoutubeCaptions {
    api: YouTubeTranscriptApi,
}

impl YoutubeCaptions {
    /// Create a caption provider with default HTTP settings.
    pub fn new() -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None).map_err(|e| {
            YoutubotError::Captions(format!("Failed to create transcript client: {:?}", e))
        })?;
        Ok(Self { api })
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    #[instrument(skip(self))]
    async fn fetch_captions(&self, video_id: &str, languages: &[&str]) -> Result<Option<String>> {
        let transcript = self
            .api
            .fetch_transcript(video_id, languages, false)
            .await
            .map_err(|e| YoutubotError::Captions(format!("{:?}", e)))?;

        let mut parts: Vec<String> = Vec::new();
        for entry in transcript {
            let text = entry.text.trim().to_string();
            if !text.is_empty() {
                parts.push(text);
            }
        }

        debug!("Fetched {} caption segments for {}", parts.len(), video_id);

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join(" ")))
        }
    }
}
