//! Video sources for Youtubot.
//!
//! Provides trait-based access to video metadata, playlist expansion, audio
//! download and platform captions.

mod captions;
mod youtube;

pub use captions::YoutubeCaptions;
pub use youtube::{extract_video_id, YoutubeSource};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build the canonical watch URL for a video ID.
pub fn canonical_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// What a user asked to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Video,
    Playlist,
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(ContentKind::Video),
            "playlist" => Ok(ContentKind::Playlist),
            _ => Err(format!("Unknown content type: {}", s)),
        }
    }
}

/// Identity of a single video as reported by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Platform video ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Uploader or channel name.
    pub author: String,
    /// Canonical watch URL.
    pub canonical_url: String,
}

/// Metadata recorded for every ingested video.
///
/// Stored verbatim next to a saved index and loaded back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub canonical_url: String,
    pub author: String,
    /// Language code the transcript was requested in.
    pub language: String,
}

impl VideoMetadata {
    /// Attach the requested language to resolved video info.
    pub fn from_info(info: &VideoInfo, language: &str) -> Self {
        Self {
            title: info.title.clone(),
            canonical_url: info.canonical_url.clone(),
            author: info.author.clone(),
            language: language.to_string(),
        }
    }
}

/// Trait for video metadata and media providers.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Resolve canonical identity and metadata for a video URL.
    async fn resolve_video(&self, url: &str) -> Result<VideoInfo>;

    /// Expand a playlist URL into video URLs without fetching per-video metadata.
    async fn expand_playlist(&self, url: &str) -> Result<Vec<String>>;

    /// Download the audio track of a video into `output_dir`.
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// Trait for platform caption stores.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Fetch caption text in the first available language of `languages`.
    ///
    /// `Ok(None)` means the video has no usable captions.
    async fn fetch_captions(&self, video_id: &str, languages: &[&str]) -> Result<Option<String>>;
}
