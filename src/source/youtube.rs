//! YouTube source implementation backed by yt-dlp.

use super::{canonical_url, VideoInfo, VideoSource};
use crate::audio::download_audio;
use crate::error::{Result, YoutubotError};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, instrument};

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("video id pattern is valid")
    })
}

/// Extract a video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// YouTube video source.
pub struct YoutubeSource {
    binary: String,
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    /// Run yt-dlp with the given arguments and return stdout.
    async fn run_ytdlp(&self, args: &[&str]) -> Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    YoutubotError::ToolNotFound(self.binary.clone())
                } else {
                    YoutubotError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YoutubotError::VideoSource(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the `--dump-json` output for a single video.
fn parse_video_json(json_str: &str, fallback_id: Option<&str>) -> Result<VideoInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str.trim()).map_err(|e| {
        YoutubotError::VideoSource(format!("Failed to parse yt-dlp output: {}", e))
    })?;

    let id = json["id"]
        .as_str()
        .or(fallback_id)
        .ok_or_else(|| YoutubotError::VideoSource("yt-dlp output has no video id".to_string()))?
        .to_string();

    let title = json["title"]
        .as_str()
        .unwrap_or("Unknown Title")
        .to_string();

    let author = json["uploader"]
        .as_str()
        .or_else(|| json["channel"].as_str())
        .unwrap_or("Unknown Author")
        .to_string();

    Ok(VideoInfo {
        canonical_url: canonical_url(&id),
        id,
        title,
        author,
    })
}

/// Parse `--flat-playlist --dump-json` output (one JSON object per line).
fn parse_playlist_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|json| {
            json["id"]
                .as_str()
                .map(|s| s.to_string())
                .or_else(|| json["url"].as_str().and_then(extract_video_id))
        })
        .map(|id| canonical_url(&id))
        .collect()
}

#[async_trait]
impl VideoSource for YoutubeSource {
    #[instrument(skip(self))]
    async fn resolve_video(&self, url: &str) -> Result<VideoInfo> {
        // Bare IDs are accepted by expanding them to a watch URL first
        let target = match extract_video_id(url) {
            Some(id) if !url.contains('/') => canonical_url(&id),
            _ => url.to_string(),
        };

        let stdout = self
            .run_ytdlp(&[
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--no-check-certificate",
                &target,
            ])
            .await?;

        let first = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let info = parse_video_json(first, extract_video_id(url).as_deref())?;
        debug!("Resolved {} as '{}'", url, info.title);
        Ok(info)
    }

    #[instrument(skip(self))]
    async fn expand_playlist(&self, url: &str) -> Result<Vec<String>> {
        let stdout = self
            .run_ytdlp(&["--flat-playlist", "--dump-json", "--no-warnings", url])
            .await?;

        let urls = parse_playlist_lines(&stdout);
        debug!("Playlist {} expanded to {} videos", url, urls.len());
        Ok(urls)
    }

    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        download_audio(url, output_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_parse_video_json() {
        let info = parse_video_json(
            r#"{"id": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up", "uploader": "Rick Astley"}"#,
            None,
        )
        .unwrap();

        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.author, "Rick Astley");
        assert_eq!(info.canonical_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_video_json_defaults() {
        let info = parse_video_json(r#"{"id": "abcdefghijk"}"#, None).unwrap();
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.author, "Unknown Author");

        assert!(parse_video_json("{}", None).is_err());
        assert!(parse_video_json("not json", Some("abcdefghijk")).is_err());
    }

    #[test]
    fn test_parse_playlist_lines() {
        let stdout = concat!(
            r#"{"id": "aaaaaaaaaaa", "title": "One"}"#,
            "\n\n",
            r#"{"url": "https://www.youtube.com/watch?v=bbbbbbbbbbb"}"#,
            "\n",
            "garbage\n",
        );

        assert_eq!(
            parse_playlist_lines(stdout),
            vec![
                "https://www.youtube.com/watch?v=aaaaaaaaaaa".to_string(),
                "https://www.youtube.com/watch?v=bbbbbbbbbbb".to_string(),
            ]
        );
    }
}
