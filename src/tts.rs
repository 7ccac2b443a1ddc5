//! Spoken answers through Google Translate's speech endpoint.
//!
//! The endpoint accepts at most 100 characters per request, so longer text is
//! split on word boundaries and the MP3 pieces are concatenated.

use crate::config::TtsSettings;
use crate::error::{Result, YoutubotError};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Longest piece of text sent in one request.
pub const MAX_PIECE_CHARS: usize = 100;

/// Text-to-speech client.
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    language_map: HashMap<String, String>,
    enabled: bool,
}

impl SpeechSynthesizer {
    pub fn from_settings(settings: &TtsSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .map_err(|e| YoutubotError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            language_map: settings.language_map.clone(),
            enabled: settings.enabled,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Voice language for an answer language, after configured overrides.
    pub fn voice_language(&self, language: &str) -> String {
        self.language_map
            .get(language)
            .cloned()
            .unwrap_or_else(|| language.to_string())
    }

    /// Synthesize MP3 audio. Returns `None` for empty text, when disabled,
    /// or when the service could not be reached.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn synthesize(&self, text: &str, language: &str) -> Option<Vec<u8>> {
        if !self.enabled || text.trim().is_empty() {
            return None;
        }

        match self.fetch_all(text, &self.voice_language(language)).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                None
            }
        }
    }

    async fn fetch_all(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        let pieces = split_for_tts(text, MAX_PIECE_CHARS);
        let total = pieces.len().to_string();
        let mut audio = Vec::new();

        for (idx, piece) in pieces.iter().enumerate() {
            let url = Url::parse_with_params(
                TTS_ENDPOINT,
                &[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", piece.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.to_string().as_str()),
                    ("textlen", piece.chars().count().to_string().as_str()),
                ],
            )
            .map_err(|e| YoutubotError::Speech(format!("Invalid speech URL: {}", e)))?;

            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(YoutubotError::Speech(format!(
                    "Speech endpoint returned {} for language '{}'",
                    status, language
                )));
            }

            let bytes = response.bytes().await?;
            debug!("Received {} bytes for piece {}/{}", bytes.len(), idx + 1, pieces.len());
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// Split text into pieces of at most `max_chars` characters on word
/// boundaries. Words longer than the limit are cut.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            pieces.push(word.into_iter().collect());
            word = rest;
        }

        let extra = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + extra > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
