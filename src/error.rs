//! Error types for Youtubot.

use thiserror::Error;

/// Library-level error type for Youtubot operations.
#[derive(Error, Debug)]
pub enum YoutubotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Video source error: {0}")]
    VideoSource(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Caption lookup failed: {0}")]
    Captions(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Similarity index error: {0}")]
    Index(String),

    #[error("No transcript could be obtained for any of the requested videos")]
    NoTranscripts,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session name: {0:?}")]
    InvalidSessionName(String),

    #[error("Session '{name}' could not be read: {reason}")]
    SessionMalformed { name: String, reason: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Web search failed: {0}")]
    WebSearch(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Youtubot operations.
pub type Result<T> = std::result::Result<T, YoutubotError>;
