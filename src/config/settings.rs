//! Configuration settings for Youtubot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub rag: RagSettings,
    pub transcription: TranscriptionSettings,
    pub sessions: SessionSettings,
    pub web_search: WebSearchSettings,
    pub tts: TtsSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio).
    pub temp_dir: String,
    /// Log level without `-v` (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.youtubot".to_string(),
            temp_dir: "/tmp/youtubot".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model name as known by the serving endpoint.
    pub model: String,
    /// OpenAI-compatible endpoint. Defaults to a local Ollama server.
    pub api_base: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "llama3".to_string(),
            api_base: Some("http://localhost:11434/v1".to_string()),
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

impl LlmSettings {
    /// Endpoint to use, honouring `OLLAMA_HOST` when it is set.
    pub fn resolved_api_base(&self) -> Option<String> {
        match std::env::var("OLLAMA_HOST") {
            Ok(host) if !host.trim().is_empty() => {
                Some(format!("{}/v1", host.trim().trim_end_matches('/')))
            }
            _ => self.api_base.clone(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Custom OpenAI-compatible endpoint (None = api.openai.com).
    pub api_base: Option<String>,
    /// Requested embedding dimensions (None = model default).
    pub dimensions: Option<u32>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            api_base: None,
            dimensions: None,
        }
    }
}

/// Retrieval and answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of passages retrieved per question.
    pub retrieval_k: usize,
    /// Minimum top similarity for answering from the transcript.
    pub confidence_threshold: f32,
    /// Passage size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive passages.
    pub chunk_overlap: usize,
    /// Language used when nothing else decides it.
    pub default_language: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            retrieval_k: 4,
            confidence_threshold: crate::rag::DEFAULT_CONFIDENCE_THRESHOLD,
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::chunking::DEFAULT_CHUNK_OVERLAP,
            default_language: "en".to_string(),
        }
    }
}

/// Local speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Allow local Whisper transcription at all.
    pub local_enabled: bool,
    /// Whisper command-line program.
    pub whisper_binary: String,
    /// Whisper model name ("base" is multilingual, "base.en" English-only).
    pub whisper_model: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            local_enabled: true,
            whisper_binary: "whisper".to_string(),
            whisper_model: "base".to_string(),
        }
    }
}

/// Saved session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Directory holding one sub-directory per saved session.
    pub dir: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dir: "~/.youtubot/sessions".to_string(),
        }
    }
}

/// Web search fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    /// Backends tried in order (duckduckgo_html, duckduckgo_lite, instant_answer).
    pub backends: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Results requested from each backend; only the best is used.
    pub max_results: usize,
    /// DuckDuckGo region code.
    pub region: String,
    /// DuckDuckGo safe search level (on, moderate, off).
    pub safesearch: String,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            backends: vec![
                "duckduckgo_html".to_string(),
                "duckduckgo_lite".to_string(),
                "instant_answer".to_string(),
            ],
            timeout_secs: 10,
            max_results: 3,
            region: "wt-wt".to_string(),
            safesearch: "moderate".to_string(),
        }
    }
}

/// Spoken answer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Enable speech synthesis.
    pub enabled: bool,
    /// Response language -> voice language overrides.
    pub language_map: HashMap<String, String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            language_map: HashMap::new(),
            timeout_secs: 20,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// TOML file with prompt tables merged over the built-in templates.
    pub custom_file: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::YoutubotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("youtubot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded session directory path.
    pub fn sessions_dir(&self) -> PathBuf {
        Self::expand_path(&self.sessions.dir)
    }
}
