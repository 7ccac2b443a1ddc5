//! Configuration module for Youtubot.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, NO_CONTEXT_PROMPT, RAG_PROMPT, WEB_QA_PROMPT};
pub use settings::{
    EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings, RagSettings,
    SessionSettings, Settings, TranscriptionSettings, TtsSettings, WebSearchSettings,
};
