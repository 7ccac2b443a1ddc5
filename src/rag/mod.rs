//! Question answering over an ingested knowledge base.
//!
//! Answers come from the transcript when retrieval is confident enough and
//! from a web search snippet otherwise. Every answer carries its sources,
//! the language it was produced in and where it came from.

mod engine;
mod language;

pub use engine::QueryEngine;
pub use language::{language_name, resolve_language};

use crate::index::ScoredPassage;
use serde::{Deserialize, Serialize};

/// Minimum top similarity for answering from the transcript.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Number of passages retrieved per question.
pub const DEFAULT_RETRIEVAL_K: usize = 4;

/// Returned when no knowledge base is active.
pub const SETUP_REQUIRED_MESSAGE: &str = "Please process a video/playlist or load a session first.";

/// Returned when neither the transcript nor the web had anything and no
/// localized message exists.
pub const CONTENT_NOT_FOUND_MESSAGE: &str = "Content not found.";

/// A source cited by an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_title: String,
    pub video_url: String,
    pub text_content: String,
    pub similarity_score: f32,
}

impl From<ScoredPassage> for SearchResult {
    fn from(scored: ScoredPassage) -> Self {
        Self {
            video_title: scored.passage.source_title,
            video_url: scored.passage.source_url,
            text_content: scored.passage.text,
            similarity_score: scored.score,
        }
    }
}

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    /// Nothing has been ingested or loaded yet.
    SetupRequired,
    /// Answered from transcript passages.
    Context,
    /// Answered from a web search snippet.
    Web,
    /// Neither the transcript nor the web had content.
    NotFound,
    /// Answering failed; the answer holds the error.
    Failed,
}

impl std::fmt::Display for AnswerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerOrigin::SetupRequired => write!(f, "setup required"),
            AnswerOrigin::Context => write!(f, "video"),
            AnswerOrigin::Web => write!(f, "web search"),
            AnswerOrigin::NotFound => write!(f, "not found"),
            AnswerOrigin::Failed => write!(f, "error"),
        }
    }
}

/// An answer with its sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<SearchResult>,
    /// Resolved language code of the answer.
    pub language: String,
    pub confidence_score: Option<f32>,
    pub origin: AnswerOrigin,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if let Some(confidence) = self.confidence_score {
            output.push_str(&format!(
                "\n\n[{} | confidence {:.2} | {}]",
                self.origin, confidence, self.language
            ));
        }

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (score: {:.2})",
                    source.video_title, source.similarity_score
                ));
                if !source.video_url.is_empty() {
                    output.push_str(&format!("\n  {}", source.video_url));
                }
            }
        }

        output
    }
}
