//! Youtubot - chat with YouTube videos
//!
//! Turns the transcripts of a YouTube video or playlist into a searchable
//! knowledge base and answers questions about it with a language model.
//!
//! # Overview
//!
//! Youtubot allows you to:
//! - Ingest a video or a whole playlist from its captions, or transcribe it
//!   locally with Whisper when no captions exist
//! - Ask questions and get answers grounded in the transcript, with sources
//! - Fall back to a web search when the videos do not cover a question
//! - Answer in the video's language or any language you ask for
//! - Save knowledge bases as named sessions and load them later
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `source` - Video metadata, playlists and captions
//! - `audio` - Audio download for local transcription
//! - `transcription` - Transcript acquisition (captions, local Whisper)
//! - `chunking` - Splitting transcripts into passages
//! - `embedding` - Embedding generation
//! - `index` - In-memory similarity index and its on-disk format
//! - `session` - Named, saved knowledge bases
//! - `llm` - Chat model access
//! - `websearch` - Web search fallback
//! - `rag` - Question answering
//! - `tts` - Spoken answers
//! - `orchestrator` - Ingestion pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use youtubot::config::Settings;
//! use youtubot::orchestrator::Orchestrator;
//! use youtubot::source::ContentKind;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator
//!         .ingest("https://www.youtube.com/watch?v=dQw4w9WgXcQ", ContentKind::Video, "en", false)
//!         .await?;
//!
//!     let engine = orchestrator.build_query_engine()?;
//!     engine.load(report.knowledge).await;
//!
//!     let response = engine.answer("What is the song about?", None).await;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod source;
pub mod transcription;
pub mod tts;
pub mod websearch;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, YoutubotError};
