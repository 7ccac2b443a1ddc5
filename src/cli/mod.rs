//! CLI module for Youtubot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Youtubot - chat with YouTube videos
///
/// Builds a searchable knowledge base from the transcripts of a video or
/// playlist and answers questions about it, falling back to a web search
/// when the videos do not cover a question.
#[derive(Parser, Debug)]
#[command(name = "youtubot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where transcripts come from when ingesting.
#[derive(clap::Args, Debug, Clone)]
pub struct IngestArgs {
    /// Treat the URL as a playlist and ingest every video in it
    #[arg(long)]
    pub playlist: bool,

    /// Transcript language code (captions are looked up in this language, then English)
    #[arg(short, long, default_value = "en")]
    pub lang: String,

    /// Transcribe locally with Whisper when a video has no captions
    #[arg(long)]
    pub local_transcription: bool,

    /// Skip captions and always transcribe locally
    #[arg(long, conflicts_with = "local_transcription")]
    pub force_local: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Ingest a video or playlist and save it as a named session
    Ingest {
        /// YouTube video or playlist URL
        url: String,

        /// Session name to save under
        #[arg(short, long)]
        name: String,

        #[command(flatten)]
        source: IngestArgs,
    },

    /// Ask a single question against a saved session
    Ask {
        /// The question to ask
        question: String,

        /// Session to answer from
        #[arg(short, long)]
        session: String,

        /// Answer in this language instead of the video's
        #[arg(short, long)]
        answer_lang: Option<String>,

        /// Also write the answer as speech to this MP3 file
        #[arg(long)]
        speak: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Saved session to chat with
        #[arg(short, long, conflicts_with = "url")]
        session: Option<String>,

        /// Ingest this video or playlist first
        #[arg(short, long)]
        url: Option<String>,

        #[command(flatten)]
        source: IngestArgs,

        /// Save the freshly ingested knowledge base under this name
        #[arg(long, requires = "url")]
        save: Option<String>,

        /// Answer in this language instead of the video's
        #[arg(short, long)]
        answer_lang: Option<String>,

        /// Write every answer as speech into this directory
        #[arg(long)]
        speak_dir: Option<String>,
    },

    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List saved sessions
    List,

    /// Delete a saved session
    Delete {
        /// Session name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
