//! Interactive chat command.

use super::ask::speak_to_file;
use super::ingest::ingest_url;
use crate::cli::{IngestArgs, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{language_name, RagResponse};
use crate::session::SessionStore;
use crate::tts::SpeechSynthesizer;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Empty,
    Exit,
    Help,
    /// `/lang xx` sets an answer language, `/lang auto` clears it.
    Lang(Option<String>),
    Save(String),
    Load(String),
    Sources,
    Unknown(String),
    Question(String),
}

fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return ChatInput::Exit;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Question(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match (name, arg) {
        ("exit" | "quit", _) => ChatInput::Exit,
        ("help", _) => ChatInput::Help,
        ("sources", _) => ChatInput::Sources,
        ("lang", "") => ChatInput::Unknown(line.to_string()),
        ("lang", lang) if lang.eq_ignore_ascii_case("auto") => ChatInput::Lang(None),
        ("lang", lang) => ChatInput::Lang(Some(lang.to_lowercase())),
        ("save", name) if !name.is_empty() => ChatInput::Save(name.to_string()),
        ("load", name) if !name.is_empty() => ChatInput::Load(name.to_string()),
        _ => ChatInput::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("{}", style("Commands:").bold());
    Output::kv("/lang xx", "answer in language xx (e.g. tr, de)");
    Output::kv("/lang auto", "answer in the video's language");
    Output::kv("/save NAME", "save the current knowledge base as a session");
    Output::kv("/load NAME", "switch to a saved session");
    Output::kv("/sources", "show the sources of the last answer");
    Output::kv("exit", "leave the chat");
}

/// Options for the chat command.
pub struct ChatOptions {
    pub session: Option<String>,
    pub url: Option<String>,
    pub source: IngestArgs,
    pub save: Option<String>,
    pub answer_lang: Option<String>,
    pub speak_dir: Option<String>,
}

/// Run the interactive chat command.
pub async fn run_chat(options: ChatOptions, settings: Settings) -> Result<()> {
    let store = SessionStore::new(settings.sessions_dir());
    let synthesizer = SpeechSynthesizer::from_settings(&settings.tts)?;
    let speak_dir = options.speak_dir.as_deref().map(Settings::expand_path);

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.build_query_engine()?;

    if let Some(name) = &options.session {
        let knowledge = store.load(name)?;
        Output::info(&format!("Loaded session '{}'", name));
        for video in &knowledge.videos {
            Output::video_info(video);
        }
        engine.load(knowledge).await;
    } else if let Some(url) = &options.url {
        let report = ingest_url(&orchestrator, url, &options.source).await?;
        if let Some(name) = &options.save {
            store.save(name, &report.knowledge)?;
            Output::success(&format!("Saved session '{}'", name));
        }
        engine.load(report.knowledge).await;
    } else {
        Output::warning("No video loaded. Use /load NAME or restart with --url or --session.");
    }

    let mut answer_lang = options.answer_lang.clone();
    let mut last_response: Option<RagResponse> = None;
    let mut spoken = 0usize;

    println!("\n{}", style("Youtubot Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about the video, '/help' for commands, or 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            println!();
            break;
        }

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Help => print_help(),
            ChatInput::Lang(lang) => {
                match &lang {
                    Some(code) => Output::info(&format!("Answering in {}", language_name(code))),
                    None => Output::info("Answering in the video's language"),
                }
                answer_lang = lang;
            }
            ChatInput::Save(name) => match engine.knowledge().await {
                Some(knowledge) => match store.save(&name, &knowledge) {
                    Ok(()) => Output::success(&format!("Saved session '{}'", name)),
                    Err(e) => Output::error(&format!("Failed to save session: {}", e)),
                },
                None => Output::warning("Nothing to save yet."),
            },
            ChatInput::Load(name) => match store.load(&name) {
                Ok(knowledge) => {
                    engine.load(knowledge).await;
                    last_response = None;
                    Output::success(&format!("Loaded session '{}'", name));
                }
                Err(e) => Output::error(&format!("{}", e)),
            },
            ChatInput::Sources => match &last_response {
                Some(response) if !response.sources.is_empty() => {
                    for source in &response.sources {
                        Output::search_result(
                            &source.video_title,
                            source.similarity_score,
                            &source.text_content,
                            &source.video_url,
                        );
                    }
                    println!();
                }
                _ => Output::info("The last answer has no video sources."),
            },
            ChatInput::Unknown(command) => {
                Output::warning(&format!("Unknown command: {}", command));
                print_help();
            }
            ChatInput::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let response = engine.answer(&question, answer_lang.as_deref()).await;
                spinner.finish_and_clear();

                debug!("Answered via {}", response.origin);
                Output::answer(&response, false);
                println!();

                if let Some(dir) = &speak_dir {
                    spoken += 1;
                    let path: PathBuf = dir.join(format!("answer-{:03}.mp3", spoken));
                    if let Err(e) = speak_to_file(&synthesizer, &response, &path).await {
                        Output::error(&format!("Failed to write audio: {}", e));
                    }
                }

                last_response = Some(response);
            }
        }
    }

    Ok(())
}
