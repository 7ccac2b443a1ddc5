//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::RagResponse;
use crate::session::SessionStore;
use crate::tts::SpeechSynthesizer;
use anyhow::Result;
use std::path::Path;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    session: &str,
    answer_lang: Option<&str>,
    speak: Option<&str>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'youtubot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = SessionStore::new(settings.sessions_dir());
    let knowledge = store.load(session)?;

    let synthesizer = SpeechSynthesizer::from_settings(&settings.tts)?;
    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.build_query_engine()?;
    engine.load(knowledge).await;

    let spinner = Output::spinner("Searching knowledge base...");
    let response = engine.answer(question, answer_lang).await;
    spinner.finish_and_clear();

    Output::answer(&response, true);

    if let Some(path) = speak {
        speak_to_file(&synthesizer, &response, Path::new(path)).await?;
    }

    Ok(())
}

/// Synthesize an answer and write the MP3 to `path`.
///
/// A failed synthesis is reported but not treated as an error.
pub(crate) async fn speak_to_file(synthesizer: &SpeechSynthesizer, response: &RagResponse, path: &Path) -> Result<()> {
    if !synthesizer.is_enabled() {
        Output::warning("Speech synthesis is disabled in the configuration.");
        return Ok(());
    }

    match synthesizer.synthesize(&response.answer, &response.language).await {
        Some(audio) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, audio).await?;
            Output::success(&format!("Saved spoken answer to {}", path.display()));
        }
        None => Output::warning("Could not synthesize the answer."),
    }
    Ok(())
}
