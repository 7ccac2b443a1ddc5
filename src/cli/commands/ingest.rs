//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{IngestArgs, Output};
use crate::config::Settings;
use crate::orchestrator::{IngestReport, Orchestrator};
use crate::session::SessionStore;
use crate::source::ContentKind;
use crate::transcription::TranscriptPolicy;
use anyhow::Result;

/// Transcript policy selected by the ingest flags.
pub(crate) fn policy_for(args: &IngestArgs) -> TranscriptPolicy {
    if args.force_local {
        TranscriptPolicy::LocalOnly
    } else {
        TranscriptPolicy::from_allow_local(args.local_transcription)
    }
}

fn content_kind(args: &IngestArgs) -> ContentKind {
    if args.playlist {
        ContentKind::Playlist
    } else {
        ContentKind::Video
    }
}

/// Check tools, then build a knowledge base from `url`.
///
/// Shared by `ingest` and `chat --url`.
pub(crate) async fn ingest_url(orchestrator: &Orchestrator, url: &str, args: &IngestArgs) -> Result<IngestReport> {
    let policy = policy_for(args);
    let operation = match policy {
        TranscriptPolicy::CaptionsOnly => Operation::Ingest,
        _ => Operation::LocalTranscription,
    };
    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        Output::info("Run 'youtubot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if policy != TranscriptPolicy::CaptionsOnly && !orchestrator.local_transcription_available() {
        Output::warning("Whisper was not found; videos without captions will be skipped.");
    }

    Output::info(&format!("Processing {}", url));
    let report = orchestrator
        .ingest_with_policy(url, content_kind(args), &args.lang, policy)
        .await?;

    Output::success(&format!(
        "Indexed {} passages from {} video(s)",
        report.knowledge.index.len(),
        report.knowledge.videos.len()
    ));
    for video in &report.knowledge.videos {
        Output::video_info(video);
    }
    if !report.skipped.is_empty() {
        Output::warning(&format!("Skipped {} video(s):", report.skipped.len()));
        for skipped in &report.skipped {
            Output::list_item(&format!("{} ({})", skipped.url, skipped.reason));
        }
    }

    Ok(report)
}

/// Run the ingest command.
pub async fn run_ingest(url: &str, name: &str, args: &IngestArgs, settings: Settings) -> Result<()> {
    // Reject bad names before spending time on downloads
    SessionStore::validate_name(name)?;

    let store = SessionStore::new(settings.sessions_dir());
    let orchestrator = Orchestrator::new(settings)?;

    let report = ingest_url(&orchestrator, url, args).await?;

    if store.exists(name) {
        Output::warning(&format!("Replacing existing session '{}'", name));
    }
    store.save(name, &report.knowledge)?;
    Output::success(&format!("Saved session '{}'", name));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(local: bool, force: bool) -> IngestArgs {
        IngestArgs {
            playlist: false,
            lang: "en".to_string(),
            local_transcription: local,
            force_local: force,
        }
    }

    #[test]
    fn test_policy_for_flags() {
        assert_eq!(policy_for(&args(false, false)), TranscriptPolicy::CaptionsOnly);
        assert_eq!(policy_for(&args(true, false)), TranscriptPolicy::CaptionsThenLocal);
        assert_eq!(policy_for(&args(false, true)), TranscriptPolicy::LocalOnly);
    }
}
