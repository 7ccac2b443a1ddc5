//! Ranked transcript acquisition.

use super::Transcriber;
use crate::error::{Result, YoutubotError};
use crate::source::{extract_video_id, CaptionProvider, VideoInfo, VideoMetadata, VideoSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A way of obtaining transcript text for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptStrategy {
    /// Platform captions in the requested language, then English.
    Captions,
    /// Audio download plus local speech-to-text.
    LocalTranscription,
}

impl std::fmt::Display for TranscriptStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptStrategy::Captions => write!(f, "captions"),
            TranscriptStrategy::LocalTranscription => write!(f, "local transcription"),
        }
    }
}

/// Which strategies a caller is willing to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptPolicy {
    /// Captions only.
    #[default]
    CaptionsOnly,
    /// Captions first, local transcription when no captions exist.
    CaptionsThenLocal,
    /// Skip captions and always transcribe locally.
    LocalOnly,
}

impl TranscriptPolicy {
    /// Policy for the common "allow local transcription" switch.
    pub fn from_allow_local(allow_local: bool) -> Self {
        if allow_local {
            TranscriptPolicy::CaptionsThenLocal
        } else {
            TranscriptPolicy::CaptionsOnly
        }
    }
}

/// Result of acquiring a transcript for one URL.
#[derive(Debug, Clone)]
pub enum TranscriptOutcome {
    /// Text was obtained.
    Available {
        metadata: VideoMetadata,
        text: String,
        method: TranscriptStrategy,
    },
    /// Every enabled strategy came up empty.
    NotAvailable { metadata: VideoMetadata },
}

/// Obtains plain-text transcripts through a ranked list of strategies.
pub struct TranscriptAcquirer {
    source: Arc<dyn VideoSource>,
    captions: Arc<dyn CaptionProvider>,
    transcriber: Option<Arc<dyn Transcriber>>,
    scratch_root: PathBuf,
}

impl TranscriptAcquirer {
    /// Create an acquirer. `transcriber` is `None` when no local engine is installed.
    pub fn new(
        source: Arc<dyn VideoSource>,
        captions: Arc<dyn CaptionProvider>,
        transcriber: Option<Arc<dyn Transcriber>>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            source,
            captions,
            transcriber,
            scratch_root,
        }
    }

    /// Whether a local speech-to-text engine is available.
    pub fn local_transcription_available(&self) -> bool {
        self.transcriber.is_some()
    }

    /// The ranked strategies for a policy, given what is installed.
    pub fn strategies(&self, policy: TranscriptPolicy) -> Vec<TranscriptStrategy> {
        let mut ranked = Vec::with_capacity(2);

        if policy != TranscriptPolicy::LocalOnly {
            ranked.push(TranscriptStrategy::Captions);
        }

        if policy != TranscriptPolicy::CaptionsOnly {
            if self.local_transcription_available() {
                ranked.push(TranscriptStrategy::LocalTranscription);
            } else {
                warn!("Local transcription requested but no Whisper install was found");
            }
        }

        ranked
    }

    /// Acquire a transcript, captions first, local transcription if allowed.
    pub async fn acquire(&self, url: &str, lang_code: &str, allow_local: bool) -> Result<TranscriptOutcome> {
        self.acquire_with_policy(url, lang_code, TranscriptPolicy::from_allow_local(allow_local))
            .await
    }

    /// Acquire a transcript with an explicit policy.
    ///
    /// Fails only if the video itself cannot be resolved; a video without any
    /// obtainable transcript yields [`TranscriptOutcome::NotAvailable`].
    #[instrument(skip(self))]
    pub async fn acquire_with_policy(
        &self,
        url: &str,
        lang_code: &str,
        policy: TranscriptPolicy,
    ) -> Result<TranscriptOutcome> {
        let info = self.source.resolve_video(url).await?;
        let metadata = VideoMetadata::from_info(&info, lang_code);

        for strategy in self.strategies(policy) {
            match self.run_strategy(strategy, url, &info, lang_code).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    info!("Obtained transcript for '{}' via {}", info.title, strategy);
                    return Ok(TranscriptOutcome::Available {
                        metadata,
                        text,
                        method: strategy,
                    });
                }
                Ok(_) => {
                    debug!("No transcript for '{}' via {}", info.title, strategy);
                }
                Err(e) => {
                    warn!("{} failed for '{}': {}", strategy, info.title, e);
                }
            }
        }

        warn!("No transcript could be obtained for '{}' ({})", info.title, url);
        Ok(TranscriptOutcome::NotAvailable { metadata })
    }

    async fn run_strategy(
        &self,
        strategy: TranscriptStrategy,
        url: &str,
        info: &VideoInfo,
        lang_code: &str,
    ) -> Result<Option<String>> {
        match strategy {
            TranscriptStrategy::Captions => {
                let video_id = if info.id.is_empty() {
                    extract_video_id(url).ok_or_else(|| {
                        YoutubotError::InvalidInput(format!("No video id in {}", url))
                    })?
                } else {
                    info.id.clone()
                };

                let mut languages = vec![lang_code];
                if lang_code != "en" {
                    languages.push("en");
                }

                self.captions.fetch_captions(&video_id, &languages).await
            }
            TranscriptStrategy::LocalTranscription => self.transcribe_locally(url, lang_code).await,
        }
    }

    /// Download audio into a fresh scratch directory and transcribe it.
    ///
    /// The scratch directory is removed before returning, whatever the outcome.
    async fn transcribe_locally(&self, url: &str, lang_code: &str) -> Result<Option<String>> {
        let Some(transcriber) = &self.transcriber else {
            return Ok(None);
        };

        std::fs::create_dir_all(&self.scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix("audio-")
            .tempdir_in(&self.scratch_root)?;

        info!("Transcribing {} locally, this may take a while", url);
        let result = self
            .download_and_transcribe(transcriber.as_ref(), url, scratch.path(), lang_code)
            .await;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch audio directory: {}", e);
        }

        result.map(Some)
    }

    async fn download_and_transcribe(
        &self,
        transcriber: &dyn Transcriber,
        url: &str,
        scratch: &Path,
        lang_code: &str,
    ) -> Result<String> {
        let audio_path = self.source.download_audio(url, scratch).await?;
        transcriber.transcribe(&audio_path, Some(lang_code)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCaptions, FakeSource, FakeTranscriber};
    use std::sync::atomic::Ordering;

    const URL: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";

    fn acquirer(
        captions: Arc<FakeCaptions>,
        transcriber: Option<Arc<FakeTranscriber>>,
        source: Arc<FakeSource>,
        scratch: &Path,
    ) -> TranscriptAcquirer {
        TranscriptAcquirer::new(
            source,
            captions,
            transcriber.map(|t| t as Arc<dyn Transcriber>),
            scratch.to_path_buf(),
        )
    }

    fn scratch_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_captions_in_requested_language_skip_transcription() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new().with("aaaaaaaaaaa", "fr", "bonjour tout le monde"));
        let transcriber = Arc::new(FakeTranscriber::succeeding("whisper text"));
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions, Some(transcriber.clone()), source.clone(), scratch.path());
        let outcome = acq.acquire(URL, "fr", true).await.unwrap();

        match outcome {
            TranscriptOutcome::Available { text, method, metadata } => {
                assert_eq!(text, "bonjour tout le monde");
                assert_eq!(method, TranscriptStrategy::Captions);
                assert_eq!(metadata.language, "fr");
                assert_eq!(metadata.title, "Intro");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_captions_fall_back_to_english() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new().with("aaaaaaaaaaa", "en", "hello world"));
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions.clone(), None, source, scratch.path());
        let outcome = acq.acquire(URL, "de", false).await.unwrap();

        assert!(matches!(outcome, TranscriptOutcome::Available { ref text, .. } if text == "hello world"));
        assert_eq!(
            captions.requests.lock().unwrap().clone(),
            vec![vec!["de".to_string(), "en".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_no_captions_without_local_is_unavailable_and_leaves_no_audio() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new());
        let transcriber = Arc::new(FakeTranscriber::succeeding("whisper text"));
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions, Some(transcriber.clone()), source.clone(), scratch.path());
        let outcome = acq.acquire(URL, "en", false).await.unwrap();

        assert!(matches!(outcome, TranscriptOutcome::NotAvailable { .. }));
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_local_transcription_when_no_captions() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new());
        let transcriber = Arc::new(FakeTranscriber::succeeding("whisper text"));
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions, Some(transcriber.clone()), source.clone(), scratch.path());
        let outcome = acq.acquire(URL, "en", true).await.unwrap();

        match outcome {
            TranscriptOutcome::Available { text, method, .. } => {
                assert_eq!(text, "whisper text");
                assert_eq!(method, TranscriptStrategy::LocalTranscription);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_transcription_still_removes_scratch_audio() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new());
        let transcriber = Arc::new(FakeTranscriber::failing());
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions, Some(transcriber.clone()), source.clone(), scratch.path());
        let outcome = acq.acquire(URL, "en", true).await.unwrap();

        assert!(matches!(outcome, TranscriptOutcome::NotAvailable { .. }));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);

        let downloaded = source.last_download.lock().unwrap().clone().unwrap();
        assert!(!downloaded.exists());
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_local_only_skips_captions() {
        let scratch = tempfile::tempdir().unwrap();
        let captions = Arc::new(FakeCaptions::new().with("aaaaaaaaaaa", "en", "caption text"));
        let transcriber = Arc::new(FakeTranscriber::succeeding("whisper text"));
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));

        let acq = acquirer(captions.clone(), Some(transcriber), source, scratch.path());
        let outcome = acq
            .acquire_with_policy(URL, "en", TranscriptPolicy::LocalOnly)
            .await
            .unwrap();

        assert!(matches!(outcome, TranscriptOutcome::Available { method: TranscriptStrategy::LocalTranscription, .. }));
        assert!(captions.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_transcriber_degrades_to_captions() {
        let scratch = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new().with_video(URL, "aaaaaaaaaaa", "Intro"));
        let acq = acquirer(Arc::new(FakeCaptions::new()), None, source, scratch.path());

        assert!(!acq.local_transcription_available());
        assert_eq!(
            acq.strategies(TranscriptPolicy::CaptionsThenLocal),
            vec![TranscriptStrategy::Captions]
        );

        let outcome = acq.acquire(URL, "en", true).await.unwrap();
        assert!(matches!(outcome, TranscriptOutcome::NotAvailable { .. }));
    }

    #[tokio::test]
    async fn test_unresolvable_video_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let acq = acquirer(
            Arc::new(FakeCaptions::new()),
            None,
            Arc::new(FakeSource::new()),
            scratch.path(),
        );

        assert!(acq.acquire("https://www.youtube.com/watch?v=zzzzzzzzzzz", "en", false).await.is_err());
    }
}
