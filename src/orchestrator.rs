//! Ingestion pipeline for Youtubot.
//!
//! Coordinates the process from a video or playlist URL to a searchable
//! knowledge base: expand, acquire transcripts, split, embed and index.

use crate::chunking::{passages_for, TextSplitter};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, YoutubotError};
use crate::index::{KnowledgeBase, SimilarityIndex};
use crate::llm::OpenAIChatModel;
use crate::rag::QueryEngine;
use crate::source::{CaptionProvider, ContentKind, VideoSource, YoutubeCaptions, YoutubeSource};
use crate::transcription::{LocalWhisper, TranscriptAcquirer, TranscriptOutcome, TranscriptPolicy, Transcriber};
use crate::websearch::WebSearchService;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A video left out of a knowledge base, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedVideo {
    pub url: String,
    pub reason: String,
}

/// Result of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub knowledge: KnowledgeBase,
    pub skipped: Vec<SkippedVideo>,
}

/// The main orchestrator for the ingestion pipeline.
pub struct Orchestrator {
    settings: Settings,
    source: Arc<dyn VideoSource>,
    acquirer: TranscriptAcquirer,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
}

impl Orchestrator {
    /// Create an orchestrator backed by yt-dlp, platform captions, local
    /// Whisper (when installed) and an OpenAI-compatible embedder.
    pub fn new(settings: Settings) -> Result<Self> {
        let source: Arc<dyn VideoSource> = Arc::new(YoutubeSource::new());
        let captions: Arc<dyn CaptionProvider> = Arc::new(YoutubeCaptions::new()?);

        let transcriber: Option<Arc<dyn Transcriber>> = if settings.transcription.local_enabled {
            LocalWhisper::detect(
                &settings.transcription.whisper_binary,
                &settings.transcription.whisper_model,
            )
            .map(|w| Arc::new(w) as Arc<dyn Transcriber>)
        } else {
            info!("Local transcription disabled in configuration");
            None
        };

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.api_base.as_deref(),
            settings.embedding.dimensions,
        )?);

        Self::with_components(settings, source, captions, transcriber, embedder)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        source: Arc<dyn VideoSource>,
        captions: Arc<dyn CaptionProvider>,
        transcriber: Option<Arc<dyn Transcriber>>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(settings.rag.chunk_size, settings.rag.chunk_overlap)?;

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let acquirer = TranscriptAcquirer::new(source.clone(), captions, transcriber, temp_dir);

        Ok(Self {
            settings,
            source,
            acquirer,
            embedder,
            splitter,
        })
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether local speech-to-text can be used for videos without captions.
    pub fn local_transcription_available(&self) -> bool {
        self.acquirer.local_transcription_available()
    }

    /// Build a knowledge base from a video or playlist URL.
    pub async fn ingest(
        &self,
        url: &str,
        kind: ContentKind,
        lang_code: &str,
        allow_local_transcription: bool,
    ) -> Result<IngestReport> {
        self.ingest_with_policy(url, kind, lang_code, TranscriptPolicy::from_allow_local(allow_local_transcription))
            .await
    }

    /// Build a knowledge base with an explicit transcript policy.
    ///
    /// Videos whose transcript cannot be obtained are skipped; the run fails
    /// with [`YoutubotError::NoTranscripts`] only when nothing was usable.
    #[instrument(skip(self))]
    pub async fn ingest_with_policy(
        &self,
        url: &str,
        kind: ContentKind,
        lang_code: &str,
        policy: TranscriptPolicy,
    ) -> Result<IngestReport> {
        let urls = match kind {
            ContentKind::Video => vec![url.to_string()],
            ContentKind::Playlist => {
                eprintln!("  Expanding playlist...");
                let urls = self.source.expand_playlist(url).await?;
                eprintln!("  Found {} videos", urls.len());
                urls
            }
        };

        let total = urls.len();
        let mut passages = Vec::new();
        let mut videos = Vec::new();
        let mut skipped = Vec::new();

        for (i, video_url) in urls.into_iter().enumerate() {
            eprintln!("  [{}/{}] {}", i + 1, total, video_url);

            match self.acquirer.acquire_with_policy(&video_url, lang_code, policy).await {
                Ok(TranscriptOutcome::Available { metadata, text, method }) => {
                    let video_passages = passages_for(&text, &metadata, &self.splitter);
                    eprintln!(
                        "        {} ({}, {} passages)",
                        metadata.title,
                        method,
                        video_passages.len()
                    );
                    passages.extend(video_passages);
                    videos.push(metadata);
                }
                Ok(TranscriptOutcome::NotAvailable { metadata }) => {
                    eprintln!("        {}: no transcript available, skipping", metadata.title);
                    skipped.push(SkippedVideo {
                        url: video_url,
                        reason: "no transcript available".to_string(),
                    });
                }
                Err(e) => {
                    warn!("Skipping {}: {}", video_url, e);
                    eprintln!("        failed: {}", e);
                    skipped.push(SkippedVideo {
                        url: video_url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if passages.is_empty() {
            return Err(YoutubotError::NoTranscripts);
        }

        eprintln!("  Generating embeddings for {} passages...", passages.len());
        let index = SimilarityIndex::build(passages, self.embedder.as_ref()).await?;

        info!(
            "Ingested {} of {} videos ({} passages)",
            videos.len(),
            total,
            index.len()
        );

        Ok(IngestReport {
            knowledge: KnowledgeBase::new(index, videos),
            skipped,
        })
    }

    /// Build a query engine sharing this orchestrator's embedder and settings.
    pub fn build_query_engine(&self) -> Result<QueryEngine> {
        let prompts = Prompts::load(self.settings.prompts.custom_file.as_deref())?;
        let chat = Arc::new(OpenAIChatModel::from_settings(&self.settings.llm)?);
        let web = Arc::new(WebSearchService::from_settings(&self.settings.web_search)?);

        Ok(QueryEngine::new(self.embedder.clone(), chat, web, prompts)
            .with_retrieval_k(self.settings.rag.retrieval_k)
            .with_confidence_threshold(self.settings.rag.confidence_threshold)
            .with_default_language(&self.settings.rag.default_language))
    }
}
