//! In-process fakes for unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, YoutubotError};
use crate::index::{KnowledgeBase, Passage, SimilarityIndex};
use crate::llm::ChatModel;
use crate::source::{canonical_url, CaptionProvider, VideoInfo, VideoMetadata, VideoSource};
use crate::transcription::Transcriber;
use crate::websearch::{WebSearch, WebSearchResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A passage from the default test video.
pub fn passage(text: &str) -> Passage {
    Passage::new(text.to_string(), &video_metadata("Test Video", "en"))
}

pub fn video_metadata(title: &str, language: &str) -> VideoMetadata {
    VideoMetadata {
        title: title.to_string(),
        canonical_url: canonical_url("aaaaaaaaaaa"),
        author: "Tester".to_string(),
        language: language.to_string(),
    }
}

/// Small three-passage knowledge base with hand-written embeddings.
pub fn knowledge_base() -> KnowledgeBase {
    let index = SimilarityIndex::from_parts(
        vec![
            passage("ownership moves values"),
            passage("borrowing lends access"),
            passage("lifetimes bound references"),
        ],
        vec![vec![1.0, 0.1, 0.0], vec![0.1, 1.0, 0.2], vec![0.0, 0.3, 1.0]],
    )
    .expect("consistent test index");

    KnowledgeBase::new(
        index,
        vec![video_metadata("Çay Saati", "tr"), video_metadata("Rust Basics", "en")],
    )
}

/// Bag-of-words embedder: one dimension per vocabulary word.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
        self.vocabulary
            .iter()
            .map(|v| words.iter().filter(|w| **w == v.as_str()).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Embedder returning explicit vectors per text.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
}

impl FixedEmbedder {
    pub fn new(default: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            default,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.default.len()
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(YoutubotError::Embedding("embedding service unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(YoutubotError::Embedding("embedding service unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        0
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Chat model answering through a closure and recording every prompt.
pub struct ScriptedChat {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(reply: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(YoutubotError::Llm(message.clone())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("prompt log poisoned").push(prompt.to_string());
        (self.reply)(prompt)
    }
}

/// Web search with a canned result.
pub struct FakeWeb {
    result: Option<WebSearchResult>,
    pub calls: AtomicUsize,
}

impl FakeWeb {
    pub fn found(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            result: Some(WebSearchResult {
                title: title.to_string(),
                url: url.to_string(),
                snippet: snippet.to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn nothing() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WebSearch for FakeWeb {
    async fn search(&self, _query: &str) -> Option<WebSearchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Video source with registered videos and playlists.
#[derive(Default)]
pub struct FakeSource {
    videos: HashMap<String, VideoInfo>,
    playlists: HashMap<String, Vec<String>>,
    pub downloads: AtomicUsize,
    pub last_download: Mutex<Option<PathBuf>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, url: &str, id: &str, title: &str) -> Self {
        self.videos.insert(
            url.to_string(),
            VideoInfo {
                id: id.to_string(),
                title: title.to_string(),
                author: "Tester".to_string(),
                canonical_url: canonical_url(id),
            },
        );
        self
    }

    pub fn with_playlist(mut self, url: &str, videos: &[&str]) -> Self {
        self.playlists
            .insert(url.to_string(), videos.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn resolve_video(&self, url: &str) -> Result<VideoInfo> {
        self.videos
            .get(url)
            .cloned()
            .ok_or_else(|| YoutubotError::VideoSource(format!("unknown video {}", url)))
    }

    async fn expand_playlist(&self, url: &str) -> Result<Vec<String>> {
        self.playlists
            .get(url)
            .cloned()
            .ok_or_else(|| YoutubotError::VideoSource(format!("unknown playlist {}", url)))
    }

    async fn download_audio(&self, _url: &str, output_dir: &Path) -> Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = output_dir.join("audio.mp3");
        std::fs::write(&path, b"fake mp3 data")?;
        *self.last_download.lock().expect("download log poisoned") = Some(path.clone());
        Ok(path)
    }
}

/// Caption store keyed by (video id, language).
#[derive(Default)]
pub struct FakeCaptions {
    captions: HashMap<(String, String), String>,
    pub requests: Mutex<Vec<Vec<String>>>,
}

impl FakeCaptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, video_id: &str, language: &str, text: &str) -> Self {
        self.captions
            .insert((video_id.to_string(), language.to_string()), text.to_string());
        self
    }
}

#[async_trait]
impl CaptionProvider for FakeCaptions {
    async fn fetch_captions(&self, video_id: &str, languages: &[&str]) -> Result<Option<String>> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(languages.iter().map(|l| l.to_string()).collect());

        Ok(languages
            .iter()
            .find_map(|lang| self.captions.get(&(video_id.to_string(), lang.to_string())).cloned()))
    }
}

/// Transcriber that either returns fixed text or fails.
pub struct FakeTranscriber {
    text: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn succeeding(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path, _language: Option<&str>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.exists(), "audio should exist while transcribing");
        self.text
            .clone()
            .ok_or_else(|| YoutubotError::Transcription("decoder crashed".to_string()))
    }
}
