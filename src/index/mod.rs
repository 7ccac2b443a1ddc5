//! Similarity index over transcript passages.
//!
//! Passages are embedded once at build time and searched with cosine
//! similarity, so a higher score always means a closer match.

mod persist;

pub use persist::INDEX_FILE;

use crate::embedding::Embedder;
use crate::error::{Result, YoutubotError};
use crate::source::VideoMetadata;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A slice of a transcript, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_title: String,
    pub source_url: String,
    pub author: String,
    pub language: String,
}

impl Passage {
    /// Create a passage attributed to a video.
    pub fn new(text: String, metadata: &VideoMetadata) -> Self {
        Self {
            text,
            source_title: metadata.title.clone(),
            source_url: metadata.canonical_url.clone(),
            author: metadata.author.clone(),
            language: metadata.language.clone(),
        }
    }
}

/// A passage with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Passages and their embeddings.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    passages: Vec<Passage>,
    embeddings: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Embed `passages` and build an index over them.
    #[instrument(skip_all, fields(passages = passages.len()))]
    pub async fn build(passages: Vec<Passage>, embedder: &dyn Embedder) -> Result<Self> {
        if passages.is_empty() {
            return Err(YoutubotError::NoTranscripts);
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        let index = Self::from_parts(passages, embeddings)?;
        info!("Built similarity index with {} passages", index.len());
        Ok(index)
    }

    /// Assemble an index from already computed embeddings.
    pub(crate) fn from_parts(passages: Vec<Passage>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if passages.len() != embeddings.len() {
            return Err(YoutubotError::Index(format!(
                "{} passages but {} embeddings",
                passages.len(),
                embeddings.len()
            )));
        }

        if let Some(first) = embeddings.first() {
            if embeddings.iter().any(|e| e.len() != first.len()) {
                return Err(YoutubotError::Index("Embeddings have inconsistent dimensions".to_string()));
            }
        }

        Ok(Self { passages, embeddings })
    }

    /// Top `k` passages by cosine similarity, best first.
    ///
    /// Equal scores keep their insertion order. A NaN score (from a corrupt
    /// embedding) ranks below every real score.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredPassage> {
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_embedding, e)))
            .collect();

        scored.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
        scored.truncate(k);

        debug!("Search returned {} of {} passages", scored.len(), self.len());

        scored
            .into_iter()
            .map(|(i, score)| ScoredPassage {
                passage: self.passages[i].clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Embedding dimensions, or 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.embeddings.first().map(Vec::len).unwrap_or(0)
    }
}

/// An index together with the videos it was built from.
///
/// The two are always replaced together.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    pub index: SimilarityIndex,
    pub videos: Vec<VideoMetadata>,
}

impl KnowledgeBase {
    pub fn new(index: SimilarityIndex, videos: Vec<VideoMetadata>) -> Self {
        Self { index, videos }
    }

    /// Language of the first ingested video.
    pub fn base_language(&self) -> Option<&str> {
        self.videos.first().map(|v| v.language.as_str())
    }
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
