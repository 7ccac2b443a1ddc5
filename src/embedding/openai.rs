//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::error::{Result, YoutubotError};
use crate::openai::{create_client_with, DEFAULT_TIMEOUT_SECS};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Texts sent per embedding request.
const BATCH_SIZE: usize = 100;

/// Embedder for any endpoint speaking the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    requested_dimensions: Option<u32>,
}

impl OpenAIEmbedder {
    /// Create an embedder for `text-embedding-3-small` on api.openai.com.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", None, None)
    }

    /// Create an embedder with a custom model, endpoint and dimensions.
    pub fn with_config(model: &str, api_base: Option<&str>, dimensions: Option<u32>) -> Result<Self> {
        Ok(Self {
            client: create_client_with(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            model: model.to_string(),
            requested_dimensions: dimensions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Native output size of well-known embedding models.
fn native_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        _ => None,
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| YoutubotError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if let Some(dimensions) = self.requested_dimensions {
                args.dimensions(dimensions);
            }

            let request = args
                .build()
                .map_err(|e| YoutubotError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| YoutubotError::OpenAI(format!("Embedding API error: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(YoutubotError::Embedding(format!(
                    "Requested {} embeddings, received {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.requested_dimensions
            .map(|d| d as usize)
            .or_else(|| native_dimensions(&self.model))
            .unwrap_or(0)
    }
}
