//! Chat model access.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text completion models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one prompt and return the model's reply.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
