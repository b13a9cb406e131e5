// Embedding providers - turn text into fixed-length vectors
pub mod openai;

use crate::errors::RelayResult;
use async_trait::async_trait;

pub use openai::OpenAiEmbeddings;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Embed document chunks, preserving input order
    async fn embed_documents(&self, texts: &[String]) -> RelayResult<Vec<Vec<f32>>>;

    /// Embed a single search query
    async fn embed_query(&self, text: &str) -> RelayResult<Vec<f32>>;
}
