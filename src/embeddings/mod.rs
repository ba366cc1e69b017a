// Embeddings module
// Chunking of source text and the embedding collaborator seam

pub mod chunking;
pub mod ollama;

#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chunking::{
    ChunkUnit, ChunkingConfig, Segmenter, chunk, chunk_document, chunk_with, estimate_token_count,
    reassemble,
};
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};

/// Why the embedding collaborator could not produce a vector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Turns text into a fixed-length vector.
///
/// Implementations own any retry policy; callers in this crate never retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingFailure>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingFailure> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Name of the model producing the vectors
    fn model_name(&self) -> &str;
}

/// Embed `text`, failing with [`EmbeddingFailure::Timeout`] once `timeout` elapses
#[inline]
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingFailure> {
    tokio::time::timeout(timeout, embedder.embed(text))
        .await
        .unwrap_or(Err(EmbeddingFailure::Timeout(timeout)))
}

/// Batch variant of [`embed_with_timeout`]; the timeout covers the whole batch
#[inline]
pub async fn embed_batch_with_timeout(
    embedder: &dyn Embedder,
    texts: &[String],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, EmbeddingFailure> {
    let embeddings = tokio::time::timeout(timeout, embedder.embed_batch(texts))
        .await
        .unwrap_or(Err(EmbeddingFailure::Timeout(timeout)))?;

    if embeddings.len() != texts.len() {
        return Err(EmbeddingFailure::Malformed(format!(
            "Mismatch between request and response counts: {} vs {}",
            texts.len(),
            embeddings.len()
        )));
    }

    Ok(embeddings)
}
