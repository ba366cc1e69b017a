// Indexer module
// Typed ingestion stages: document -> chunks -> embeddings -> stored records


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::Result;
use crate::database::{RecordId, VectorStore};
use crate::document::{Chunk, Document};
use crate::embeddings::chunking::{ChunkingConfig, chunk_document};
use crate::embeddings::{Embedder, embed_batch_with_timeout};

/// One step of a pipeline, consuming `In` and producing `Output`
#[async_trait]
pub trait Stage<In: Send + 'static>: Send + Sync {
    type Output: Send + 'static;

    async fn run(&self, input: In) -> Result<Self::Output>;
}

/// Runs `first`, then feeds its output to `second`
#[derive(Debug, Clone)]
pub struct Then<A, B> {
    first: A,
    second: B,
}

#[async_trait]
impl<In, A, B> Stage<In> for Then<A, B>
where
    In: Send + 'static,
    A: Stage<In>,
    B: Stage<A::Output>,
{
    type Output = B::Output;

    #[inline]
    async fn run(&self, input: In) -> Result<Self::Output> {
        let intermediate = self.first.run(input).await?;
        self.second.run(intermediate).await
    }
}

pub trait StageExt<In: Send + 'static>: Stage<In> + Sized {
    /// Compose with a stage that consumes this stage's output
    #[inline]
    fn then<B>(self, next: B) -> Then<Self, B>
    where
        B: Stage<Self::Output>,
    {
        Then {
            first: self,
            second: next,
        }
    }
}

impl<In: Send + 'static, S: Stage<In>> StageExt<In> for S {}

/// Splits a document into chunks
#[derive(Debug, Clone, Default)]
pub struct ChunkStage {
    config: ChunkingConfig,
}

impl ChunkStage {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage<Document> for ChunkStage {
    type Output = Vec<Chunk>;

    #[inline]
    async fn run(&self, document: Document) -> Result<Vec<Chunk>> {
        chunk_document(&document, &self.config)
    }
}

/// Embeds every chunk in one batch call, bounded by `timeout`
#[derive(Clone)]
pub struct EmbedStage {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
}

impl EmbedStage {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { embedder, timeout }
    }
}

impl std::fmt::Debug for EmbedStage {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedStage")
            .field("model", &self.embedder.model_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Stage<Vec<Chunk>> for EmbedStage {
    type Output = Vec<(Chunk, Vec<f32>)>;

    #[inline]
    async fn run(&self, chunks: Vec<Chunk>) -> Result<Self::Output> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts = chunks
            .iter()
            .map(|c| c.text().to_string())
            .collect::<Vec<_>>();
        debug!(
            "Embedding {} chunks with {}",
            texts.len(),
            self.embedder.model_name()
        );

        let vectors = embed_batch_with_timeout(self.embedder.as_ref(), &texts, self.timeout).await?;
        Ok(chunks.into_iter().zip(vectors).collect())
    }
}

/// Inserts embedded chunks into a store as one all-or-nothing batch
#[derive(Debug, Clone)]
pub struct StoreStage {
    store: Arc<VectorStore>,
}

impl StoreStage {
    #[inline]
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage<Vec<(Chunk, Vec<f32>)>> for StoreStage {
    type Output = Vec<RecordId>;

    #[inline]
    async fn run(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<Vec<RecordId>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let record_ids = self.store.insert_batch(entries)?;
        info!("Stored {} embedded chunks", record_ids.len());
        Ok(record_ids)
    }
}

/// Chunk, embed and store a document
pub type IngestionPipeline = Then<Then<ChunkStage, EmbedStage>, StoreStage>;

#[inline]
pub fn ingestion_pipeline(
    chunking: ChunkingConfig,
    embedder: Arc<dyn Embedder>,
    embed_timeout: Duration,
    store: Arc<VectorStore>,
) -> IngestionPipeline {
    ChunkStage::new(chunking)
        .then(EmbedStage::new(embedder, embed_timeout))
        .then(StoreStage::new(store))
}
