// Retrieval module
// Query text -> embedding -> nearest chunks, and document ingestion


use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Result;
use crate::database::{MetadataFilter, Metric, RecordId, SearchParams, VectorStore};
use crate::document::{Chunk, Document};
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::{Embedder, embed_with_timeout};
use crate::indexer::{Stage, ingestion_pipeline};

/// Settings for query-time retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned by [`Retriever::search`]
    pub top_k: usize,
    /// Overrides the store's metric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    /// Relevance cutoff in the metric's direction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    /// Upper bound on a single embedding call
    pub embed_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 5,
            metric: None,
            min_score: None,
            embed_timeout_secs: 30,
        }
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }
}

/// A chunk returned for a query, with its score under the query's metric
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub record_id: RecordId,
    pub chunk: Chunk,
    pub score: f32,
}

/// Answers text queries against a vector store.
///
/// Embedding failures surface as [`RagError::Embedding`](crate::RagError::Embedding)
/// and are never retried here. A query with no matches is an empty result.
pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
    chunking: ChunkingConfig,
}

impl std::fmt::Debug for Retriever {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("store", &self.store)
            .field("model", &self.embedder.model_name())
            .field("config", &self.config)
            .field("chunking", &self.chunking)
            .finish()
    }
}

impl Retriever {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            chunking: ChunkingConfig::default(),
        }
    }

    /// Chunking used by [`ingest`](Self::ingest)
    #[inline]
    #[must_use]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Up to `k` chunks nearest to `query`, best first
    #[inline]
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<RetrievedChunk>> {
        let timeout = self.config.embed_timeout();
        let vector = embed_with_timeout(self.embedder.as_ref(), query, timeout)
            .await
            .inspect_err(|e| warn!("Failed to embed query: {}", e))?;

        let params = SearchParams {
            k,
            metric: self.config.metric,
            filter,
            min_score: self.config.min_score,
        };
        let matches = self.store.search_records(&vector, &params)?;

        debug!("Retrieved {} chunks for query", matches.len());
        Ok(matches
            .into_iter()
            .map(|m| RetrievedChunk {
                record_id: m.record.record_id,
                chunk: m.record.chunk,
                score: m.score,
            })
            .collect())
    }

    /// [`retrieve`](Self::retrieve) with the configured `top_k` and no filter
    #[inline]
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve(query, self.config.top_k, None).await
    }

    /// Chunk, embed and store `document`; nothing is stored if embedding fails
    #[inline]
    pub async fn ingest(&self, document: Document) -> Result<Vec<RecordId>> {
        let document_id = document.id().clone();
        let pipeline = ingestion_pipeline(
            self.chunking.clone(),
            Arc::clone(&self.embedder),
            self.config.embed_timeout(),
            Arc::clone(&self.store),
        );

        let record_ids = pipeline.run(document).await?;
        info!(
            "Ingested document {} as {} records",
            document_id,
            record_ids.len()
        );
        Ok(record_ids)
    }
}
