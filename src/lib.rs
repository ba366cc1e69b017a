use thiserror::Error;

pub use crate::embeddings::EmbeddingFailure;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector component {index} is not finite")]
    InvalidVector { index: usize },

    #[error("Duplicate chunk: {chunk_id}")]
    DuplicateChunk { chunk_id: String },

    #[error("Not found: {id}")]
    NotFound { id: String },

    #[error("Embedding failure: {0}")]
    Embedding(#[from] EmbeddingFailure),

    #[error("Invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only failures of the embedding collaborator are transient; everything
    /// else is a caller or configuration error.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Embedding(EmbeddingFailure::Timeout(_) | EmbeddingFailure::Backend(_))
        )
    }
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod config;
pub mod conversation;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod indexer;
pub mod retrieval;

pub use conversation::{ConversationBuffer, ConversationStore, Role, Turn};
pub use database::{MetadataFilter, Metric, RecordId, SearchParams, VectorRecord, VectorStore};
pub use document::{Chunk, ChunkId, Document, DocumentId, Metadata, MetadataValue};
pub use embeddings::Embedder;
pub use retrieval::{RetrievedChunk, Retriever};
