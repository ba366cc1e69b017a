// Document and chunk model
// Source documents, the chunks derived from them and their scalar metadata


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key under which a chunk records its position among its siblings
pub const SEQUENCE_INDEX_KEY: &str = "sequence_index";

/// Scalar metadata attached to documents and chunks
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Opaque identifier of a source document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    #[inline]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a chunk, derived from its parent document and position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    #[inline]
    pub fn for_sequence(document_id: &DocumentId, sequence_index: usize) -> Self {
        Self(format!("{}:{}", document_id, sequence_index))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Order two values of compatible types.
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated types are unordered.
    #[inline]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    #[inline]
    pub fn matches(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for MetadataValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<usize> for MetadataValue {
    #[inline]
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetadataValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An immutable unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    raw_text: String,
    source_metadata: Metadata,
}

impl Document {
    /// Create a document with a generated identifier
    #[inline]
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self::with_id(DocumentId::generate(), raw_text)
    }

    #[inline]
    pub fn with_id(id: impl Into<DocumentId>, raw_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_text: raw_text.into(),
            source_metadata: Metadata::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.source_metadata.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    #[inline]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    #[inline]
    pub fn source_metadata(&self) -> &Metadata {
        &self.source_metadata
    }
}

/// A contiguous slice of a document's text, the unit that gets embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    chunk_id: ChunkId,
    parent_document_id: DocumentId,
    text: String,
    sequence_index: usize,
    metadata: Metadata,
    /// Byte range of `text` within the parent document, when known
    span: Option<Range<usize>>,
}

impl Chunk {
    /// Create a chunk that was not produced by the chunker.
    ///
    /// Such a chunk has no known position inside its parent text and cannot
    /// take part in [`reassemble`](crate::embeddings::chunking::reassemble).
    #[inline]
    pub fn new(
        parent_document_id: impl Into<DocumentId>,
        sequence_index: usize,
        text: impl Into<String>,
    ) -> Self {
        let parent_document_id = parent_document_id.into();
        let mut metadata = Metadata::new();
        metadata.insert(SEQUENCE_INDEX_KEY.to_string(), sequence_index.into());
        Self {
            chunk_id: ChunkId::for_sequence(&parent_document_id, sequence_index),
            parent_document_id,
            text: text.into(),
            sequence_index,
            metadata,
            span: None,
        }
    }

    /// Slice `span` out of `document`, inheriting its metadata
    pub(crate) fn from_span(document: &Document, sequence_index: usize, span: Range<usize>) -> Self {
        let mut metadata = document.source_metadata.clone();
        metadata.insert(SEQUENCE_INDEX_KEY.to_string(), sequence_index.into());
        Self {
            chunk_id: ChunkId::for_sequence(&document.id, sequence_index),
            parent_document_id: document.id.clone(),
            text: document
                .raw_text
                .get(span.clone())
                .unwrap_or_default()
                .to_string(),
            sequence_index,
            metadata,
            span: Some(span),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn chunk_id(&self) -> &ChunkId {
        &self.chunk_id
    }

    #[inline]
    pub fn parent_document_id(&self) -> &DocumentId {
        &self.parent_document_id
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[inline]
    pub fn span(&self) -> Option<Range<usize>> {
        self.span.clone()
    }
}
