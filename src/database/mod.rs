// Database module
// In-memory record table, similarity index and JSON snapshots

#[cfg(test)]
mod tests;

pub mod filter;
pub mod index;
pub mod snapshot;
pub mod vector_store;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Chunk;

pub use filter::MetadataFilter;
pub use index::{FlatIndex, Metric, ScoredRecord, SimilarityIndex};
pub use vector_store::{DocumentRecords, RecordMatch, SearchParams, StoreConfig, VectorStore};

/// Store-assigned record identifier; never reused within one store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chunk together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub record_id: RecordId,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    /// When the record was inserted
    pub created_at: DateTime<Utc>,
}

/// Records owned by a store, keyed by id
pub type RecordTable = BTreeMap<RecordId, VectorRecord>;
