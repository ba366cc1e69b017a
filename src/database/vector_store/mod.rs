
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::filter::MetadataFilter;
use super::index::{FlatIndex, Metric, ScoredRecord, SimilarityIndex};
use super::snapshot::{self, SNAPSHOT_VERSION, Snapshot};
use super::{RecordId, RecordTable, VectorRecord};
use crate::config::ConfigError;
use crate::document::{Chunk, ChunkId, DocumentId};
use crate::embeddings::DEFAULT_EMBEDDING_DIMENSION;
use crate::{RagError, Result};

/// Fixed properties of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Length every stored and query vector must have
    pub embedding_dimension: usize,
    /// Metric used when a search does not name one
    pub metric: Metric,
}

impl Default for StoreConfig {
    #[inline]
    fn default() -> Self {
        Self {
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            metric: Metric::Cosine,
        }
    }
}

/// Parameters for a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Maximum number of results
    pub k: usize,
    /// Overrides the store's metric
    pub metric: Option<Metric>,
    pub filter: Option<MetadataFilter>,
    /// Drop results scoring worse than this, in the metric's direction
    pub min_score: Option<f32>,
}

impl Default for SearchParams {
    #[inline]
    fn default() -> Self {
        Self::new(10)
    }
}

impl SearchParams {
    #[inline]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            metric: None,
            filter: None,
            min_score: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// A search hit resolved to its full record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMatch {
    pub record: VectorRecord,
    pub score: f32,
}

struct StoreState {
    records: RecordTable,
    chunk_ids: HashMap<ChunkId, RecordId>,
    index: Box<dyn SimilarityIndex>,
    next_id: u64,
}

impl StoreState {
    fn allocate_id(&mut self) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn put(&mut self, record: VectorRecord) {
        self.index.insert(record.record_id, &record.vector);
        self.chunk_ids
            .insert(record.chunk.chunk_id().clone(), record.record_id);
        self.records.insert(record.record_id, record);
    }

    fn take(&mut self, id: RecordId) -> Option<VectorRecord> {
        let record = self.records.remove(&id)?;
        self.index.remove(id);
        self.chunk_ids.remove(record.chunk.chunk_id());
        Some(record)
    }

    fn document_record_ids(&self, document_id: &DocumentId) -> Vec<RecordId> {
        let mut ids = self
            .records
            .values()
            .filter(|r| r.chunk.parent_document_id() == document_id)
            .map(|r| (r.chunk.sequence_index(), r.record_id))
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

/// Owns vector records and keeps the similarity index in step with them.
///
/// Records and index share one lock: a write updates both before it
/// returns, and a reader sees either the state before a write or after it.
pub struct VectorStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for VectorStore {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Create an empty store backed by a [`FlatIndex`]
    #[inline]
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_index(config, Box::new(FlatIndex::new()))
    }

    /// Create an empty store backed by `index`
    #[inline]
    pub fn with_index(config: StoreConfig, mut index: Box<dyn SimilarityIndex>) -> Result<Self> {
        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidEmbeddingDimension(0).into());
        }

        let records = RecordTable::new();
        index.rebuild(&records);

        debug!(
            "Created vector store (dimension {}, metric {:?})",
            config.embedding_dimension, config.metric
        );

        Ok(Self {
            config,
            state: RwLock::new(StoreState {
                records,
                chunk_ids: HashMap::new(),
                index,
                next_id: 1,
            }),
        })
    }

    #[inline]
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.config.metric
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `chunk` with its embedding; the chunk id must be new
    #[inline]
    pub fn insert(&self, chunk: Chunk, vector: Vec<f32>) -> Result<RecordId> {
        self.check_vector(&vector)?;

        let mut state = self.state.write();
        if state.chunk_ids.contains_key(chunk.chunk_id()) {
            return Err(RagError::DuplicateChunk {
                chunk_id: chunk.chunk_id().to_string(),
            });
        }

        let record_id = state.allocate_id();
        debug!("Inserting chunk {} as record {}", chunk.chunk_id(), record_id);
        state.put(VectorRecord {
            record_id,
            chunk,
            vector,
            created_at: Utc::now(),
        });

        Ok(record_id)
    }

    /// Insert every entry or none of them
    #[inline]
    pub fn insert_batch(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<Vec<RecordId>> {
        for (_, vector) in &entries {
            self.check_vector(vector)?;
        }

        let mut state = self.state.write();
        let mut batch_ids = HashSet::with_capacity(entries.len());
        for (chunk, _) in &entries {
            if state.chunk_ids.contains_key(chunk.chunk_id()) || !batch_ids.insert(chunk.chunk_id())
            {
                return Err(RagError::DuplicateChunk {
                    chunk_id: chunk.chunk_id().to_string(),
                });
            }
        }

        let created_at = Utc::now();
        let count = entries.len();
        let mut record_ids = Vec::with_capacity(count);
        for (chunk, vector) in entries {
            let record_id = state.allocate_id();
            state.put(VectorRecord {
                record_id,
                chunk,
                vector,
                created_at,
            });
            record_ids.push(record_id);
        }

        debug!("Inserted batch of {} records", count);
        Ok(record_ids)
    }

    #[inline]
    pub fn get(&self, record_id: RecordId) -> Option<VectorRecord> {
        self.state.read().records.get(&record_id).cloned()
    }

    #[inline]
    pub fn get_by_chunk(&self, chunk_id: &ChunkId) -> Option<VectorRecord> {
        let state = self.state.read();
        let record_id = state.chunk_ids.get(chunk_id)?;
        state.records.get(record_id).cloned()
    }

    #[inline]
    pub fn contains(&self, record_id: RecordId) -> bool {
        self.state.read().records.contains_key(&record_id)
    }

    /// Replace the vector of an existing record
    #[inline]
    pub fn update(&self, record_id: RecordId, vector: Vec<f32>) -> Result<()> {
        self.check_vector(&vector)?;

        let mut state = self.state.write();
        let mut record = state.take(record_id).ok_or_else(|| RagError::NotFound {
            id: record_id.to_string(),
        })?;
        record.vector = vector;
        state.put(record);

        debug!("Updated vector of record {}", record_id);
        Ok(())
    }

    /// Returns whether a record was removed
    #[inline]
    pub fn delete(&self, record_id: RecordId) -> bool {
        let removed = self.state.write().take(record_id).is_some();
        if removed {
            debug!("Deleted record {}", record_id);
        }
        removed
    }

    /// Delete every record of a document, returning how many were removed
    #[inline]
    pub fn delete_document(&self, document_id: &DocumentId) -> Result<usize> {
        let mut state = self.state.write();
        let ids = state.document_record_ids(document_id);
        if ids.is_empty() {
            return Err(RagError::NotFound {
                id: document_id.to_string(),
            });
        }

        for id in &ids {
            state.take(*id);
        }

        info!("Deleted {} records of document {}", ids.len(), document_id);
        Ok(ids.len())
    }

    /// Records of a document in `sequence_index` order.
    ///
    /// Records are fetched as the iterator advances, so ones deleted in the
    /// meantime are skipped.
    #[inline]
    pub fn list_by_document(&self, document_id: &DocumentId) -> DocumentRecords<'_> {
        let ids = self.state.read().document_record_ids(document_id);
        DocumentRecords {
            store: self,
            ids,
            position: 0,
        }
    }

    /// Distinct ids of every document with at least one record
    #[inline]
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let state = self.state.read();
        state
            .records
            .values()
            .map(|r| r.chunk.parent_document_id())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Nearest records to `vector`, best first
    #[inline]
    pub fn search(&self, vector: &[f32], params: &SearchParams) -> Result<Vec<ScoredRecord>> {
        self.check_vector(vector)?;
        let state = self.state.read();
        Ok(self.query_locked(&state, vector, params))
    }

    /// Like [`search`](Self::search), resolving each hit under the same read lock
    #[inline]
    pub fn search_records(&self, vector: &[f32], params: &SearchParams) -> Result<Vec<RecordMatch>> {
        self.check_vector(vector)?;
        let state = self.state.read();
        let matches = self
            .query_locked(&state, vector, params)
            .into_iter()
            .filter_map(|hit| {
                state.records.get(&hit.record_id).map(|record| RecordMatch {
                    record: record.clone(),
                    score: hit.score,
                })
            })
            .collect();
        Ok(matches)
    }

    /// Recompute all derived index data from the record table
    #[inline]
    pub fn rebuild_index(&self) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.index.rebuild(&state.records);
        info!("Rebuilt index over {} records", state.records.len());
    }

    /// Write a snapshot of the store to `path`
    #[inline]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let state = self.state.read();
            Snapshot {
                version: SNAPSHOT_VERSION,
                config: self.config,
                next_record_id: state.next_id,
                records: state.records.values().collect::<Vec<_>>(),
            }
            .to_bytes()?
        };

        snapshot::write_atomic(path, &bytes)?;
        info!("Saved vector store snapshot to {}", path.display());
        Ok(())
    }

    /// Restore a store written by [`save`](Self::save)
    #[inline]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let snapshot: Snapshot<VectorRecord> = snapshot::read(path)?;
        let store = Self::new(snapshot.config)?;

        {
            let mut state = store.state.write();
            let mut max_id = 0;
            for record in snapshot.records {
                store.check_vector(&record.vector)?;
                if state.chunk_ids.contains_key(record.chunk.chunk_id()) {
                    return Err(RagError::DuplicateChunk {
                        chunk_id: record.chunk.chunk_id().to_string(),
                    });
                }
                if state.records.contains_key(&record.record_id) {
                    return Err(RagError::Persistence(format!(
                        "Snapshot repeats record id {}",
                        record.record_id
                    )));
                }
                max_id = max_id.max(record.record_id.get());
                state.chunk_ids
                    .insert(record.chunk.chunk_id().clone(), record.record_id);
                state.records.insert(record.record_id, record);
            }

            if snapshot.next_record_id <= max_id {
                warn!(
                    "Snapshot next id {} is not above highest record id {}",
                    snapshot.next_record_id, max_id
                );
            }
            state.next_id = snapshot.next_record_id.max(max_id + 1).max(1);

            let state = &mut *state;
            state.index.rebuild(&state.records);
        }

        info!(
            "Opened vector store snapshot {} with {} records",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    fn query_locked(
        &self,
        state: &StoreState,
        vector: &[f32],
        params: &SearchParams,
    ) -> Vec<ScoredRecord> {
        let metric = params.metric.unwrap_or(self.config.metric);
        let mut hits = state.index.query(
            &state.records,
            vector,
            params.k,
            metric,
            params.filter.as_ref(),
        );
        if let Some(min_score) = params.min_score {
            hits.retain(|hit| metric.passes(hit.score, min_score));
        }

        debug!(
            "Search returned {} of {} records (k {}, metric {:?})",
            hits.len(),
            state.records.len(),
            params.k,
            metric
        );
        hits
    }

    /// Dimension must match and every component must be finite
    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.embedding_dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.config.embedding_dimension,
                actual: vector.len(),
            });
        }
        if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
            return Err(RagError::InvalidVector { index });
        }
        Ok(())
    }
}

/// Lazy, restartable iterator over one document's records
#[derive(Debug, Clone)]
pub struct DocumentRecords<'a> {
    store: &'a VectorStore,
    ids: Vec<RecordId>,
    position: usize,
}

impl DocumentRecords<'_> {
    /// Start again from the first record
    #[inline]
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for DocumentRecords<'_> {
    type Item = VectorRecord;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.ids.get(self.position) {
            self.position += 1;
            if let Some(record) = self.store.get(*id) {
                return Some(record);
            }
        }
        None
    }
}
