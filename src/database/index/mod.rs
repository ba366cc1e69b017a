
use std::cmp::Ordering;
use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::MetadataFilter;
use super::{RecordId, RecordTable};

/// How query and record vectors are compared.
///
/// `Cosine` and `DotProduct` are similarities: a higher score is a closer
/// match. `Euclidean` is the L2 distance: a lower score is a closer match.
/// Cosine similarity against a zero vector is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl Metric {
    /// Whether larger scores rank first
    #[inline]
    pub fn higher_is_better(self) -> bool {
        !matches!(self, Self::Euclidean)
    }

    /// Score `b` against `a`
    #[inline]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        self.score_with_norms(a, l2_norm(a), b, l2_norm(b))
    }

    /// Score with precomputed L2 norms; only cosine uses them
    fn score_with_norms(self, a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
        match self {
            Self::Cosine => {
                if a_norm == 0.0 || b_norm == 0.0 {
                    return 0.0;
                }
                dot(a, b) / (a_norm * b_norm)
            }
            Self::DotProduct => dot(a, b),
            Self::Euclidean => a
                .iter()
                .zip(b)
                .fold(0.0_f32, |acc, (x, y)| (x - y).mul_add(x - y, acc))
                .sqrt(),
        }
    }

    /// Order two scores best-first; NaN sorts after every number
    #[inline]
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if self.higher_is_better() => {
                b.partial_cmp(&a).unwrap_or(Ordering::Equal)
            }
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

    /// Whether `score` is at least as good as `threshold`
    #[inline]
    pub fn passes(self, score: f32, threshold: f32) -> bool {
        if self.higher_is_better() {
            score >= threshold
        } else {
            score <= threshold
        }
    }
}

/// A record id paired with its score for one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredRecord {
    pub record_id: RecordId,
    pub score: f32,
}

/// Finds the records nearest to a query vector.
///
/// An index holds only data derived from the record table; the vectors
/// themselves are read from `records` at query time.
pub trait SimilarityIndex: Send + Sync {
    fn insert(&mut self, id: RecordId, vector: &[f32]);

    /// Returns whether `id` was indexed
    fn remove(&mut self, id: RecordId) -> bool;

    /// Discard all derived data and index every record in `records`
    fn rebuild(&mut self, records: &RecordTable);

    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` records best-first, ties broken by ascending id.
    ///
    /// `filter` is applied before the cut. No match is an empty result.
    fn query(
        &self,
        records: &RecordTable,
        vector: &[f32],
        k: usize,
        metric: Metric,
        filter: Option<&MetadataFilter>,
    ) -> Vec<ScoredRecord>;
}

/// Exhaustive scan over every indexed record
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    norms: BTreeMap<RecordId, f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, id: RecordId) -> bool {
        self.norms.contains_key(&id)
    }
}

impl SimilarityIndex for FlatIndex {
    #[inline]
    fn insert(&mut self, id: RecordId, vector: &[f32]) {
        self.norms.insert(id, l2_norm(vector));
    }

    #[inline]
    fn remove(&mut self, id: RecordId) -> bool {
        self.norms.remove(&id).is_some()
    }

    #[inline]
    fn rebuild(&mut self, records: &RecordTable) {
        self.norms = records
            .iter()
            .map(|(id, record)| (*id, l2_norm(&record.vector)))
            .collect();
        debug!("Rebuilt flat index over {} records", self.norms.len());
    }

    #[inline]
    fn len(&self) -> usize {
        self.norms.len()
    }

    #[inline]
    fn query(
        &self,
        records: &RecordTable,
        vector: &[f32],
        k: usize,
        metric: Metric,
        filter: Option<&MetadataFilter>,
    ) -> Vec<ScoredRecord> {
        if k == 0 {
            return Vec::new();
        }

        let query_norm = l2_norm(vector);

        self.norms
            .iter()
            .filter_map(|(id, norm)| {
                let record = records.get(id)?;
                if filter.is_some_and(|f| !f.matches(&record.chunk)) {
                    return None;
                }
                Some(ScoredRecord {
                    record_id: *id,
                    score: metric.score_with_norms(vector, query_norm, &record.vector, *norm),
                })
            })
            .k_smallest_by(k, |a, b| {
                metric
                    .compare(a.score, b.score)
                    .then_with(|| a.record_id.cmp(&b.record_id))
            })
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0_f32, |acc, (x, y)| x.mul_add(*y, acc))
}

fn l2_norm(vector: &[f32]) -> f32 {
    dot(vector, vector).sqrt()
}
