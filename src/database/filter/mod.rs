
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, DocumentId, MetadataValue};

/// Predicate over a chunk's metadata, evaluated before the top-k cut.
///
/// Integer and float values compare numerically with each other; any other
/// pair of differing types never satisfies an ordering or equality test.
/// `Ne` and `NotIn` hold for chunks that lack the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFilter {
    Eq { key: String, value: MetadataValue },
    Ne { key: String, value: MetadataValue },
    Gt { key: String, value: MetadataValue },
    Gte { key: String, value: MetadataValue },
    Lt { key: String, value: MetadataValue },
    Lte { key: String, value: MetadataValue },
    In { key: String, values: Vec<MetadataValue> },
    NotIn { key: String, values: Vec<MetadataValue> },
    Exists { key: String },
    /// Chunks of one document
    Document(DocumentId),
    /// Every filter holds; true when empty
    And(Vec<MetadataFilter>),
    /// Some filter holds; false when empty
    Or(Vec<MetadataFilter>),
    Not(Box<MetadataFilter>),
}

impl MetadataFilter {
    #[inline]
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn ne(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Ne {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn gt(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Gt {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn gte(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Gte {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn lt(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Lt {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn lte(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Lte {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn is_in<V, I>(key: impl Into<String>, values: I) -> Self
    where
        V: Into<MetadataValue>,
        I: IntoIterator<Item = V>,
    {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn not_in<V, I>(key: impl Into<String>, values: I) -> Self
    where
        V: Into<MetadataValue>,
        I: IntoIterator<Item = V>,
    {
        Self::NotIn {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn exists(key: impl Into<String>) -> Self {
        Self::Exists { key: key.into() }
    }

    #[inline]
    pub fn document(id: impl Into<DocumentId>) -> Self {
        Self::Document(id.into())
    }

    #[inline]
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            filter => Self::And(vec![filter, other]),
        }
    }

    #[inline]
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            filter => Self::Or(vec![filter, other]),
        }
    }

    #[inline]
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate the filter against a chunk
    #[inline]
    pub fn matches(&self, chunk: &Chunk) -> bool {
        let lookup = |key: &str| chunk.metadata().get(key);

        match self {
            Self::Eq { key, value } => lookup(key).is_some_and(|v| v.matches(value)),
            Self::Ne { key, value } => !lookup(key).is_some_and(|v| v.matches(value)),
            Self::Gt { key, value } => ordered(lookup(key), value, |o| o == Ordering::Greater),
            Self::Gte { key, value } => ordered(lookup(key), value, |o| o != Ordering::Less),
            Self::Lt { key, value } => ordered(lookup(key), value, |o| o == Ordering::Less),
            Self::Lte { key, value } => ordered(lookup(key), value, |o| o != Ordering::Greater),
            Self::In { key, values } => {
                lookup(key).is_some_and(|v| values.iter().any(|candidate| v.matches(candidate)))
            }
            Self::NotIn { key, values } => {
                !lookup(key).is_some_and(|v| values.iter().any(|candidate| v.matches(candidate)))
            }
            Self::Exists { key } => lookup(key).is_some(),
            Self::Document(id) => chunk.parent_document_id() == id,
            Self::And(filters) => filters.iter().all(|f| f.matches(chunk)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(chunk)),
            Self::Not(filter) => !filter.matches(chunk),
        }
    }
}

fn ordered(
    actual: Option<&MetadataValue>,
    expected: &MetadataValue,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    actual
        .and_then(|v| v.compare(expected))
        .is_some_and(accept)
}
