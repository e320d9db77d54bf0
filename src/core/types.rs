//! Core data types shared by the provider, the engine and the CLI.
//!
//! Results are produced untyped (`serde_json::Value`) by the engine and
//! converted to caller types at the provider boundary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Binds a Rust type to the index that stores it.
///
/// The key field, analyzer and schema live in the index configuration;
/// the type only names its index.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical index name (must be registered in a configuration)
    const INDEX: &'static str;
}

/// A single lookup result (get-by-id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult<T> {
    /// Mapped item, absent when nothing matched
    pub hit: Option<T>,

    /// Relevance score (0 when absent)
    pub score: f32,
}

impl<T> IndexResult<T> {
    pub fn found(hit: T, score: f32) -> Self {
        Self {
            hit: Some(hit),
            score,
        }
    }

    pub fn absent() -> Self {
        Self {
            hit: None,
            score: 0.0,
        }
    }

    pub fn is_found(&self) -> bool {
        self.hit.is_some()
    }
}

/// One mapped hit in a result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit<T> {
    pub hit: T,
    pub score: f32,
}

/// Paged result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Hits of the requested page, in sort order
    pub hits: Vec<SearchHit<T>>,

    /// Total matches across the whole match set (independent of paging)
    pub count: usize,

    /// Highest relevance score across all matches
    pub max_score: f32,
}

impl<T> Default for SearchResult<T> {
    fn default() -> Self {
        Self {
            hits: Vec::new(),
            count: 0,
            max_score: 0.0,
        }
    }
}

impl<T> SearchResult<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl SearchResult<Value> {
    /// Deserialize every hit into `T`.
    ///
    /// Hits that fail to deserialize are logged and dropped; `count` and
    /// `max_score` still describe the full match set.
    pub fn into_typed<T: DeserializeOwned>(self) -> SearchResult<T> {
        let hits = self
            .hits
            .into_iter()
            .filter_map(|h| match serde_json::from_value::<T>(h.hit) {
                Ok(hit) => Some(SearchHit {
                    hit,
                    score: h.score,
                }),
                Err(e) => {
                    tracing::error!("Could not map hit to {}: {}", std::any::type_name::<T>(), e);
                    None
                }
            })
            .collect();

        SearchResult {
            hits,
            count: self.count,
            max_score: self.max_score,
        }
    }
}

impl IndexResult<Value> {
    /// Deserialize the hit into `T`; a failed mapping is reported as absent
    pub fn into_typed<T: DeserializeOwned>(self) -> IndexResult<T> {
        match self.hit {
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(hit) => IndexResult::found(hit, self.score),
                Err(e) => {
                    tracing::error!("Could not map hit to {}: {}", std::any::type_name::<T>(), e);
                    IndexResult::absent()
                }
            },
            None => IndexResult::absent(),
        }
    }
}
