//! Request model: filters, predicates, sort specs and paging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Bound, Range};

/// Boolean occurrence of a filter within its level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    /// Every MUST clause matches every hit
    Must,
    /// Optional unless the level has no MUST clause
    Should,
    /// Excludes matching documents
    MustNot,
}

/// Typed value a predicate compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    F64(f64),
    Date(DateTime<Utc>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::I64(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{s}"),
            FieldValue::I64(n) => write!(f, "{n}"),
            FieldValue::F64(n) => write!(f, "{n}"),
            FieldValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

/// What a filter matches
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact value (text fields are analyzed first)
    Term { field: String, value: FieldValue },

    /// Consecutive analyzed tokens, up to `slop` positions apart
    Phrase {
        field: String,
        text: String,
        slop: u32,
    },

    /// Edit-distance match on a single term
    Fuzzy {
        field: String,
        text: String,
        distance: u8,
    },

    Range {
        field: String,
        lower: Bound<FieldValue>,
        upper: Bound<FieldValue>,
    },

    /// Nested level with its own occurrence semantics
    Boolean(Vec<QueryFilter>),

    All,
}

impl Predicate {
    pub fn term(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn phrase(field: impl Into<String>, text: impl Into<String>) -> Self {
        Predicate::Phrase {
            field: field.into(),
            text: text.into(),
            slop: 0,
        }
    }

    pub fn phrase_with_slop(field: impl Into<String>, text: impl Into<String>, slop: u32) -> Self {
        Predicate::Phrase {
            field: field.into(),
            text: text.into(),
            slop,
        }
    }

    pub fn fuzzy(field: impl Into<String>, text: impl Into<String>, distance: u8) -> Self {
        Predicate::Fuzzy {
            field: field.into(),
            text: text.into(),
            distance,
        }
    }

    pub fn range(
        field: impl Into<String>,
        lower: Bound<FieldValue>,
        upper: Bound<FieldValue>,
    ) -> Self {
        Predicate::Range {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// Inclusive on both ends
    pub fn between(
        field: impl Into<String>,
        lower: impl Into<FieldValue>,
        upper: impl Into<FieldValue>,
    ) -> Self {
        Predicate::range(
            field,
            Bound::Included(lower.into()),
            Bound::Included(upper.into()),
        )
    }

    pub fn boolean(filters: Vec<QueryFilter>) -> Self {
        Predicate::Boolean(filters)
    }
}

/// A predicate with its occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub occur: Occurrence,
    pub predicate: Predicate,
}

impl QueryFilter {
    pub fn must(predicate: Predicate) -> Self {
        Self {
            occur: Occurrence::Must,
            predicate,
        }
    }

    pub fn should(predicate: Predicate) -> Self {
        Self {
            occur: Occurrence::Should,
            predicate,
        }
    }

    pub fn must_not(predicate: Predicate) -> Self {
        Self {
            occur: Occurrence::MustNot,
            predicate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// How the sort field's values compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortValueType {
    String,
    Numeric,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
    pub value_type: SortValueType,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection, value_type: SortValueType) -> Self {
        Self {
            field: field.into(),
            direction,
            value_type,
        }
    }
}

/// Everything a search needs besides the index name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub filters: Vec<QueryFilter>,

    /// Empty means relevance descending
    pub sorts: Vec<SortSpec>,

    /// 1-based
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl SearchRequest {
    /// Effective `(page, page_size)`. A lone value means no paging; page 0 is page 1.
    pub fn paging(&self) -> Option<(usize, usize)> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) => Some((page.max(1), size)),
            _ => None,
        }
    }

    /// Slice of `available` ordered hits this request returns
    pub fn window(&self, available: usize) -> Range<usize> {
        match self.paging() {
            Some((page, size)) => {
                let start = (page - 1).saturating_mul(size).min(available);
                let end = page.saturating_mul(size).min(available);
                start..end
            }
            None => 0..available,
        }
    }
}
