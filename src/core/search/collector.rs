//! Capped, sorted hit collection.
//!
//! [`SortedCollector`] counts every match and tracks the best score over
//! the whole match set, but only retains the first `cap` hits in sort
//! order. Sort keys come from fast-field columns resolved against the
//! snapshot's schema; document address breaks remaining ties so the
//! order is deterministic.

use crate::core::error::{Result, ShelfError};
use crate::core::search::filter::{SortDirection, SortSpec, SortValueType};
use std::cmp::Ordering;
use tantivy::collector::{Collector, SegmentCollector};
use tantivy::columnar::{Column, StrColumn};
use tantivy::schema::{FieldType, Schema};
use tantivy::{DateTime, DocAddress, DocId, Score, SegmentOrdinal, SegmentReader};

/// Fast-field column type a sort reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Str,
    I64,
    F64,
    Date,
}

/// A sort spec checked against a schema
#[derive(Debug, Clone)]
pub struct ResolvedSort {
    field: String,
    direction: SortDirection,
    kind: ColumnKind,
}

/// Resolve sort specs against the snapshot's schema.
///
/// Every field must exist, be a fast field, and have a type matching
/// the requested value type.
pub fn resolve_sorts(schema: &Schema, sorts: &[SortSpec]) -> Result<Vec<ResolvedSort>> {
    sorts
        .iter()
        .map(|spec| {
            let field = schema.get_field(&spec.field).map_err(|_| {
                ShelfError::InvalidQuery(format!("Unknown sort field '{}'", spec.field))
            })?;
            let entry = schema.get_field_entry(field);

            if !entry.is_fast() {
                return Err(ShelfError::InvalidQuery(format!(
                    "Sort field '{}' is not sortable",
                    spec.field
                )));
            }

            let kind = match (entry.field_type(), spec.value_type) {
                (FieldType::Str(_), SortValueType::String) => ColumnKind::Str,
                (FieldType::I64(_), SortValueType::Numeric) => ColumnKind::I64,
                (FieldType::F64(_), SortValueType::Numeric) => ColumnKind::F64,
                (FieldType::Date(_), SortValueType::Date) => ColumnKind::Date,
                (field_type, value_type) => {
                    return Err(ShelfError::InvalidQuery(format!(
                        "Sort field '{}' is {:?}, cannot sort as {:?}",
                        spec.field,
                        field_type.value_type(),
                        value_type
                    )))
                }
            };

            Ok(ResolvedSort {
                field: spec.field.clone(),
                direction: spec.direction,
                kind,
            })
        })
        .collect()
}

/// Sort key component. Missing values order before any value.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortValue {
    Missing,
    Str(String),
    I64(i64),
    F64(f64),
    Date(DateTime),
}

impl SortValue {
    fn compare(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

#[derive(Debug, Clone)]
pub struct CollectedHit {
    pub address: DocAddress,
    pub score: Score,
    keys: Vec<SortValue>,
}

/// Merged result of a collection
#[derive(Debug, Default)]
pub struct CollectedHits {
    /// At most `cap` hits, in sort order
    pub hits: Vec<CollectedHit>,

    /// Every match, including those past the cap
    pub count: usize,

    pub max_score: Score,
}

pub struct SortedCollector {
    sorts: Vec<ResolvedSort>,
    cap: usize,
}

impl SortedCollector {
    pub fn new(sorts: Vec<ResolvedSort>, cap: usize) -> Self {
        Self { sorts, cap }
    }
}

fn compare_hits(sorts: &[SortDirection], a: &CollectedHit, b: &CollectedHit) -> Ordering {
    let by_keys = if sorts.is_empty() {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    } else {
        sorts
            .iter()
            .zip(a.keys.iter().zip(&b.keys))
            .map(|(direction, (left, right))| match direction {
                SortDirection::Ascending => left.compare(right),
                SortDirection::Descending => right.compare(left),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    };

    by_keys.then_with(|| a.address.cmp(&b.address))
}

fn sort_and_truncate(directions: &[SortDirection], hits: &mut Vec<CollectedHit>, cap: usize) {
    hits.sort_by(|a, b| compare_hits(directions, a, b));
    hits.truncate(cap);
}

enum SortColumn {
    Missing,
    Str(StrColumn),
    I64(Column<i64>),
    F64(Column<f64>),
    Date(Column<DateTime>),
}

impl SortColumn {
    fn open(segment: &SegmentReader, sort: &ResolvedSort) -> tantivy::Result<Self> {
        let fast_fields = segment.fast_fields();
        let column = match sort.kind {
            ColumnKind::Str => fast_fields.str(&sort.field)?.map(SortColumn::Str),
            ColumnKind::I64 => fast_fields
                .column_opt::<i64>(&sort.field)?
                .map(SortColumn::I64),
            ColumnKind::F64 => fast_fields
                .column_opt::<f64>(&sort.field)?
                .map(SortColumn::F64),
            ColumnKind::Date => fast_fields
                .column_opt::<DateTime>(&sort.field)?
                .map(SortColumn::Date),
        };
        Ok(column.unwrap_or(SortColumn::Missing))
    }

    /// First value of a multi-valued field
    fn value(&self, doc: DocId) -> SortValue {
        let value = match self {
            SortColumn::Missing => None,
            SortColumn::I64(column) => column.first(doc).map(SortValue::I64),
            SortColumn::F64(column) => column.first(doc).map(SortValue::F64),
            SortColumn::Date(column) => column.first(doc).map(SortValue::Date),
            SortColumn::Str(column) => column.term_ords(doc).next().and_then(|ord| {
                let mut text = String::new();
                match column.ord_to_str(ord, &mut text) {
                    Ok(true) => Some(SortValue::Str(text)),
                    _ => None,
                }
            }),
        };
        value.unwrap_or(SortValue::Missing)
    }
}

pub struct SortedSegmentCollector {
    segment_ord: SegmentOrdinal,
    columns: Vec<SortColumn>,
    directions: Vec<SortDirection>,
    cap: usize,
    hits: Vec<CollectedHit>,
    count: usize,
    max_score: Score,
}

impl Collector for SortedCollector {
    type Fruit = CollectedHits;
    type Child = SortedSegmentCollector;

    fn for_segment(
        &self,
        segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let columns = self
            .sorts
            .iter()
            .map(|sort| SortColumn::open(segment, sort))
            .collect::<tantivy::Result<Vec<_>>>()?;

        Ok(SortedSegmentCollector {
            segment_ord: segment_local_id,
            columns,
            directions: self.sorts.iter().map(|s| s.direction).collect(),
            cap: self.cap,
            hits: Vec::new(),
            count: 0,
            max_score: 0.0,
        })
    }

    fn requires_scoring(&self) -> bool {
        true
    }

    fn merge_fruits(&self, segment_fruits: Vec<CollectedHits>) -> tantivy::Result<CollectedHits> {
        let directions: Vec<SortDirection> = self.sorts.iter().map(|s| s.direction).collect();
        let mut merged = CollectedHits::default();

        for fruit in segment_fruits {
            merged.count += fruit.count;
            merged.max_score = merged.max_score.max(fruit.max_score);
            merged.hits.extend(fruit.hits);
        }

        sort_and_truncate(&directions, &mut merged.hits, self.cap);
        Ok(merged)
    }
}

impl SegmentCollector for SortedSegmentCollector {
    type Fruit = CollectedHits;

    fn collect(&mut self, doc: DocId, score: Score) {
        self.count += 1;
        if score > self.max_score {
            self.max_score = score;
        }

        if self.cap == 0 {
            return;
        }

        let keys = self.columns.iter().map(|c| c.value(doc)).collect();
        self.hits.push(CollectedHit {
            address: DocAddress::new(self.segment_ord, doc),
            score,
            keys,
        });

        // Keep memory bounded: prune back to the cap once the buffer doubles
        if self.hits.len() >= self.cap.saturating_mul(2) {
            sort_and_truncate(&self.directions, &mut self.hits, self.cap);
        }
    }

    fn harvest(mut self) -> CollectedHits {
        sort_and_truncate(&self.directions, &mut self.hits, self.cap);
        CollectedHits {
            hits: self.hits,
            count: self.count,
            max_score: self.max_score,
        }
    }
}
