//! Compiles filters into tantivy query trees.
//!
//! Predicates are compiled against the schema of the snapshot being
//! searched. Text values go through the field's analyzer so they match
//! the tokens that were indexed.

use crate::core::error::{Result, ShelfError};
use crate::core::search::filter::{FieldValue, Occurrence, Predicate, QueryFilter};
use crate::core::storage::mapper::parse_date;
use crate::core::storage::schema::ANALYZER_NAME;
use std::ops::Bound;
use tantivy::query::{
    AllQuery, BooleanQuery, EmptyQuery, FuzzyTermQuery, Occur, PhraseQuery, Query, RangeQuery,
    TermQuery,
};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Schema};
use tantivy::tokenizer::TokenStream;
use tantivy::{DateTime, Index, Term};

/// Largest edit distance fuzzy matching supports
pub const MAX_FUZZY_DISTANCE: u8 = 2;

/// How an indexed field can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldShape {
    Text,
    Keyword,
    I64,
    F64,
    Date,
}

pub struct QueryCompiler<'a> {
    index: &'a Index,
    schema: &'a Schema,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(index: &'a Index, schema: &'a Schema) -> Self {
        Self { index, schema }
    }

    /// Compile one boolean level. No filters matches everything.
    pub fn compile(&self, filters: &[QueryFilter]) -> Result<Box<dyn Query>> {
        if filters.is_empty() {
            return Ok(Box::new(AllQuery));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(filters.len() + 1);
        for filter in filters {
            clauses.push((occur(filter.occur), self.compile_predicate(&filter.predicate)?));
        }

        // A level of exclusions alone would match nothing
        if filters.iter().all(|f| f.occur == Occurrence::MustNot) {
            clauses.push((Occur::Must, Box::new(AllQuery)));
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn compile_predicate(&self, predicate: &Predicate) -> Result<Box<dyn Query>> {
        match predicate {
            Predicate::All => Ok(Box::new(AllQuery)),
            Predicate::Boolean(filters) => self.compile(filters),
            Predicate::Term { field, value } => self.term_query(field, value),
            Predicate::Phrase { field, text, slop } => self.phrase_query(field, text, *slop),
            Predicate::Fuzzy {
                field,
                text,
                distance,
            } => self.fuzzy_query(field, text, *distance),
            Predicate::Range {
                field,
                lower,
                upper,
            } => self.range_query(field, lower, upper),
        }
    }

    fn term_query(&self, name: &str, value: &FieldValue) -> Result<Box<dyn Query>> {
        let (field, shape) = self.resolve(name)?;

        if shape != FieldShape::Text {
            let term = self.exact_term(name, field, shape, value)?;
            return Ok(Box::new(TermQuery::new(term, IndexRecordOption::Basic)));
        }

        let tokens = self.analyze(field, &value.to_string())?;
        let mut queries: Vec<Box<dyn Query>> = tokens
            .iter()
            .map(|token| -> Box<dyn Query> {
                Box::new(TermQuery::new(
                    Term::from_field_text(field, token),
                    IndexRecordOption::WithFreqs,
                ))
            })
            .collect();

        match queries.len() {
            0 => Ok(Box::new(EmptyQuery)),
            1 => Ok(queries.remove(0)),
            _ => Ok(Box::new(BooleanQuery::intersection(queries))),
        }
    }

    fn phrase_query(&self, name: &str, text: &str, slop: u32) -> Result<Box<dyn Query>> {
        let (field, shape) = self.resolve(name)?;

        match shape {
            FieldShape::Text => {}
            FieldShape::Keyword => {
                let term = Term::from_field_text(field, text);
                return Ok(Box::new(TermQuery::new(term, IndexRecordOption::Basic)));
            }
            _ => {
                return Err(ShelfError::InvalidQuery(format!(
                    "Phrase query on non-text field '{name}'"
                )))
            }
        }

        let mut terms: Vec<Term> = self
            .analyze(field, text)?
            .iter()
            .map(|token| Term::from_field_text(field, token))
            .collect();

        match terms.len() {
            0 => Ok(Box::new(EmptyQuery)),
            1 => Ok(Box::new(TermQuery::new(
                terms.remove(0),
                IndexRecordOption::WithFreqs,
            ))),
            _ => {
                let mut query = PhraseQuery::new(terms);
                query.set_slop(slop);
                Ok(Box::new(query))
            }
        }
    }

    fn fuzzy_query(&self, name: &str, text: &str, distance: u8) -> Result<Box<dyn Query>> {
        if distance > MAX_FUZZY_DISTANCE {
            return Err(ShelfError::InvalidQuery(format!(
                "Fuzzy distance {distance} exceeds {MAX_FUZZY_DISTANCE}"
            )));
        }

        let (field, shape) = self.resolve(name)?;
        let term = match shape {
            FieldShape::Text => {
                let token = self
                    .analyze(field, text)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ShelfError::InvalidQuery(format!("Fuzzy text '{text}' has no terms"))
                    })?;
                Term::from_field_text(field, &token)
            }
            FieldShape::Keyword => Term::from_field_text(field, text),
            _ => {
                return Err(ShelfError::InvalidQuery(format!(
                    "Fuzzy query on non-text field '{name}'"
                )))
            }
        };

        Ok(Box::new(FuzzyTermQuery::new(term, distance, true)))
    }

    fn range_query(
        &self,
        name: &str,
        lower: &Bound<FieldValue>,
        upper: &Bound<FieldValue>,
    ) -> Result<Box<dyn Query>> {
        let (_, shape) = self.resolve(name)?;
        let field_name = name.to_string();

        let query = match shape {
            FieldShape::I64 => RangeQuery::new_i64_bounds(
                field_name,
                map_bound(lower, |v| as_i64(name, v))?,
                map_bound(upper, |v| as_i64(name, v))?,
            ),
            FieldShape::F64 => RangeQuery::new_f64_bounds(
                field_name,
                map_bound(lower, |v| as_f64(name, v))?,
                map_bound(upper, |v| as_f64(name, v))?,
            ),
            FieldShape::Date => RangeQuery::new_date_bounds(
                field_name,
                date_bound(name, lower, true)?,
                date_bound(name, upper, false)?,
            ),
            FieldShape::Keyword => {
                let lower = map_bound(lower, |v| Ok(v.to_string()))?;
                let upper = map_bound(upper, |v| Ok(v.to_string()))?;
                RangeQuery::new_str_bounds(
                    field_name,
                    lower.as_ref().map(String::as_str),
                    upper.as_ref().map(String::as_str),
                )
            }
            FieldShape::Text => {
                return Err(ShelfError::InvalidQuery(format!(
                    "Range query on tokenized field '{name}'"
                )))
            }
        };

        Ok(Box::new(query))
    }

    fn resolve(&self, name: &str) -> Result<(Field, FieldShape)> {
        let field = self
            .schema
            .get_field(name)
            .map_err(|_| ShelfError::InvalidQuery(format!("Unknown field '{name}'")))?;

        let entry = self.schema.get_field_entry(field);
        if !entry.is_indexed() {
            return Err(ShelfError::InvalidQuery(format!(
                "Field '{name}' is not indexed"
            )));
        }

        let shape = match entry.field_type() {
            FieldType::Str(options) => {
                let tokenized = options
                    .get_indexing_options()
                    .is_some_and(|indexing| indexing.tokenizer() == ANALYZER_NAME);
                if tokenized {
                    FieldShape::Text
                } else {
                    FieldShape::Keyword
                }
            }
            FieldType::I64(_) => FieldShape::I64,
            FieldType::F64(_) => FieldShape::F64,
            FieldType::Date(_) => FieldShape::Date,
            other => {
                return Err(ShelfError::InvalidQuery(format!(
                    "Field '{name}' has unsupported type {:?}",
                    other.value_type()
                )))
            }
        };

        Ok((field, shape))
    }

    fn exact_term(
        &self,
        name: &str,
        field: Field,
        shape: FieldShape,
        value: &FieldValue,
    ) -> Result<Term> {
        let term = match shape {
            FieldShape::Text | FieldShape::Keyword => {
                Term::from_field_text(field, &value.to_string())
            }
            FieldShape::I64 => Term::from_field_i64(field, as_i64(name, value)?),
            FieldShape::F64 => Term::from_field_f64(field, as_f64(name, value)?),
            FieldShape::Date => Term::from_field_date(field, as_date(name, value)?),
        };
        Ok(term)
    }

    /// Run `text` through the analyzer registered for `field`
    fn analyze(&self, field: Field, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(field)
            .map_err(|e| ShelfError::Search(format!("No analyzer for field: {e}")))?;

        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        Ok(tokens)
    }
}

fn occur(occurrence: Occurrence) -> Occur {
    match occurrence {
        Occurrence::Must => Occur::Must,
        Occurrence::Should => Occur::Should,
        Occurrence::MustNot => Occur::MustNot,
    }
}

fn map_bound<T>(
    bound: &Bound<FieldValue>,
    convert: impl Fn(&FieldValue) -> Result<T>,
) -> Result<Bound<T>> {
    Ok(match bound {
        Bound::Included(v) => Bound::Included(convert(v)?),
        Bound::Excluded(v) => Bound::Excluded(convert(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

fn mismatch(name: &str, expected: &str, value: &FieldValue) -> ShelfError {
    ShelfError::InvalidQuery(format!(
        "Field '{name}' expects {expected}, got '{value}'"
    ))
}

fn as_i64(name: &str, value: &FieldValue) -> Result<i64> {
    match value {
        FieldValue::I64(n) => Ok(*n),
        FieldValue::Str(s) => s.parse().map_err(|_| mismatch(name, "an integer", value)),
        _ => Err(mismatch(name, "an integer", value)),
    }
}

fn as_f64(name: &str, value: &FieldValue) -> Result<f64> {
    match value {
        FieldValue::F64(n) => Ok(*n),
        FieldValue::I64(n) => Ok(*n as f64),
        FieldValue::Str(s) => s.parse().map_err(|_| mismatch(name, "a number", value)),
        FieldValue::Date(_) => Err(mismatch(name, "a number", value)),
    }
}

const MICROS_PER_SEC: i64 = 1_000_000;

fn date_micros(name: &str, value: &FieldValue) -> Result<i64> {
    match value {
        FieldValue::Date(d) => Ok(d.timestamp_micros()),
        FieldValue::Str(s) => parse_date(s)
            .map(|d| d.into_timestamp_micros())
            .ok_or_else(|| mismatch(name, "a date", value)),
        _ => Err(mismatch(name, "a date", value)),
    }
}

/// Dates are indexed at second precision
fn as_date(name: &str, value: &FieldValue) -> Result<DateTime> {
    let micros = date_micros(name, value)?;
    Ok(DateTime::from_timestamp_secs(micros.div_euclid(MICROS_PER_SEC)))
}

/// Range bound snapped to whole seconds.
///
/// A fractional lower bound excludes its own second and a fractional
/// upper bound includes it, whichever way the bound was given.
fn date_bound(name: &str, bound: &Bound<FieldValue>, is_lower: bool) -> Result<Bound<DateTime>> {
    let (value, inclusive) = match bound {
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
        Bound::Unbounded => return Ok(Bound::Unbounded),
    };

    let micros = date_micros(name, value)?;
    let floor = DateTime::from_timestamp_secs(micros.div_euclid(MICROS_PER_SEC));

    Ok(match (micros.rem_euclid(MICROS_PER_SEC) == 0, inclusive, is_lower) {
        (true, true, _) => Bound::Included(floor),
        (true, false, _) => Bound::Excluded(floor),
        (false, _, true) => Bound::Excluded(floor),
        (false, _, false) => Bound::Included(floor),
    })
}
