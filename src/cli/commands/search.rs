//! Search command - filter, sort and page an index
//!
//! Filter syntax:
//! - `field=value` exact term (text fields are analyzed)
//! - `field=low..high` inclusive range, either side may be empty
//! - `field~value` fuzzy term (edit distance 1)
//!
//! Sort syntax: `field[:asc|desc][:string|numeric|date]`

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::search::{
    FieldValue, Predicate, QueryFilter, SortDirection, SortSpec, SortValueType,
};
use crate::core::services::Services;
use crate::core::storage::{FieldKind, IndexSchema};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::ops::Bound;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Index name
    pub index: String,

    /// Clause every hit must match (repeatable)
    #[arg(long, value_name = "FILTER")]
    pub must: Vec<String>,

    /// Optional clause, required when no --must is given (repeatable)
    #[arg(long, value_name = "FILTER")]
    pub should: Vec<String>,

    /// Clause that excludes hits (repeatable)
    #[arg(long, value_name = "FILTER")]
    pub must_not: Vec<String>,

    /// Sort key (repeatable, earlier keys win)
    #[arg(long, value_name = "SORT")]
    pub sort: Vec<String>,

    /// 1-based page number (needs --page-size)
    #[arg(long)]
    pub page: Option<usize>,

    /// Hits per page (needs --page)
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Search result item
#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub rank: usize,
    pub score: f32,
    pub item: Value,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponseOutput {
    pub index: String,
    pub count: usize,
    pub max_score: f32,
    pub results: Vec<SearchResultItem>,
}

/// Parse a `field=value`, `field=low..high` or `field~value` filter
pub fn parse_predicate(
    raw: &str,
    schema: &IndexSchema,
) -> Result<Predicate, Box<dyn std::error::Error>> {
    let split = raw
        .find(['=', '~'])
        .ok_or_else(|| format!("Filter '{raw}' must look like field=value"))?;
    let (field, value) = (raw[..split].trim(), &raw[split + 1..]);

    if raw[split..].starts_with('~') {
        return Ok(Predicate::fuzzy(field, value.trim(), 1));
    }

    let kind = schema.field(field).unwrap_or(FieldKind::Text);

    if kind != FieldKind::Text {
        if let Some((low, high)) = value.split_once("..") {
            return Ok(Predicate::range(
                field,
                parse_bound(low, kind)?,
                parse_bound(high, kind)?,
            ));
        }
    }

    Ok(Predicate::term(field, parse_value(value, kind)?))
}

fn parse_bound(
    raw: &str,
    kind: FieldKind,
) -> Result<Bound<FieldValue>, Box<dyn std::error::Error>> {
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(Bound::Unbounded)
    } else {
        Ok(Bound::Included(parse_value(raw, kind)?))
    }
}

/// Convert a raw value to the field's kind
pub fn parse_value(raw: &str, kind: FieldKind) -> Result<FieldValue, Box<dyn std::error::Error>> {
    let raw = raw.trim();
    let value = match kind {
        FieldKind::Text | FieldKind::Keyword => FieldValue::Str(raw.to_string()),
        FieldKind::I64 => FieldValue::I64(
            raw.parse()
                .map_err(|e| format!("'{raw}' is not an integer: {e}"))?,
        ),
        FieldKind::F64 => FieldValue::F64(
            raw.parse()
                .map_err(|e| format!("'{raw}' is not a number: {e}"))?,
        ),
        FieldKind::Date => FieldValue::Date(parse_cli_date(raw)?),
    };
    Ok(value)
}

fn parse_cli_date(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not an RFC 3339 timestamp or YYYY-MM-DD date"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{raw}' is out of range").into())
}

/// Parse `field[:asc|desc][:string|numeric|date]`.
///
/// Without an explicit type, the field's declared kind decides.
pub fn parse_sort(raw: &str, schema: &IndexSchema) -> Result<SortSpec, Box<dyn std::error::Error>> {
    let mut parts = raw.split(':');
    let field = parts
        .next()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| format!("Sort '{raw}' has no field"))?;

    let mut direction = SortDirection::Ascending;
    let mut value_type = match schema.field(field) {
        Some(FieldKind::I64 | FieldKind::F64) => SortValueType::Numeric,
        Some(FieldKind::Date) => SortValueType::Date,
        _ => SortValueType::String,
    };

    for part in parts {
        match part.trim().to_ascii_lowercase().as_str() {
            "asc" => direction = SortDirection::Ascending,
            "desc" => direction = SortDirection::Descending,
            "string" => value_type = SortValueType::String,
            "numeric" => value_type = SortValueType::Numeric,
            "date" => value_type = SortValueType::Date,
            other => return Err(format!("Unknown sort option '{other}' in '{raw}'").into()),
        }
    }

    Ok(SortSpec::new(field, direction, value_type))
}

/// Execute the search command
pub async fn execute(
    args: SearchArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = services.provider.configurations().configuration(&args.index)?;
    let schema = &config.schema;

    let mut composer = services.provider.search();
    for raw in &args.must {
        composer = composer.filter(QueryFilter::must(parse_predicate(raw, schema)?));
    }
    for raw in &args.should {
        composer = composer.filter(QueryFilter::should(parse_predicate(raw, schema)?));
    }
    for raw in &args.must_not {
        composer = composer.filter(QueryFilter::must_not(parse_predicate(raw, schema)?));
    }
    for raw in &args.sort {
        let spec = parse_sort(raw, schema)?;
        composer = composer.sort_by(spec.field, spec.direction, spec.value_type);
    }
    if let (Some(page), Some(page_size)) = (args.page, args.page_size) {
        composer = composer.paged(page, page_size);
    }

    let result = composer.list_result_for(&args.index).await?;
    let offset = composer.request().window(result.count).start;

    let output = SearchResponseOutput {
        index: args.index.clone(),
        count: result.count,
        max_score: result.max_score,
        results: result
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| SearchResultItem {
                rank: offset + i + 1,
                score: hit.score,
                item: hit.hit,
            })
            .collect(),
    };

    match format {
        OutputFormat::Human => {
            if output.results.is_empty() {
                println!(
                    "No results in '{}' ({} total matches)",
                    colors::index_name(&output.index),
                    colors::number(&output.count.to_string())
                );
            } else {
                println!(
                    "Showing {} of {} match(es) in '{}':\n",
                    colors::number(&output.results.len().to_string()),
                    colors::number(&output.count.to_string()),
                    colors::index_name(&output.index)
                );

                for result in &output.results {
                    println!(
                        "[{}] {}",
                        colors::rank(&result.rank.to_string()),
                        colors::dim(&format!("(score: {:.2})", result.score))
                    );
                    println!("    {}", serde_json::to_string(&result.item)?);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
