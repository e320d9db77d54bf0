//! Item <-> stored document mapping.
//!
//! Items travel through the provider as JSON. The default
//! [`JsonDocumentMapper`] indexes the fields declared in the
//! [`IndexSchema`] and keeps the whole item in `_source`:
//!
//! - top-level properties map to same-named fields
//! - nested objects flatten with `.` (`Tags.Name`)
//! - arrays become multi-valued fields
//! - undeclared properties are only kept in `_source`

use crate::core::error::{Result, ShelfError};
use crate::core::storage::schema::{FieldKind, IndexSchema, SOURCE_FIELD};
use chrono::{DateTime as ChronoDateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tantivy::schema::{Field, Schema, Value as _};
use tantivy::{DateTime, TantivyDocument};

/// Converts items to stored documents and back
pub trait DocumentMapper: Send + Sync {
    fn to_document(
        &self,
        item: &Value,
        layout: &IndexSchema,
        schema: &Schema,
    ) -> Result<TantivyDocument>;

    fn from_document(&self, doc: &TantivyDocument, schema: &Schema) -> Result<Value>;
}

/// Default mapper backed by the item's JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDocumentMapper;

impl DocumentMapper for JsonDocumentMapper {
    fn to_document(
        &self,
        item: &Value,
        layout: &IndexSchema,
        schema: &Schema,
    ) -> Result<TantivyDocument> {
        if !item.is_object() {
            return Err(ShelfError::Mapping(format!(
                "Expected a JSON object, got: {}",
                json_kind(item)
            )));
        }

        // Rejects items without a usable key up front
        key_value(item, &layout.key_field)?;

        let mut leaves = Vec::new();
        flatten("", item, &mut leaves);

        let mut doc = TantivyDocument::default();
        for (path, value) in leaves {
            let Some(kind) = layout.field(&path) else {
                continue;
            };
            let field = schema_field(schema, &path)?;
            add_value(&mut doc, field, kind, &path, value)?;
        }

        let source = schema_field(schema, SOURCE_FIELD)?;
        doc.add_text(source, item.to_string());

        Ok(doc)
    }

    fn from_document(&self, doc: &TantivyDocument, schema: &Schema) -> Result<Value> {
        let source = schema_field(schema, SOURCE_FIELD)?;
        let json = doc
            .get_first(source)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ShelfError::Mapping("Document has no stored source".to_string()))?;

        Ok(serde_json::from_str(json)?)
    }
}

/// Key value of an item as a string (numbers are accepted and rendered)
pub fn key_value(item: &Value, key_field: &str) -> Result<String> {
    let key = match lookup(item, key_field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(ShelfError::Mapping(format!(
                "Item has no usable key field '{key_field}'"
            )))
        }
    };
    Ok(key)
}

/// Resolve a dotted path inside nested objects
fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, part| current.get(part))
}

fn flatten<'a>(prefix: &str, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                flatten(prefix, child, out);
            }
        }
        Value::Null => {}
        leaf => out.push((prefix.to_string(), leaf)),
    }
}

fn schema_field(schema: &Schema, name: &str) -> Result<Field> {
    schema
        .get_field(name)
        .map_err(|e| ShelfError::Mapping(format!("Field '{name}' missing from index: {e}")))
}

fn add_value(
    doc: &mut TantivyDocument,
    field: Field,
    kind: FieldKind,
    path: &str,
    value: &Value,
) -> Result<()> {
    let mismatch = || {
        ShelfError::Mapping(format!(
            "Field '{path}' expects {kind:?}, got {}",
            json_kind(value)
        ))
    };

    match kind {
        FieldKind::Text | FieldKind::Keyword => match value {
            Value::String(s) => doc.add_text(field, s),
            Value::Number(n) => doc.add_text(field, n.to_string()),
            Value::Bool(b) => doc.add_text(field, b.to_string()),
            _ => return Err(mismatch()),
        },
        FieldKind::I64 => {
            let number = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            };
            doc.add_i64(field, number.ok_or_else(mismatch)?);
        }
        FieldKind::F64 => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            };
            doc.add_f64(field, number.ok_or_else(mismatch)?);
        }
        FieldKind::Date => {
            let date = value.as_str().and_then(parse_date).ok_or_else(mismatch)?;
            doc.add_date(field, date);
        }
    }

    Ok(())
}

/// Parse RFC 3339, offset-less timestamps (taken as UTC) and plain dates
pub fn parse_date(value: &str) -> Option<DateTime> {
    if let Ok(parsed) = ChronoDateTime::parse_from_rfc3339(value) {
        return Some(DateTime::from_timestamp_micros(parsed.timestamp_micros()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::from_timestamp_micros(
            naive.and_utc().timestamp_micros(),
        ));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_timestamp_micros(naive.and_utc().timestamp_micros()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
