//! Tantivy schema and analyzer construction.
//!
//! Every index is described by an [`IndexSchema`]: the declared
//! fields plus the key field used for get-by-id, update and delete.
//! The full item is always kept in the stored `_source` field, which is
//! what hits are mapped back from.

use crate::core::error::{Result, ShelfError};
use serde::{Deserialize, Serialize};
use tantivy::directory::MmapDirectory;
use tantivy::schema::{
    DateOptions, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, FAST,
    STORED, STRING,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
};
use tantivy::{Index, IndexSettings};

/// Stored field holding the item's JSON
pub const SOURCE_FIELD: &str = "_source";

/// Tokenizer name text fields are indexed with
pub const ANALYZER_NAME: &str = "shelf";

/// Default key field name
pub const DEFAULT_KEY_FIELD: &str = "Id";

/// Analysis pipeline applied to text fields.
///
/// Tokenizers are not persisted by tantivy, so the analyzer must be
/// registered again every time an index is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analyzer {
    /// Word split, long-token removal, lowercasing
    #[default]
    Standard,
    /// Standard plus English stemming
    Stemmed,
    /// Whole value as a single token
    Raw,
}

impl Analyzer {
    pub fn build(&self) -> TextAnalyzer {
        match self {
            Analyzer::Standard => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .build(),
            Analyzer::Stemmed => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .filter(Stemmer::new(Language::English))
                .build(),
            Analyzer::Raw => TextAnalyzer::builder(RawTokenizer::default()).build(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Analyzer::Standard => "standard",
            Analyzer::Stemmed => "stemmed",
            Analyzer::Raw => "raw",
        }
    }
}

/// Kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Tokenized full text (analyzer applies)
    Text,
    /// Untokenized string, exact match, sortable
    Keyword,
    I64,
    F64,
    /// RFC 3339 timestamp, sortable and range-queryable
    Date,
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}

/// Field layout of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Unique key field (exact-match keyword)
    #[serde(default = "default_key_field")]
    pub key_field: String,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self {
            key_field: default_key_field(),
            fields: Vec::new(),
        }
    }
}

impl IndexSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            key_field: default_key_field(),
            fields,
        }
    }

    pub fn with_key(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Look up a declared field (the key field is always a keyword)
    pub fn field(&self, name: &str) -> Option<FieldKind> {
        if name == self.key_field {
            return Some(FieldKind::Keyword);
        }
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    /// Declared fields with the key field first, duplicates removed
    pub fn effective_fields(&self) -> Vec<FieldSpec> {
        let mut fields = vec![FieldSpec::new(self.key_field.clone(), FieldKind::Keyword)];
        for spec in &self.fields {
            if spec.name != self.key_field && !fields.iter().any(|f| f.name == spec.name) {
                fields.push(spec.clone());
            }
        }
        fields
    }

    /// Build the tantivy schema
    ///
    /// Fields:
    /// - key field: STRING | FAST
    /// - text: tokenized with [`ANALYZER_NAME`], positions recorded
    /// - keyword: STRING | FAST
    /// - i64 / f64 / date: INDEXED | FAST
    /// - `_source`: STORED
    pub fn build(&self) -> Result<Schema> {
        let mut builder = Schema::builder();

        for spec in self.effective_fields() {
            if spec.name.is_empty() || spec.name.starts_with('-') || spec.name == SOURCE_FIELD {
                return Err(ShelfError::ConfigError(format!(
                    "Invalid field name: '{}'",
                    spec.name
                )));
            }

            match spec.kind {
                FieldKind::Text => {
                    let indexing = TextFieldIndexing::default()
                        .set_tokenizer(ANALYZER_NAME)
                        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
                    builder.add_text_field(
                        &spec.name,
                        TextOptions::default().set_indexing_options(indexing),
                    );
                }
                FieldKind::Keyword => {
                    builder.add_text_field(&spec.name, STRING | FAST);
                }
                FieldKind::I64 => {
                    builder.add_i64_field(
                        &spec.name,
                        NumericOptions::default().set_indexed().set_fast(),
                    );
                }
                FieldKind::F64 => {
                    builder.add_f64_field(
                        &spec.name,
                        NumericOptions::default().set_indexed().set_fast(),
                    );
                }
                FieldKind::Date => {
                    builder.add_date_field(
                        &spec.name,
                        DateOptions::default().set_indexed().set_fast(),
                    );
                }
            }
        }

        builder.add_text_field(SOURCE_FIELD, STORED);

        Ok(builder.build())
    }
}

/// Register the analyzer on a freshly opened index
pub fn register_analyzer(index: &Index, analyzer: Analyzer) {
    index.tokenizers().register(ANALYZER_NAME, analyzer.build());
}

/// Check whether the directory already holds an index
pub fn index_exists(directory: &MmapDirectory) -> Result<bool> {
    Index::exists(directory)
        .map_err(|e| ShelfError::Storage(format!("Failed to inspect index: {e}")))
}

/// Open the index in `directory`, creating it with `schema` if absent
pub fn open_or_create(
    directory: &MmapDirectory,
    schema: &IndexSchema,
    analyzer: Analyzer,
) -> Result<Index> {
    let index = if index_exists(directory)? {
        Index::open(directory.clone())
            .map_err(|e| ShelfError::Storage(format!("Failed to open index: {e}")))?
    } else {
        Index::create(directory.clone(), schema.build()?, IndexSettings::default())
            .map_err(|e| ShelfError::Storage(format!("Failed to create index: {e}")))?
    };

    register_analyzer(&index, analyzer);
    Ok(index)
}

/// Open an existing index, failing if there is none
pub fn open_existing(directory: &MmapDirectory, analyzer: Analyzer) -> Result<Index> {
    let index = Index::open(directory.clone())
        .map_err(|e| ShelfError::Storage(format!("Failed to open index: {e}")))?;
    register_analyzer(&index, analyzer);
    Ok(index)
}
