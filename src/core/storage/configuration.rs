//! Index configuration registry.
//!
//! Configurations accumulate: adding a configuration never replaces
//! an earlier one, and lookups return the first configuration whose
//! index-name set contains the requested name.

use crate::core::error::{Result, ShelfError};
use crate::core::storage::schema::{Analyzer, IndexSchema};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;

fn default_result_cap() -> usize {
    1000
}

fn default_write_lock_timeout_ms() -> u64 {
    1000
}

/// Per-index settings, shared by every index name listed in `indexes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfiguration {
    /// Logical index names sharing this configuration
    pub indexes: Vec<String>,

    /// Analysis pipeline for text fields
    #[serde(default)]
    pub analyzer: Analyzer,

    /// Hard ceiling on hits retained by a search
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,

    /// How long to keep retrying a busy writer lock
    #[serde(default = "default_write_lock_timeout_ms")]
    pub write_lock_timeout_ms: u64,

    /// Open without a writer
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub schema: IndexSchema,
}

impl IndexConfiguration {
    pub fn new<I, S>(indexes: I, schema: IndexSchema) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indexes: indexes.into_iter().map(Into::into).collect(),
            analyzer: Analyzer::default(),
            result_cap: default_result_cap(),
            write_lock_timeout_ms: default_write_lock_timeout_ms(),
            read_only: false,
            schema,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_result_cap(mut self, result_cap: usize) -> Self {
        self.result_cap = result_cap;
        self
    }

    pub fn with_write_lock_timeout(mut self, timeout: Duration) -> Self {
        self.write_lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.write_lock_timeout_ms)
    }

    pub fn contains(&self, index_name: &str) -> bool {
        self.indexes.iter().any(|i| i == index_name)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.indexes.is_empty() {
            return Err(ShelfError::ConfigError(
                "Index configuration must name at least one index".to_string(),
            ));
        }

        if self.result_cap == 0 {
            return Err(ShelfError::ConfigError(
                "Result cap must be non-zero".to_string(),
            ));
        }

        if self.schema.key_field.is_empty() {
            return Err(ShelfError::ConfigError(
                "Key field must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Registry of index configurations
#[derive(Debug, Default)]
pub struct ConfigurationRegistry {
    configurations: RwLock<Vec<Arc<IndexConfiguration>>>,
}

impl ConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a configuration (earlier registrations keep priority)
    pub fn add_configuration(&self, config: IndexConfiguration) {
        let mut configurations = self
            .configurations
            .write()
            .unwrap_or_else(|e| e.into_inner());
        configurations.push(Arc::new(config));
    }

    /// First configuration that lists `index_name`
    pub fn configuration(&self, index_name: &str) -> Result<Arc<IndexConfiguration>> {
        let configurations = self
            .configurations
            .read()
            .unwrap_or_else(|e| e.into_inner());

        configurations
            .iter()
            .find(|c| c.contains(index_name))
            .cloned()
            .ok_or_else(|| ShelfError::ConfigurationMissing(index_name.to_string()))
    }

    /// Snapshot of all registered configurations
    pub fn configurations(&self) -> Vec<Arc<IndexConfiguration>> {
        self.configurations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every configured index name, in registration order, without duplicates
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for config in self.configurations() {
            for name in &config.indexes {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}
