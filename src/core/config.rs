//! Configuration management for shelf.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.
//!
//! ```toml
//! [storage]
//! index_dir = "/var/lib/shelf/indexes"
//!
//! [sessions]
//! gate_timeout_ms = 5000
//!
//! [[indexes]]
//! indexes = ["BlogPost", "BlogPost_temp"]
//! result_cap = 1000
//!
//! [indexes.schema]
//! fields = [
//!     { name = "Name", kind = "text" },
//!     { name = "PublishedDate", kind = "date" },
//! ]
//! ```

use crate::core::error::{Result, ShelfError};
use crate::core::storage::session::{DEFAULT_GATE_TIMEOUT, DEFAULT_WRITER_HEAP_BYTES};
use crate::core::storage::{ConfigurationRegistry, IndexConfiguration};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest writer heap tantivy accepts
const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub indexes: Vec<IndexConfiguration>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for index storage
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

/// Session registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionsConfig {
    /// How long session acquisition waits on an exclusive gate
    #[serde(default = "default_gate_timeout_ms")]
    pub gate_timeout_ms: u64,

    /// Index writer memory budget
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,
}

// Default value functions
fn default_index_dir() -> PathBuf {
    PathBuf::from("./indexes")
}

fn default_gate_timeout_ms() -> u64 {
    DEFAULT_GATE_TIMEOUT.as_millis() as u64
}

fn default_writer_heap_bytes() -> usize {
    DEFAULT_WRITER_HEAP_BYTES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            gate_timeout_ms: default_gate_timeout_ms(),
            writer_heap_bytes: default_writer_heap_bytes(),
        }
    }
}

impl SessionsConfig {
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ShelfError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. SHELF_CONFIG env var
    /// 2. XDG config file (~/.config/shelf/config.toml)
    /// 3. ./shelf.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("SHELF_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("shelf.toml").exists() {
                Self::from_file("shelf.toml")?
            } else {
                Self::default()
            }
        };

        // Default index location follows XDG unless set explicitly
        if env::var("SHELF_INDEX_DIR").is_err() && config.storage.index_dir == default_index_dir()
        {
            config.storage.index_dir = xdg.indexes_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(index_dir) = env::var("SHELF_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(index_dir);
        }

        if let Ok(timeout) = env::var("SHELF_GATE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.sessions.gate_timeout_ms = ms;
            }
        }
        if let Ok(heap) = env::var("SHELF_WRITER_HEAP_BYTES") {
            if let Ok(bytes) = heap.parse() {
                self.sessions.writer_heap_bytes = bytes;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sessions.gate_timeout_ms == 0 {
            return Err(ShelfError::ConfigError(
                "Gate timeout must be non-zero".to_string(),
            ));
        }

        if self.sessions.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(ShelfError::ConfigError(format!(
                "Writer heap must be at least {MIN_WRITER_HEAP_BYTES} bytes"
            )));
        }

        for index in &self.indexes {
            index.validate()?;
        }

        Ok(())
    }

    /// Registry holding every `[[indexes]]` entry, in file order
    pub fn configuration_registry(&self) -> ConfigurationRegistry {
        let registry = ConfigurationRegistry::new();
        for index in &self.indexes {
            registry.add_configuration(index.clone());
        }
        registry
    }

    /// Log the effective configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Gate timeout: {}ms", self.sessions.gate_timeout_ms);
        tracing::info!("  Writer heap: {} bytes", self.sessions.writer_heap_bytes);
        for index in &self.indexes {
            tracing::info!(
                "  Indexes {:?}: analyzer={} result_cap={} read_only={}",
                index.indexes,
                index.analyzer.name(),
                index.result_cap,
                index.read_only
            );
        }
    }
}
