//! Unified service container for shelf
//!
//! Provides shared access to the configuration and the index provider.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::provider::IndexProvider;
use crate::core::storage::{DirectoryRegistry, JsonDocumentMapper, SessionRegistry};
use std::fs;
use std::sync::Arc;

/// Unified services container
#[derive(Clone)]
pub struct Services {
    /// Index provider (sessions, search, lifecycle)
    pub provider: Arc<IndexProvider>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services from configuration
    pub fn new(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.storage.index_dir)?;

        let configurations = Arc::new(config.configuration_registry());
        let directories = Arc::new(DirectoryRegistry::new(config.storage.index_dir.clone()));
        let sessions = Arc::new(
            SessionRegistry::new(Arc::clone(&configurations), Arc::clone(&directories))
                .with_gate_timeout(config.sessions.gate_timeout())
                .with_writer_heap(config.sessions.writer_heap_bytes),
        );

        let provider = Arc::new(IndexProvider::new(
            configurations,
            directories,
            sessions,
            Arc::new(JsonDocumentMapper),
        ));

        Ok(Self {
            provider,
            config: Arc::new(config),
        })
    }
}
