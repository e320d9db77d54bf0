//! Index provider: the public surface over sessions, search and index lifecycle.
//!
//! Every operation is async. Blocking tantivy and filesystem work runs
//! on tokio's blocking pool.
//!
//! Failure policy:
//! - missing configuration and gate timeouts always propagate
//! - reads degrade to empty/absent results
//! - `store` skips items that fail to map and keeps going
//! - `update` reports failure as `false`, `delete` propagates
//! - `swap_index` returns `false` when the source index is missing or is the target
//! - health checks of a missing index report `IndexNotFound`

use crate::core::error::{Result, ShelfError};
use crate::core::scope::{ScopeEnd, UnitOfWork};
use crate::core::search::{QueryComposer, SearchEngine};
use crate::core::storage::mapper::key_value;
use crate::core::storage::schema;
use crate::core::storage::{
    ConfigurationRegistry, DirectoryRegistry, DocumentMapper, HealthChecker, HealthReport,
    JsonDocumentMapper, SessionRegistry,
};
use crate::core::types::{Entity, IndexResult};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tantivy::{IndexWriter, Term};

/// Present in every committed tantivy index directory
const INDEX_META_FILE: &str = "meta.json";

/// Run blocking work on the blocking pool
async fn blocking<R, F>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ShelfError::Storage(format!("Blocking task failed: {e}")))?
}

pub struct IndexProvider {
    configurations: Arc<ConfigurationRegistry>,
    directories: Arc<DirectoryRegistry>,
    sessions: Arc<SessionRegistry>,
    engine: Arc<SearchEngine>,
    mapper: Arc<dyn DocumentMapper>,
}

impl IndexProvider {
    /// Wire a provider from existing registries
    pub fn new(
        configurations: Arc<ConfigurationRegistry>,
        directories: Arc<DirectoryRegistry>,
        sessions: Arc<SessionRegistry>,
        mapper: Arc<dyn DocumentMapper>,
    ) -> Self {
        let engine = Arc::new(SearchEngine::new(Arc::clone(&sessions), Arc::clone(&mapper)));
        Self {
            configurations,
            directories,
            sessions,
            engine,
            mapper,
        }
    }

    /// Provider over `index_dir` with default session settings and the JSON mapper.
    ///
    /// Creates `index_dir` if it does not exist.
    pub fn open(index_dir: PathBuf, configurations: Arc<ConfigurationRegistry>) -> Result<Self> {
        fs::create_dir_all(&index_dir)?;
        let directories = Arc::new(DirectoryRegistry::new(index_dir));
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&configurations),
            Arc::clone(&directories),
        ));
        Ok(Self::new(
            configurations,
            directories,
            sessions,
            Arc::new(JsonDocumentMapper),
        ))
    }

    pub fn configurations(&self) -> &Arc<ConfigurationRegistry> {
        &self.configurations
    }

    pub fn directories(&self) -> &Arc<DirectoryRegistry> {
        &self.directories
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Start composing a search
    pub fn search(&self) -> QueryComposer {
        QueryComposer::new(Arc::clone(&self.engine))
    }

    /// Begin a unit of work that commits or closes every configured index when it ends
    pub fn begin_unit_of_work(&self, end: ScopeEnd) -> UnitOfWork {
        UnitOfWork::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.configurations),
            end,
        )
    }

    // ---- index lifecycle ----

    /// Create an empty index unless one already exists. Idempotent.
    pub async fn create_index_if_not_exists(&self, index_name: &str) -> Result<()> {
        let config = self.configurations.configuration(index_name)?;
        let directory = self.directories.directory(index_name)?;
        let heap_bytes = self.sessions.writer_heap_bytes();
        let name = index_name.to_string();

        blocking(move || {
            if schema::index_exists(&directory)? {
                tracing::debug!("Index '{}' already exists", name);
                return Ok(());
            }

            let index = schema::open_or_create(&directory, &config.schema, config.analyzer)?;
            if !config.read_only {
                let writer: IndexWriter = index.writer(heap_bytes).map_err(|e| {
                    ShelfError::Storage(format!("Failed to create writer for '{name}': {e}"))
                })?;
                writer.wait_merging_threads().map_err(|e| {
                    ShelfError::Storage(format!("Failed to release writer for '{name}': {e}"))
                })?;
            }

            tracing::info!("Created index '{}'", name);
            Ok(())
        })
        .await
    }

    pub async fn create_index_for<T: Entity>(&self) -> Result<()> {
        self.create_index_if_not_exists(T::INDEX).await
    }

    /// Remove an index from disk. A missing index is a logged no-op.
    pub async fn delete_index(&self, index_name: &str) -> Result<()> {
        let path = self.directories.path(index_name)?;
        let _gate = self.sessions.exclusive(&[index_name]);

        let sessions = Arc::clone(&self.sessions);
        let directories = Arc::clone(&self.directories);
        let name = index_name.to_string();

        blocking(move || {
            sessions.close_session(&name)?;
            directories.dispose(&name);

            if !path.is_dir() {
                tracing::warn!("Could not find directory {} to delete", name);
                return Ok(());
            }

            fs::remove_dir_all(&path)?;
            tracing::info!("Deleted index '{}'", name);
            Ok(())
        })
        .await
    }

    /// Replace `target` with the freshly built `temp` index.
    ///
    /// Returns `false`, with no effect, when `temp` holds no committed index
    /// or names the target itself.
    pub async fn swap_index(&self, temp: &str, target: &str) -> Result<bool> {
        let temp_path = self.directories.path(temp)?;
        let target_path = self.directories.path(target)?;

        if temp_path == target_path {
            tracing::warn!("Refusing to swap index '{}' onto itself", temp);
            return Ok(false);
        }

        let sessions = Arc::clone(&self.sessions);
        let temp_name = temp.to_string();
        blocking(move || sessions.close_session(&temp_name)).await?;

        if !temp_path.join(INDEX_META_FILE).is_file() {
            tracing::info!("The index to be swapped {} does not exist", temp);
            return Ok(false);
        }

        let _gate = self.sessions.exclusive(&[temp, target]);

        let sessions = Arc::clone(&self.sessions);
        let directories = Arc::clone(&self.directories);
        let (temp_name, target_name) = (temp.to_string(), target.to_string());

        blocking(move || {
            // Sessions opened between the first close and the gate
            sessions.close_session(&temp_name)?;
            sessions.close_session(&target_name)?;
            directories.dispose(&temp_name);
            directories.dispose(&target_name);

            if target_path.is_dir() {
                fs::remove_dir_all(&target_path)?;
            }
            fs::rename(&temp_path, &target_path)?;

            tracing::info!("Swapped index '{}' into '{}'", temp_name, target_name);
            Ok(true)
        })
        .await
    }

    /// Check the committed state of an index through a scratch copy
    pub async fn health_report(&self, index_name: &str) -> Result<HealthReport> {
        let config = self.configurations.configuration(index_name)?;
        let directories = Arc::clone(&self.directories);
        let name = index_name.to_string();

        blocking(move || HealthChecker::new(&directories, config.analyzer).check(&name)).await
    }

    pub async fn check_health_of(&self, index_name: &str) -> Result<bool> {
        match self.health_report(index_name).await {
            Ok(report) => Ok(report.is_consistent),
            Err(e @ ShelfError::ConfigurationMissing(_)) => Err(e),
            Err(ShelfError::IndexNotFound(name)) => {
                tracing::warn!("Health check of '{}': index not found", name);
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Health check of '{}' failed: {}", index_name, e);
                Ok(false)
            }
        }
    }

    pub async fn check_health<T: Entity>(&self) -> Result<bool> {
        self.check_health_of(T::INDEX).await
    }

    // ---- writes ----

    /// Add items to an index. Items that fail to map are logged and skipped.
    ///
    /// Returns how many items were added. Writes become visible after commit.
    pub async fn store(&self, items: Vec<Value>, index_name: &str) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let session = self.sessions.session(index_name).await?;
        if session.is_read_only() {
            return Err(ShelfError::ReadOnly(index_name.to_string()));
        }

        let mapper = Arc::clone(&self.mapper);
        blocking(move || {
            let layout = &session.config().schema;
            let schema = session.schema();
            let mut stored = 0;

            for item in &items {
                let added = mapper
                    .to_document(item, layout, &schema)
                    .and_then(|doc| session.add_document(doc));
                match added {
                    Ok(()) => stored += 1,
                    Err(e) => tracing::error!(
                        "Could not add document to index '{}': {}",
                        session.index_name(),
                        e
                    ),
                }
            }

            tracing::debug!(
                "Stored {}/{} items in '{}'",
                stored,
                items.len(),
                session.index_name()
            );
            Ok(stored)
        })
        .await
    }

    pub async fn store_entities<T: Entity>(&self, items: &[T]) -> Result<usize> {
        let values = items
            .iter()
            .filter_map(|item| match serde_json::to_value(item) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Could not serialize item for '{}': {}", T::INDEX, e);
                    None
                }
            })
            .collect();
        self.store(values, T::INDEX).await
    }

    /// Delete every document whose key equals `id`
    pub async fn delete(&self, index_name: &str, id: &str) -> Result<()> {
        let session = self.sessions.session(index_name).await?;
        let id = id.to_string();

        blocking(move || {
            let key_field = &session.config().schema.key_field;
            let field = session.schema().get_field(key_field).map_err(|e| {
                ShelfError::Storage(format!("Missing key field '{key_field}': {e}"))
            })?;
            session.delete_term(Term::from_field_text(field, &id))
        })
        .await
    }

    pub async fn delete_entity<T: Entity>(&self, id: &str) -> Result<()> {
        self.delete(T::INDEX, id).await
    }

    /// Replace the document keyed `id` with `item`. Failures are logged and reported as `false`.
    pub async fn update_value(&self, index_name: &str, item: Value, id: &str) -> Result<bool> {
        let session = self.sessions.session(index_name).await?;
        let mapper = Arc::clone(&self.mapper);
        let id_owned = id.to_string();

        let outcome = blocking(move || {
            let layout = &session.config().schema;
            let schema = session.schema();
            let field = schema.get_field(&layout.key_field).map_err(|e| {
                ShelfError::Storage(format!("Missing key field '{}': {e}", layout.key_field))
            })?;

            let doc = mapper.to_document(&item, layout, &schema)?;
            session.update_document(Term::from_field_text(field, &id_owned), doc)
        })
        .await;

        match outcome {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!("Could not update content item {} in '{}': {}", id, index_name, e);
                Ok(false)
            }
        }
    }

    pub async fn update<T: Entity>(&self, item: &T, id: &str) -> Result<bool> {
        match serde_json::to_value(item) {
            Ok(value) => self.update_value(T::INDEX, value, id).await,
            Err(e) => {
                tracing::error!("Could not serialize content item {}: {}", id, e);
                Ok(false)
            }
        }
    }

    /// Update each item under its own key; stops at the first failure
    pub async fn update_all<T: Entity>(&self, items: &[T]) -> Result<bool> {
        let key_field = self
            .configurations
            .configuration(T::INDEX)?
            .schema
            .key_field
            .clone();

        for item in items {
            let value = match serde_json::to_value(item) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("Could not serialize item for '{}': {}", T::INDEX, e);
                    return Ok(false);
                }
            };

            let id = match key_value(&value, &key_field) {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!("Could not update item in '{}': {}", T::INDEX, e);
                    return Ok(false);
                }
            };

            if !self.update_value(T::INDEX, value, &id).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    // ---- reads ----

    pub async fn get_document_by_id(&self, index_name: &str, id: &str) -> Result<IndexResult<Value>> {
        self.engine.get_document_by_id(index_name, id).await
    }

    pub async fn get_by_id<T: Entity>(&self, id: &str) -> Result<IndexResult<T>> {
        Ok(self.get_document_by_id(T::INDEX, id).await?.into_typed())
    }

    // ---- session control ----

    /// Publish pending writes on `index_name`
    pub async fn commit(&self, index_name: &str) -> Result<()> {
        let sessions = Arc::clone(&self.sessions);
        let name = index_name.to_string();
        blocking(move || sessions.commit(&name)).await
    }

    pub async fn close_session(&self, index_name: &str) -> Result<()> {
        let sessions = Arc::clone(&self.sessions);
        let name = index_name.to_string();
        blocking(move || sessions.close_session(&name)).await
    }

    /// Flush and close every open session. Returns how many closed cleanly.
    pub async fn shutdown(&self) -> usize {
        let sessions = Arc::clone(&self.sessions);
        let closed = tokio::task::spawn_blocking(move || sessions.close_all())
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Shutdown task failed: {}", e);
                0
            });

        tracing::info!("Closed {} index sessions", closed);
        closed
    }
}

impl std::fmt::Debug for IndexProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexProvider")
            .field("directories", &self.directories)
            .field("sessions", &self.sessions)
            .finish()
    }
}
