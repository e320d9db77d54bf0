//! Session registry: per-index writer and searcher lifecycle.
//!
//! A session owns the index writer (absent for read-only indexes) and
//! the reader that hands out point-in-time searcher snapshots. Readers
//! are reloaded manually, so writes become visible only after
//! [`SessionRegistry::commit`].
//!
//! Structural operations (swap, delete) install an exclusive gate for an
//! index name. While a gate is installed, [`SessionRegistry::session`]
//! waits for its release, up to the gate timeout. Callers already
//! holding a session are not affected.

use crate::core::error::{Result, ShelfError};
use crate::core::storage::configuration::{ConfigurationRegistry, IndexConfiguration};
use crate::core::storage::directory::DirectoryRegistry;
use crate::core::storage::schema;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tantivy::directory::error::LockError;
use tantivy::directory::MmapDirectory;
use tantivy::schema::Schema;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, TantivyError, Term,
};
use tokio::sync::{watch, Mutex};

/// How long session acquisition waits on an exclusive gate
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Index writer memory budget (50MB heap)
pub const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

const WRITER_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Open writer and reader for one index
pub struct IndexSession {
    index_name: String,
    config: Arc<IndexConfiguration>,
    index: Index,

    /// `None` once closed, or from the start for read-only indexes
    writer: RwLock<Option<IndexWriter>>,

    reader: IndexReader,

    /// Set by every mutation, cleared by commit
    dirty: AtomicBool,
}

impl std::fmt::Debug for IndexSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSession")
            .field("index_name", &self.index_name)
            .field("read_only", &self.config.read_only)
            .field("dirty", &self.has_uncommitted_changes())
            .finish()
    }
}

impl IndexSession {
    /// Open a session on `directory` using `config`
    pub fn open(
        index_name: &str,
        config: Arc<IndexConfiguration>,
        directory: &MmapDirectory,
        writer_heap_bytes: usize,
    ) -> Result<Self> {
        let (index, writer, reload_policy) = if config.read_only {
            let index = schema::open_existing(directory, config.analyzer)?;
            (index, None, ReloadPolicy::OnCommitWithDelay)
        } else {
            let index = schema::open_or_create(directory, &config.schema, config.analyzer)?;
            let writer = open_writer(
                &index,
                index_name,
                writer_heap_bytes,
                config.write_lock_timeout(),
            )?;
            (index, Some(writer), ReloadPolicy::Manual)
        };

        let reader = index
            .reader_builder()
            .reload_policy(reload_policy)
            .try_into()
            .map_err(|e| ShelfError::Storage(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            index_name: index_name.to_string(),
            config,
            index,
            writer: RwLock::new(writer),
            reader,
            dirty: AtomicBool::new(false),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn config(&self) -> &Arc<IndexConfiguration> {
        &self.config
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn schema(&self) -> Schema {
        self.index.schema()
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    /// Acquire a point-in-time snapshot; dropping it releases it
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.writer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Run `f` against the writer under the shared lock
    fn with_writer<R>(&self, f: impl FnOnce(&IndexWriter) -> Result<R>) -> Result<R> {
        let guard = self.writer.read().unwrap_or_else(|e| e.into_inner());
        let writer = guard.as_ref().ok_or_else(|| {
            if self.config.read_only {
                ShelfError::ReadOnly(self.index_name.clone())
            } else {
                ShelfError::Storage(format!("Session for '{}' is closed", self.index_name))
            }
        })?;

        let result = f(writer)?;
        self.dirty.store(true, Ordering::Release);
        Ok(result)
    }

    pub fn add_document(&self, doc: TantivyDocument) -> Result<()> {
        self.with_writer(|writer| {
            writer
                .add_document(doc)
                .map_err(|e| ShelfError::Storage(format!("Failed to add document: {e}")))?;
            Ok(())
        })
    }

    pub fn delete_term(&self, term: Term) -> Result<()> {
        self.with_writer(|writer| {
            writer.delete_term(term);
            Ok(())
        })
    }

    /// Replace every document matching `term` with `doc` (same commit)
    pub fn update_document(&self, term: Term, doc: TantivyDocument) -> Result<()> {
        self.with_writer(|writer| {
            writer.delete_term(term);
            writer
                .add_document(doc)
                .map_err(|e| ShelfError::Storage(format!("Failed to add document: {e}")))?;
            Ok(())
        })
    }

    /// Flush pending writes and refresh the reader.
    ///
    /// Returns `false` when there was nothing to commit.
    pub fn commit(&self) -> Result<bool> {
        let mut guard = self.writer.write().unwrap_or_else(|e| e.into_inner());
        let Some(writer) = guard.as_mut() else {
            return Ok(false);
        };

        if !self.dirty.load(Ordering::Acquire) {
            return Ok(false);
        }

        writer
            .commit()
            .map_err(|e| ShelfError::Storage(format!("Failed to commit: {e}")))?;
        self.dirty.store(false, Ordering::Release);

        self.reader
            .reload()
            .map_err(|e| ShelfError::Storage(format!("Failed to refresh reader: {e}")))?;

        tracing::debug!("Committed index '{}'", self.index_name);
        Ok(true)
    }

    /// Commit pending writes and release the writer. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.writer.write().unwrap_or_else(|e| e.into_inner());
        let Some(mut writer) = guard.take() else {
            return Ok(());
        };

        if self.dirty.swap(false, Ordering::AcqRel) {
            writer
                .commit()
                .map_err(|e| ShelfError::Storage(format!("Failed to commit: {e}")))?;
        }

        writer
            .wait_merging_threads()
            .map_err(|e| ShelfError::Storage(format!("Failed to release writer: {e}")))?;

        tracing::debug!("Closed writer for '{}'", self.index_name);
        Ok(())
    }
}

/// Acquire a writer, retrying while another writer holds the lock
fn open_writer(
    index: &Index,
    index_name: &str,
    heap_bytes: usize,
    lock_timeout: Duration,
) -> Result<IndexWriter> {
    let deadline = Instant::now() + lock_timeout;

    loop {
        match index.writer(heap_bytes) {
            Ok(writer) => return Ok(writer),
            Err(TantivyError::LockFailure(LockError::LockBusy, _)) if Instant::now() < deadline => {
                std::thread::sleep(WRITER_RETRY_INTERVAL);
            }
            Err(e) => {
                return Err(ShelfError::Storage(format!(
                    "Failed to create writer for '{index_name}': {e}"
                )))
            }
        }
    }
}

/// Registry of live sessions and exclusive gates
pub struct SessionRegistry {
    configurations: Arc<ConfigurationRegistry>,
    directories: Arc<DirectoryRegistry>,
    sessions: DashMap<String, Arc<IndexSession>>,

    /// Serializes first opens per index name
    opening: DashMap<String, Arc<Mutex<()>>>,

    gates: DashMap<String, watch::Sender<bool>>,
    gate_timeout: Duration,
    writer_heap_bytes: usize,
}

impl SessionRegistry {
    pub fn new(
        configurations: Arc<ConfigurationRegistry>,
        directories: Arc<DirectoryRegistry>,
    ) -> Self {
        Self {
            configurations,
            directories,
            sessions: DashMap::new(),
            opening: DashMap::new(),
            gates: DashMap::new(),
            gate_timeout: DEFAULT_GATE_TIMEOUT,
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
        }
    }

    pub fn with_gate_timeout(mut self, gate_timeout: Duration) -> Self {
        self.gate_timeout = gate_timeout;
        self
    }

    pub fn with_writer_heap(mut self, writer_heap_bytes: usize) -> Self {
        self.writer_heap_bytes = writer_heap_bytes;
        self
    }

    pub fn gate_timeout(&self) -> Duration {
        self.gate_timeout
    }

    pub fn writer_heap_bytes(&self) -> usize {
        self.writer_heap_bytes
    }

    /// Session for `index_name`, created on first use.
    ///
    /// Waits on an installed gate first. Creation runs on the blocking
    /// pool under a per-name opening lock, so concurrent first callers
    /// share one session.
    pub async fn session(&self, index_name: &str) -> Result<Arc<IndexSession>> {
        self.wait_for_gate(index_name).await?;

        if let Some(session) = self.cached(index_name) {
            return Ok(session);
        }

        let opening = Arc::clone(
            self.opening
                .entry(index_name.to_string())
                .or_default()
                .value(),
        );
        let _opening = opening.lock().await;

        if let Some(session) = self.cached(index_name) {
            return Ok(session);
        }

        let config = self.configurations.configuration(index_name)?;
        let directory = self.directories.directory(index_name)?;
        let heap_bytes = self.writer_heap_bytes;
        let name = index_name.to_string();

        let session = tokio::task::spawn_blocking(move || {
            IndexSession::open(&name, config, &directory, heap_bytes)
        })
        .await
        .map_err(|e| ShelfError::Storage(format!("Blocking task failed: {e}")))??;

        let session = Arc::new(session);
        self.sessions
            .insert(index_name.to_string(), Arc::clone(&session));
        tracing::info!("Opened session for index '{}'", index_name);

        Ok(session)
    }

    fn cached(&self, index_name: &str) -> Option<Arc<IndexSession>> {
        self.sessions.get(index_name).map(|s| Arc::clone(s.value()))
    }

    /// Fresh session that is not cached or shared
    pub fn transient_session(&self, index_name: &str) -> Result<IndexSession> {
        let config = self.configurations.configuration(index_name)?;
        let directory = self.directories.open_uncached(index_name)?;
        IndexSession::open(index_name, config, &directory, self.writer_heap_bytes)
    }

    async fn wait_for_gate(&self, index_name: &str) -> Result<()> {
        let mut receiver = match self.gates.get(index_name) {
            Some(gate) => gate.subscribe(),
            None => return Ok(()),
        };

        tracing::debug!("Waiting for exclusive gate on '{}'", index_name);

        // A dropped sender counts as released
        let waited = tokio::time::timeout(self.gate_timeout, receiver.wait_for(|released| *released))
            .await
            .map(|_| ());

        match waited {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!(
                    "Gate on '{}' not released within {:?}",
                    index_name,
                    self.gate_timeout
                );
                Err(ShelfError::LockTimeout {
                    index: index_name.to_string(),
                    waited_ms: self.gate_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Commit pending writes on a live session, if any
    pub fn commit(&self, index_name: &str) -> Result<()> {
        let session = self.sessions.get(index_name).map(|s| Arc::clone(s.value()));
        if let Some(session) = session {
            session.commit()?;
        }
        Ok(())
    }

    /// Commit, release and forget the session. Idempotent.
    pub fn close_session(&self, index_name: &str) -> Result<()> {
        if let Some((_, session)) = self.sessions.remove(index_name) {
            session.close()?;
            tracing::info!("Closed session for index '{}'", index_name);
        }
        Ok(())
    }

    /// Close every open session, logging failures. Returns how many closed cleanly.
    pub fn close_all(&self) -> usize {
        let names: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let mut closed = 0;

        for name in names {
            match self.close_session(&name) {
                Ok(()) => closed += 1,
                Err(e) => tracing::error!("Failed to close session '{}': {}", name, e),
            }
        }

        closed
    }

    pub fn has_session(&self, index_name: &str) -> bool {
        self.sessions.contains_key(index_name)
    }

    /// Install the exclusive gate. Returns `false` if one was already installed.
    pub fn add_lock(&self, index_name: &str) -> bool {
        let mut installed = false;
        self.gates.entry(index_name.to_string()).or_insert_with(|| {
            installed = true;
            watch::channel(false).0
        });

        if installed {
            tracing::debug!("Installed exclusive gate on '{}'", index_name);
        }
        installed
    }

    /// Release the gate and wake every waiter
    pub fn release_lock(&self, index_name: &str) {
        if let Some((_, gate)) = self.gates.remove(index_name) {
            gate.send_replace(true);
            tracing::debug!("Released exclusive gate on '{}'", index_name);
        }
    }

    pub fn is_locked(&self, index_name: &str) -> bool {
        self.gates.contains_key(index_name)
    }

    /// Gate every name in `index_names` until the returned guard drops
    pub fn exclusive(self: &Arc<Self>, index_names: &[&str]) -> ExclusiveGate {
        let installed = index_names
            .iter()
            .filter(|name| self.add_lock(name))
            .map(|name| name.to_string())
            .collect();

        ExclusiveGate {
            registry: Arc::clone(self),
            installed,
        }
    }
}

/// Releases the gates it installed when dropped.
///
/// Gates that were already installed by someone else are left alone.
pub struct ExclusiveGate {
    registry: Arc<SessionRegistry>,
    installed: Vec<String>,
}

impl ExclusiveGate {
    pub fn index_names(&self) -> &[String] {
        &self.installed
    }
}

impl Drop for ExclusiveGate {
    fn drop(&mut self) {
        for name in &self.installed {
            self.registry.release_lock(name);
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("gates", &self.gates.len())
            .field("gate_timeout", &self.gate_timeout)
            .finish()
    }
}
