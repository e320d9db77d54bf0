//! Directory registry: one cached storage-directory handle per index name.
//!
//! Directory layout:
//!
//! ```text
//! {index_root}/
//! ├── BlogPost/          # live index
//! │   ├── meta.json
//! │   └── [segment files]
//! └── BlogPost_temp/     # scratch index awaiting swap
//! ```

use crate::core::error::{Result, ShelfError};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tantivy::directory::MmapDirectory;

static INDEX_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid index name pattern"));

/// Reject names that cannot safely become a single path component
pub fn validate_index_name(index_name: &str) -> Result<()> {
    if !INDEX_NAME_PATTERN.is_match(index_name) || index_name == "." || index_name.contains("..")
    {
        return Err(ShelfError::InvalidIndexName(index_name.to_string()));
    }
    Ok(())
}

/// Caches opened directory handles by index name
pub struct DirectoryRegistry {
    /// Root directory for all indexes
    root: PathBuf,

    directories: DashMap<String, MmapDirectory>,
}

impl std::fmt::Debug for DirectoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryRegistry")
            .field("root", &self.root)
            .field("cached", &self.directories.len())
            .finish()
    }
}

impl DirectoryRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            directories: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of an index
    pub fn path(&self, index_name: &str) -> Result<PathBuf> {
        validate_index_name(index_name)?;
        Ok(self.root.join(index_name))
    }

    /// Cached handle for `index_name`, opening (and creating on disk) on first use
    pub fn directory(&self, index_name: &str) -> Result<MmapDirectory> {
        if let Some(directory) = self.directories.get(index_name) {
            return Ok(directory.clone());
        }

        let path = self.path(index_name)?;
        let entry = self
            .directories
            .entry(index_name.to_string())
            .or_try_insert_with(|| {
                fs::create_dir_all(&path)?;
                tracing::debug!("Opening index directory {:?}", path);
                MmapDirectory::open(&path).map_err(|e| {
                    ShelfError::Storage(format!("Failed to open directory {path:?}: {e}"))
                })
            })?;

        Ok(entry.value().clone())
    }

    /// Open a handle without caching it (scratch copies)
    pub fn open_uncached(&self, index_name: &str) -> Result<MmapDirectory> {
        let path = self.path(index_name)?;
        fs::create_dir_all(&path)?;
        MmapDirectory::open(&path)
            .map_err(|e| ShelfError::Storage(format!("Failed to open directory {path:?}: {e}")))
    }

    /// Drop the cached handle so the next access reopens the path
    pub fn dispose(&self, index_name: &str) {
        if self.directories.remove(index_name).is_some() {
            tracing::debug!("Disposed directory handle for '{}'", index_name);
        }
    }

    pub fn is_cached(&self, index_name: &str) -> bool {
        self.directories.contains_key(index_name)
    }
}
