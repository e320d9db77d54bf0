//! Index health checking.
//!
//! The live index is never inspected in place: its files are copied
//! into a scratch directory next to it (`{name}_{uuid}`), the copy is
//! opened and checked, and the copy is removed whatever the outcome,
//! including when tantivy panics on a damaged file.

use crate::core::error::{Result, ShelfError};
use crate::core::storage::directory::DirectoryRegistry;
use crate::core::storage::schema::{self, Analyzer};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tantivy::directory::MmapDirectory;
use tantivy::Index;
use walkdir::WalkDir;

/// Tantivy lock files are never copied into the scratch directory
const LOCK_FILES: &[&str] = &[".tantivy-writer.lock", ".tantivy-meta.lock"];

/// Outcome of a health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub index_name: String,

    /// Size of the live index on disk
    pub size_bytes: u64,

    pub segments: usize,
    pub documents: u64,

    /// Files whose checksum did not match
    pub corrupted_files: Vec<String>,

    /// Failures opening or reading the copy
    pub errors: Vec<String>,

    pub is_consistent: bool,

    pub checked_at: String,
}

impl HealthReport {
    fn unhealthy(index_name: &str, size_bytes: u64, error: String) -> Self {
        Self {
            index_name: index_name.to_string(),
            size_bytes,
            segments: 0,
            documents: 0,
            corrupted_files: Vec::new(),
            errors: vec![error],
            is_consistent: false,
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Runs consistency checks against scratch copies of live indexes
pub struct HealthChecker<'a> {
    directories: &'a DirectoryRegistry,
    analyzer: Analyzer,
}

impl<'a> HealthChecker<'a> {
    pub fn new(directories: &'a DirectoryRegistry, analyzer: Analyzer) -> Self {
        Self {
            directories,
            analyzer,
        }
    }

    /// Check `index_name` through a scratch copy
    ///
    /// Checks:
    /// - every managed file matches its checksum
    /// - every segment opens and can be searched
    pub fn check(&self, index_name: &str) -> Result<HealthReport> {
        let live_path = self.directories.path(index_name)?;
        let size_bytes = calculate_directory_size(&live_path);

        if !live_path.join("meta.json").is_file() {
            tracing::warn!("Health check: no index at {:?}", live_path);
            return Err(ShelfError::IndexNotFound(index_name.to_string()));
        }

        let scratch_name = format!("{}_{}", index_name, uuid::Uuid::new_v4().simple());
        let scratch = ScratchCopy {
            path: self.directories.path(&scratch_name)?,
        };

        let report = copy_index(&live_path, &scratch.path)
            .and_then(|()| self.inspect_copy(index_name, size_bytes, &scratch.path));
        drop(scratch);

        let report = report?;
        tracing::info!(
            "Health check for '{}': consistent={} segments={} documents={}",
            index_name,
            report.is_consistent,
            report.segments,
            report.documents
        );
        Ok(report)
    }

    fn inspect_copy(
        &self,
        index_name: &str,
        size_bytes: u64,
        scratch_path: &Path,
    ) -> Result<HealthReport> {
        let directory = MmapDirectory::open(scratch_path)
            .map_err(|e| ShelfError::Storage(format!("Failed to open scratch copy: {e}")))?;

        let index = match schema::open_existing(&directory, self.analyzer) {
            Ok(index) => index,
            Err(e) => return Ok(HealthReport::unhealthy(index_name, size_bytes, e.to_string())),
        };

        let mut errors = Vec::new();

        let corrupted_files: Vec<String> =
            match panic::catch_unwind(AssertUnwindSafe(|| index.validate_checksum())) {
                Ok(Ok(files)) => files.iter().map(|p| p.display().to_string()).collect(),
                Ok(Err(e)) => {
                    errors.push(format!("Checksum validation failed: {e}"));
                    Vec::new()
                }
                Err(payload) => {
                    errors.push(format!(
                        "Checksum validation aborted: {}",
                        panic_message(&*payload)
                    ));
                    Vec::new()
                }
            };

        let (segments, documents) =
            match panic::catch_unwind(AssertUnwindSafe(|| open_segments(&index))) {
                Ok(Ok(counts)) => counts,
                Ok(Err(e)) => {
                    errors.push(e.to_string());
                    (0, 0)
                }
                Err(payload) => {
                    errors.push(format!(
                        "Opening segments aborted: {}",
                        panic_message(&*payload)
                    ));
                    (0, 0)
                }
            };

        let is_consistent = corrupted_files.is_empty() && errors.is_empty();

        Ok(HealthReport {
            index_name: index_name.to_string(),
            size_bytes,
            segments,
            documents,
            corrupted_files,
            errors,
            is_consistent,
            checked_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Scratch directory removed on drop, unwinding included
struct ScratchCopy {
    path: PathBuf,
}

impl Drop for ScratchCopy {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!("Failed to remove scratch copy {:?}: {}", self.path, e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Open a reader over every segment and count live documents
fn open_segments(index: &Index) -> Result<(usize, u64)> {
    let reader = index
        .reader()
        .map_err(|e| ShelfError::Storage(format!("Failed to open segments: {e}")))?;
    let searcher = reader.searcher();

    Ok((searcher.segment_readers().len(), searcher.num_docs()))
}

/// Copy index files, skipping lock files
fn copy_index(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| ShelfError::Storage(format!("Failed to walk index: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| ShelfError::Storage(e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            let is_lock = entry
                .file_name()
                .to_str()
                .is_some_and(|name| LOCK_FILES.contains(&name));
            if !is_lock {
                fs::copy(entry.path(), &target)?;
            }
        }
    }

    Ok(())
}

/// Calculate total size of a directory recursively
pub fn calculate_directory_size(dir_path: &Path) -> u64 {
    if !dir_path.exists() {
        return 0;
    }

    WalkDir::new(dir_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
