//! Filesystem evidence storage
//!
//! Persists uploaded blobs under a per-run directory with sanitized,
//! unique filenames. Retrieval is run-scoped and containment-checked so
//! a crafted filename can never escape the store root.

use dashmap::DashMap;
use ehs_types::{EvidenceFile, FileId, RunId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Default per-file size cap: 5 MiB
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("evidence io error: {0}")]
    Io(#[from] std::io::Error),

    /// File exceeds the configured size cap
    #[error("evidence file {filename} exceeds size cap ({size} > {cap} bytes)")]
    TooLarge {
        /// Original filename
        filename: String,
        /// Actual size
        size: usize,
        /// Configured cap
        cap: usize,
    },

    /// No such stored file for the run
    #[error("evidence not found: {run_id}/{filename}")]
    NotFound {
        /// Run identifier
        run_id: RunId,
        /// Requested filename
        filename: String,
    },
}

/// Metadata for one stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvidence {
    /// File identifier
    pub file_id: FileId,
    /// Original filename as uploaded
    pub filename: String,
    /// Sanitized unique name on disk
    pub stored_name: String,
    /// Stored size in bytes
    pub size_bytes: usize,
    /// Hex SHA-256 of the content
    pub sha256: String,
    /// Run-scoped reference usable by a retrieval endpoint
    pub url: String,
}

/// Per-run filesystem store for raw evidence
///
/// Safe to share across concurrent runs; each run writes only inside
/// its own directory.
#[derive(Debug)]
pub struct EvidenceStore {
    root: PathBuf,
    max_bytes: usize,
    index: DashMap<RunId, Vec<StoredEvidence>>,
}

impl EvidenceStore {
    /// Create a store rooted at `root` with the default size cap
    ///
    /// # Errors
    /// Propagates filesystem errors creating the root.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_max_bytes(root, DEFAULT_MAX_BYTES)
    }

    /// Create a store with an explicit per-file size cap
    ///
    /// # Errors
    /// Propagates filesystem errors creating the root.
    pub fn with_max_bytes(root: impl Into<PathBuf>, max_bytes: usize) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_bytes,
            index: DashMap::new(),
        })
    }

    /// Store root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one uploaded file under the run's directory
    ///
    /// # Errors
    /// - `StoreError::TooLarge` when the blob exceeds the cap (the
    ///   caller skips the file and continues the run)
    /// - `StoreError::Io` on filesystem failure
    pub fn save(&self, run_id: RunId, file: &EvidenceFile) -> Result<StoredEvidence, StoreError> {
        if file.bytes.len() > self.max_bytes {
            tracing::warn!(
                filename = %file.filename,
                size = file.bytes.len(),
                "evidence file exceeds size cap; skipping save"
            );
            return Err(StoreError::TooLarge {
                filename: file.filename.clone(),
                size: file.bytes.len(),
                cap: self.max_bytes,
            });
        }

        let run_dir = self.root.join(run_id.to_string());
        std::fs::create_dir_all(&run_dir)?;

        let stored_name = format!("{}_{}", Ulid::new(), sanitize_filename(&file.filename));
        std::fs::write(run_dir.join(&stored_name), &file.bytes)?;

        let record = StoredEvidence {
            file_id: file.id,
            filename: file.filename.clone(),
            stored_name: stored_name.clone(),
            size_bytes: file.bytes.len(),
            sha256: hex_digest(&file.bytes),
            url: format!("/evidence/{run_id}/{stored_name}"),
        };
        self.index.entry(run_id).or_default().push(record.clone());
        tracing::debug!(run_id = %run_id, stored = %stored_name, "stored evidence file");
        Ok(record)
    }

    /// Stored metadata for a run, in save order
    #[must_use]
    pub fn records(&self, run_id: RunId) -> Vec<StoredEvidence> {
        self.index
            .get(&run_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Retrieve a previously stored blob by run id and stored name
    ///
    /// # Errors
    /// `StoreError::NotFound` for unknown names or paths escaping the
    /// store root.
    pub fn retrieve(&self, run_id: RunId, stored_name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(run_id, stored_name)?;
        if !path.is_file() {
            return Err(StoreError::NotFound {
                run_id,
                filename: stored_name.to_string(),
            });
        }
        Ok(std::fs::read(path)?)
    }

    /// Resolve a stored name to a path, rejecting escapes from the root
    fn resolve(&self, run_id: RunId, stored_name: &str) -> Result<PathBuf, StoreError> {
        let candidate = self.root.join(run_id.to_string()).join(stored_name);
        // Containment check: a name like "../../etc/passwd" must not
        // resolve outside the store root.
        let canonical = candidate
            .canonicalize()
            .map_err(|_| StoreError::NotFound {
                run_id,
                filename: stored_name.to_string(),
            })?;
        let root = self.root.canonicalize()?;
        if !canonical.starts_with(&root) {
            tracing::warn!(path = %canonical.display(), "evidence access outside store root");
            return Err(StoreError::NotFound {
                run_id,
                filename: stored_name.to_string(),
            });
        }
        Ok(canonical)
    }
}

/// Replace anything that is not alphanumeric (any script) or one of
/// `.`, `-`, `_` with an underscore, then trim leading/trailing dots
/// and underscores
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "evidence".to_string()
    } else {
        trimmed.to_string()
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
