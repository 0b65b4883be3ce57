//! Session archive
//!
//! Each crawl run writes its harvest under one session prefix in an
//! object store: per page a `metadata.json` record plus the raw bytes of
//! every document the page references, and at the end of the run a
//! `status_report.json` summary. Archived sessions can be replayed
//! through the same partition, chunk, and ingest pipeline later without
//! re-crawling the site.
//!
//! ```text
//! {session_id}/
//!     {page-path-with-dashes}/
//!         metadata.json
//!         {base64-of-document-url}
//!     status_report.json
//! ```

mod reprocess;
mod session;

pub use reprocess::{Reprocessor, ReprocessSummary};
pub use session::{
    ArchivedDocument, ArchivedPage, ErrorRecord, FetchedDocument, SessionArchive, StatusReport,
};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

/// Errors raised by archive reads and writes
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where archived objects live
///
/// Keys are `/`-separated paths relative to the store root. The
/// filesystem store is the only backend here; the trait keeps the
/// session and reprocess code independent of it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), ArchiveError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Keys starting with `prefix`, sorted ascending
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ArchiveError>;
}

/// Object store backed by a directory tree
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key to a path under the root, rejecting traversal
    fn object_path(&self, key: &str) -> Result<PathBuf, ArchiveError> {
        if key.is_empty() {
            return Err(ArchiveError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(ArchiveError::InvalidKey(key.to_string()));
            }
            path.push(part);
        }
        Ok(path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, body: &[u8], _content_type: &str) -> Result<(), ArchiveError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        fs::write(&path, body).await.map_err(|e| io_error(&path, e))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ArchiveError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // An archive that was never written lists as empty
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && dir == self.root => {
                    return Ok(Vec::new());
                }
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
