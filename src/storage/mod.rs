//! Resume persistence
//!
//! An optional SQLite mirror of crawl progress: which canonical URLs
//! have been claimed, which chunk fingerprints have been stored, and the
//! latest state of every page. A resumed run seeds the in-memory visited
//! and fingerprint sets from here instead of starting over.

mod schema;
mod sqlite;

pub use schema::initialize_schema;
pub use sqlite::ResumeStore;

use thiserror::Error;

/// Errors raised by the resume store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One crawl run as recorded in the resume database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub session_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
}

/// Lifecycle of a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
