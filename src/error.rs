//! Error types of the indexing core.

use std::fmt;
use thiserror::Error;

use crate::model::PackError;
use crate::scanner::ScanError;

/// Which kind of entry collided during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Media,
    MetaFile,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Directory => "directory",
            EntryKind::Media => "media",
            EntryKind::MetaFile => "meta file",
        })
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Two scanned siblings share a name. Nothing of the merge is applied.
    #[error("duplicate {kind} {name:?} in {path:?}")]
    IdentityConflict {
        kind: EntryKind,
        path: String,
        name: String,
    },

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("unexpected value {value:?} stored in {column}")]
    Corrupt { column: &'static str, value: String },

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// The save was still waiting for its turn when the index was reset.
    #[error("queued save of {0:?} dropped by index reset")]
    Cancelled(String),

    #[error("save worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for IndexError {
    fn from(err: tokio::task::JoinError) -> Self {
        IndexError::Worker(err.to_string())
    }
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
