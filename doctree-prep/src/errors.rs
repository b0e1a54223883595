//! Crate-wide error hierarchy for doctree-prep.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Loud snapshot failures (a corrupted checkpoint must never silently
//!   re-initialize the project).
//! - Ergonomic `?` via `From` impls, no dynamic dispatch.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type TreeResult<T> = Result<T, Error>;

/// Root error type for the doctree-prep crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot (file I/O / JSON) failure.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Input that the tree builder refuses to guess about.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors raised while constructing the symbol tree.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two records in one file claim the same line range; the containment
    /// rule cannot pick a parent, so this is a configuration error.
    #[error("duplicate line range {start}..{end} in {file}: containment cannot resolve a parent")]
    DuplicateRange {
        file: String,
        start: i64,
        end: i64,
    },
}

/// Snapshot store errors (checkpoint/load).
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The snapshot directory exists but a required file is missing.
    #[error("snapshot file missing: {0}")]
    Missing(String),
}

// ===== Conversions for `?` ergonomics =====

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Snapshot(SnapshotError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Snapshot(SnapshotError::Serde(e))
    }
}
