//! Error types for git inspection and phantom-file management.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GitStateResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying libgit2 failure (missing repository, unborn HEAD, ...).
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Filesystem failure while swapping or restoring files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A `*_latest_version` file is sitting in the staged-adds index.
    /// The working tree was left mid-swap by an earlier run; run a manual
    /// restore before regenerating.
    #[error(
        "phantom file staged for commit: {0}; restore the working tree before regenerating"
    )]
    FakeFileStaged(String),
}
