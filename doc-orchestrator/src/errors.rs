//! Crate-wide error hierarchy for doc-orchestrator.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Configuration problems stay fatal and side-effect free.
//! - Ergonomic `?` over the member-crate error types.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type DocResult<T> = Result<T, Error>;

/// Root error type for the doc-orchestrator crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration problems (missing config, bad values, missing
    /// whitelist, unknown prompt profile).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Symbol tree / snapshot failure.
    #[error(transparent)]
    Tree(#[from] doctree_prep::Error),

    /// Git or phantom-file failure.
    #[error(transparent)]
    GitState(#[from] git_phantom_engine::Error),

    /// Filesystem failure outside the snapshot store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker task could not be joined.
    #[error("worker failure: {0}")]
    Worker(String),
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),

    #[error("whitelist file does not exist: {0}")]
    MissingWhitelist(PathBuf),

    #[error("cannot parse whitelist file: {0}")]
    WhitelistFormat(#[from] serde_json::Error),

    #[error("unknown prompt profile: {0}")]
    UnknownProfile(String),
}
