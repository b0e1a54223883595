//! Git-backed working-tree state for the documentation pipeline.
//!
//! Two concerns live here:
//! - [`phantom`]: swapping changed sources with their committed blobs for
//!   the analysis phase, and restoring the working tree afterwards.
//! - [`git`]: HEAD inspection and staging of generated outputs.

pub mod errors;
pub mod git;
pub mod phantom;

pub use errors::{Error, GitStateResult};
pub use git::RepoInspector;
pub use phantom::{LATEST_VERSION_TAG, latest_version_suffix, materialize, restore};
