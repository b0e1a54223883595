//! Repository inspection and staging of generated outputs.

use crate::errors::GitStateResult;
use git2::{Repository, Status, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Thin wrapper over an opened repository for the handful of queries the
/// pipeline needs.
pub struct RepoInspector {
    repo: Repository,
    repo_path: PathBuf,
}

impl RepoInspector {
    pub fn open(repo_path: &Path) -> GitStateResult<Self> {
        let repo = Repository::open(repo_path)?;
        Ok(Self {
            repo,
            repo_path: repo_path.to_path_buf(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Hash of the commit `HEAD` points at; becomes `document_version`
    /// once a run completes.
    pub fn head_commit_hash(&self) -> GitStateResult<String> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Stage every untracked or modified file under the given output
    /// prefixes (the rendered docs folder and the snapshot directory).
    /// Returns the repo-relative paths that were added.
    pub fn stage_outputs(&self, prefixes: &[&str]) -> GitStateResult<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;

        let mut staged = Vec::new();
        let mut index = self.repo.index()?;
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            let pending = entry
                .status()
                .intersects(Status::WT_NEW | Status::WT_MODIFIED | Status::WT_DELETED);
            if !pending || !prefixes.iter().any(|p| path.starts_with(p)) {
                continue;
            }
            if entry.status().contains(Status::WT_DELETED) {
                index.remove_path(Path::new(path))?;
            } else {
                index.add_path(Path::new(path))?;
            }
            staged.push(path.to_string());
        }
        if !staged.is_empty() {
            index.write()?;
            info!(count = staged.len(), "staged generated outputs");
        }
        Ok(staged)
    }
}
