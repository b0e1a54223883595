//! Phantom-file swapping around the analysis phase.
//!
//! While references are being resolved, every source file that differs from
//! `HEAD` is replaced by its committed blob and the working-tree version is
//! parked next to it as `<stem>_latest_version.<ext>`. The resolver then
//! sees line numbers that match the previous snapshot, while generation
//! still documents the working-tree code. `restore` undoes the swap and
//! must run on every exit path of a generation run.

use crate::errors::{Error, GitStateResult};
use git2::{Repository, Status, StatusOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Marker inserted before the extension of a parked working-tree file.
pub const LATEST_VERSION_TAG: &str = "_latest_version";

/// The full suffix a parked file ends with: `_latest_version.<ext>`.
pub fn latest_version_suffix(ext: &str) -> String {
    format!("{LATEST_VERSION_TAG}.{ext}")
}

/// Swap changed source files for their committed blobs.
///
/// Returns the reflection map (original path -> parked path) and the jump
/// list (untracked or staged-new sources the analysis must skip). A parked
/// file found in the staged-adds index is fatal: an earlier run died
/// mid-swap and the operator has to restore first.
pub fn materialize(
    repo_path: &Path,
    ext: &str,
) -> GitStateResult<(BTreeMap<String, String>, Vec<String>)> {
    // A clean slate: leftover parked files from a crashed run would
    // otherwise be swapped twice.
    restore(repo_path, ext)?;

    let repo = Repository::open(repo_path)?;
    let head_tree = repo.head()?.peel_to_tree()?;

    let suffix = latest_version_suffix(ext);
    let dot_ext = format!(".{ext}");

    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut reflections = BTreeMap::new();
    let mut jump_files = Vec::new();

    for entry in statuses.iter() {
        let Some(path) = entry.path() else { continue };
        let status = entry.status();

        if status.contains(Status::WT_NEW) {
            if path.ends_with(&dot_ext) {
                info!(file = path, "skipping untracked source");
                jump_files.push(path.to_string());
            }
            continue;
        }

        if status.contains(Status::INDEX_NEW) {
            if path.ends_with(&suffix) {
                return Err(Error::FakeFileStaged(path.to_string()));
            }
            if path.ends_with(&dot_ext) {
                jump_files.push(path.to_string());
            }
            continue;
        }

        let changed = status.intersects(
            Status::WT_MODIFIED | Status::WT_DELETED | Status::INDEX_MODIFIED | Status::INDEX_DELETED,
        );
        if !changed || !path.ends_with(&dot_ext) {
            continue;
        }
        if path.ends_with(&suffix) {
            return Err(Error::FakeFileStaged(path.to_string()));
        }

        let blob = match head_tree.get_path(Path::new(path)) {
            Ok(tree_entry) => repo.find_blob(tree_entry.id())?,
            Err(err) => {
                warn!(file = path, error = %err, "changed file missing from HEAD tree, skipping");
                continue;
            }
        };

        let parked = format!("{}{}", &path[..path.len() - dot_ext.len()], suffix);
        let abs_original = repo_path.join(path);
        let abs_parked = repo_path.join(&parked);

        if abs_original.exists() {
            fs::rename(&abs_original, &abs_parked)?;
            info!(from = path, to = %parked, "parked latest version");
        } else {
            // Deleted-but-unstaged file: a zero-byte marker records that the
            // original must not be re-created on restore.
            fs::write(&abs_parked, b"")?;
            info!(from = path, to = %parked, "marked deleted file");
        }
        fs::write(&abs_original, blob.content())?;
        reflections.insert(path.to_string(), parked);
    }

    Ok((reflections, jump_files))
}

/// Undo [`materialize`]: drop the committed-blob stand-ins and move every
/// parked file back. Zero-byte parked files mark deletions and are removed
/// without re-creating the original.
pub fn restore(repo_path: &Path, ext: &str) -> GitStateResult<()> {
    let suffix = latest_version_suffix(ext);
    let dot_ext = format!(".{ext}");

    let walker = walkdir::WalkDir::new(repo_path)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let parked = entry.path();
        let Some(name) = parked.to_str() else { continue };
        if !name.ends_with(&suffix) {
            continue;
        }

        let original = format!("{}{}", &name[..name.len() - suffix.len()], dot_ext);
        let original = Path::new(&original);
        if original.exists() {
            fs::remove_file(original)?;
        }
        if entry.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            info!(file = %parked.display(), "removing deletion marker");
            fs::remove_file(parked)?;
        } else {
            info!(from = %parked.display(), to = %original.display(), "recovered latest version");
            fs::rename(parked, original)?;
        }
    }
    Ok(())
}
