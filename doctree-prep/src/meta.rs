//! Run-level container: the symbol tree plus everything the pipeline needs
//! to carry between revisions.

use crate::errors::TreeResult;
use crate::model::item::DocItemKind;
use crate::model::record::{SymbolRecord, WhitelistEntry};
use crate::tree::DocTree;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Root container for one documented repository.
#[derive(Debug, Clone)]
pub struct MetaInfo {
    pub repo_root_path: PathBuf,
    /// Revision hash at which `md_content` was last fully consistent;
    /// empty string before the first complete generation.
    pub document_version: String,
    pub tree: DocTree,
    pub whitelist: Option<Vec<WhitelistEntry>>,
    /// Working-tree path -> snapshotted `_latest_version` path, while
    /// phantom files are materialized.
    pub fake_file_reflection: BTreeMap<String, String>,
    /// Paths the analysis must skip (untracked or staged-new sources).
    pub jump_files: Vec<String>,
    /// `(qualified_name, kind)` of nodes that vanished since the previous
    /// snapshot.
    pub deleted_items_from_older_meta: Vec<(String, DocItemKind)>,
    /// Set while a generation run is underway; survives interruption via
    /// the checkpoint and signals resume on the next run.
    pub in_generation_process: bool,
}

impl MetaInfo {
    /// Initialize from parser output over the (phantom-materialized)
    /// working tree.
    pub fn init(
        repo_root_path: PathBuf,
        files: &BTreeMap<String, Vec<SymbolRecord>>,
        fake_file_reflection: BTreeMap<String, String>,
        jump_files: Vec<String>,
    ) -> TreeResult<Self> {
        info!(repo = %repo_root_path.display(), files = files.len(), "initializing meta info");
        let root_name = repo_root_path.display().to_string();
        let tree = DocTree::from_files(root_name, files)?;
        Ok(Self {
            repo_root_path,
            document_version: String::new(),
            tree,
            whitelist: None,
            fake_file_reflection,
            jump_files,
            deleted_items_from_older_meta: Vec::new(),
            in_generation_process: false,
        })
    }
}
