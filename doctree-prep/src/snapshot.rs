//! On-disk snapshot store: `project_hierarchy.json` plus the
//! `meta-info.json` sidecar.
//!
//! The hierarchy file maps repo-relative file paths to the ordered symbol
//! records of that file (pre-order, so sibling de-duplication replays
//! identically on load). Dir/File/Repo nodes are implicit in the path keys.
//! The sidecar carries the non-tree `MetaInfo` fields so an interrupted run
//! can resume. Both files are written via a sibling temp file and an atomic
//! rename; load fails loudly instead of silently re-initializing.

use crate::errors::{SnapshotError, TreeResult};
use crate::meta::MetaInfo;
use crate::model::item::{DocItemKind, ItemId};
use crate::model::record::{SymbolRecord, WhitelistEntry};
use crate::tree::DocTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const HIERARCHY_FILE: &str = "project_hierarchy.json";
pub const META_FILE: &str = "meta-info.json";

/// Sidecar row for everything `project_hierarchy.json` cannot express.
#[derive(Debug, Serialize, Deserialize)]
struct MetaSidecar {
    repo_root_path: PathBuf,
    document_version: String,
    in_generation_process: bool,
    #[serde(default)]
    whitelist: Option<Vec<WhitelistEntry>>,
    #[serde(default)]
    fake_file_reflection: BTreeMap<String, String>,
    #[serde(default)]
    jump_files: Vec<String>,
    #[serde(default)]
    deleted_items_from_older_meta: Vec<(String, DocItemKind)>,
}

/// Write the snapshot under `target_dir`. With `flash_references` the
/// resolved edges are persisted as strict qualified names.
pub fn checkpoint(meta: &MetaInfo, target_dir: &Path, flash_references: bool) -> TreeResult<()> {
    fs::create_dir_all(target_dir)?;

    let hierarchy = hierarchy_of(&meta.tree, flash_references);
    write_atomic(
        &target_dir.join(HIERARCHY_FILE),
        &serde_json::to_vec_pretty(&hierarchy)?,
    )?;

    let sidecar = MetaSidecar {
        repo_root_path: meta.repo_root_path.clone(),
        document_version: meta.document_version.clone(),
        in_generation_process: meta.in_generation_process,
        whitelist: meta.whitelist.clone(),
        fake_file_reflection: meta.fake_file_reflection.clone(),
        jump_files: meta.jump_files.clone(),
        deleted_items_from_older_meta: meta.deleted_items_from_older_meta.clone(),
    };
    write_atomic(
        &target_dir.join(META_FILE),
        &serde_json::to_vec_pretty(&sidecar)?,
    )?;

    debug!(dir = %target_dir.display(), flash_references, "checkpoint written");
    Ok(())
}

/// Rehydrate a `MetaInfo` from `target_dir`. Missing or malformed files are
/// errors; the caller decides whether a fresh init is appropriate.
pub fn load(target_dir: &Path) -> TreeResult<MetaInfo> {
    let hierarchy_path = target_dir.join(HIERARCHY_FILE);
    let meta_path = target_dir.join(META_FILE);
    for path in [&hierarchy_path, &meta_path] {
        if !path.exists() {
            return Err(SnapshotError::Missing(path.display().to_string()).into());
        }
    }

    let hierarchy: BTreeMap<String, Vec<SymbolRecord>> =
        serde_json::from_slice(&fs::read(&hierarchy_path)?)?;
    let sidecar: MetaSidecar = serde_json::from_slice(&fs::read(&meta_path)?)?;

    let root_name = sidecar.repo_root_path.display().to_string();
    let mut tree = DocTree::from_files(root_name, &hierarchy)?;
    restore_references(&mut tree, &hierarchy);

    info!(dir = %target_dir.display(), files = hierarchy.len(), "snapshot loaded");
    Ok(MetaInfo {
        repo_root_path: sidecar.repo_root_path,
        document_version: sidecar.document_version,
        tree,
        whitelist: sidecar.whitelist,
        fake_file_reflection: sidecar.fake_file_reflection,
        jump_files: sidecar.jump_files,
        deleted_items_from_older_meta: sidecar.deleted_items_from_older_meta,
        in_generation_process: sidecar.in_generation_process,
    })
}

/// Project the tree back into the file-keyed record map.
fn hierarchy_of(tree: &DocTree, flash_references: bool) -> BTreeMap<String, Vec<SymbolRecord>> {
    let mut out = BTreeMap::new();
    for file_id in tree.all_files() {
        let file_path = tree.full_name(file_id);
        let mut records = Vec::new();
        for id in tree.preorder_from(file_id) {
            let item = tree.get(id);
            let Some(base) = &item.content else { continue };
            let mut record = base.clone();
            record.md_content = item.md_content.clone();
            record.item_status = item.status;
            if flash_references {
                record.reference_who = Some(
                    item.references_from_this
                        .iter()
                        .map(|&r| tree.full_name_strict(r))
                        .collect(),
                );
                record.who_reference_me = Some(
                    item.references_to_this
                        .iter()
                        .map(|&r| tree.full_name_strict(r))
                        .collect(),
                );
                record.special_reference_type = Some(item.special_reference_flags.clone());
            } else {
                record.reference_who = None;
                record.who_reference_me = None;
                record.special_reference_type = None;
            }
            records.push(record);
        }
        out.insert(file_path, records);
    }
    out
}

/// Rebuild edges from the forward lists stored with `flash_references`.
/// The mirror lists are derived by `add_reference`, never read back.
fn restore_references(tree: &mut DocTree, hierarchy: &BTreeMap<String, Vec<SymbolRecord>>) {
    let index = tree.strict_name_index();
    for (file_path, records) in hierarchy {
        let segments: Vec<&str> = file_path.split('/').collect();
        let Some(file_id) = tree.find(&segments) else { continue };
        let symbol_ids: Vec<ItemId> = tree
            .preorder_from(file_id)
            .into_iter()
            .filter(|&id| tree.get(id).content.is_some())
            .collect();
        for (record, &from) in records.iter().zip(&symbol_ids) {
            let (Some(names), Some(specials)) =
                (&record.reference_who, &record.special_reference_type)
            else {
                continue;
            };
            for (name, &special) in names.iter().zip(specials) {
                if let Some(&to) = index.get(name) {
                    tree.add_reference(from, to, special);
                }
            }
        }
    }
}

/// Write through a sibling temp file, then rename over the destination.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
