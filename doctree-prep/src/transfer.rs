//! Change detection between the previous snapshot and a freshly-built tree.
//!
//! Runs in two passes with reference resolution in between: the first pass
//! transfers docs and compares code, the second reacts to referencer-set
//! changes for items the first pass left up to date. Matching is by strict
//! qualified name, so duplicate-symbol files stay deterministic across runs.

use crate::meta::MetaInfo;
use crate::model::item::{DocItemStatus, ItemId};
use std::collections::BTreeSet;
use tracing::info;

/// Pass 1: move surviving docs into the new tree, flag code changes, and
/// collect the items that vanished since the previous snapshot.
pub fn transfer_docs_from_older(new_meta: &mut MetaInfo, old_meta: &MetaInfo) {
    info!("merging docs from the previous snapshot");
    let index = new_meta.tree.strict_name_index();
    let mut deleted = Vec::new();

    for old_id in old_meta.tree.preorder() {
        if old_id == old_meta.tree.root() {
            continue;
        }
        let name = old_meta.tree.full_name_strict(old_id);
        let old_item = old_meta.tree.get(old_id);
        let Some(&new_id) = index.get(&name) else {
            info!(kind = %old_item.kind, item = %name, "deleted since previous snapshot");
            deleted.push((name, old_item.kind));
            continue;
        };

        let code_changed = match (&old_item.content, &new_meta.tree.get(new_id).content) {
            (Some(old_record), Some(new_record)) => {
                old_record.code_content != new_record.code_content
            }
            _ => false,
        };

        let new_item = new_meta.tree.get_mut(new_id);
        new_item.md_content = old_item.md_content.clone();
        new_item.status = if old_item.md_content.is_empty() {
            DocItemStatus::NotGenerated
        } else if code_changed {
            DocItemStatus::CodeChanged
        } else {
            old_item.status
        };
    }

    new_meta.deleted_items_from_older_meta = deleted;
}

/// Pass 2 (after reference resolution): compare referencer sets for items
/// still up to date. A strictly grown set means the docs may want to
/// mention a new caller; a strictly shrunk set the opposite. Equal or
/// incomparable sets change nothing.
pub fn detect_referencer_changes(new_meta: &mut MetaInfo, old_meta: &MetaInfo) {
    let index = new_meta.tree.strict_name_index();

    for old_id in old_meta.tree.preorder() {
        if old_id == old_meta.tree.root() {
            continue;
        }
        let name = old_meta.tree.full_name_strict(old_id);
        let Some(&new_id) = index.get(&name) else { continue };
        if new_meta.tree.get(new_id).status != DocItemStatus::UpToDate {
            continue;
        }

        let new_refs = referencer_names(new_meta, new_id);
        let old_refs = referencer_names(old_meta, old_id);
        if new_refs == old_refs {
            continue;
        }
        if old_refs.is_subset(&new_refs) {
            new_meta.tree.get_mut(new_id).status = DocItemStatus::HasNewReferencer;
        } else if new_refs.is_subset(&old_refs) {
            new_meta.tree.get_mut(new_id).status = DocItemStatus::HasNoReferencer;
        }
    }
}

fn referencer_names(meta: &MetaInfo, id: ItemId) -> BTreeSet<String> {
    meta.tree
        .get(id)
        .references_to_this
        .iter()
        .map(|&r| meta.tree.full_name_strict(r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::DocItemKind;
    use crate::model::record::{SymbolKindTag, SymbolRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn record(name: &str, start: i64, end: i64, code: &str) -> SymbolRecord {
        SymbolRecord::parsed(SymbolKindTag::FunctionDef, name, start, end, 4, vec![], false, code)
    }

    fn meta_of(records: Vec<SymbolRecord>) -> MetaInfo {
        let mut files = BTreeMap::new();
        files.insert("a.py".to_string(), records);
        MetaInfo::init(PathBuf::from("/repo"), &files, BTreeMap::new(), vec![]).unwrap()
    }

    fn finish(meta: &mut MetaInfo, name: &str) {
        let id = meta.tree.find(&["a.py", name]).unwrap();
        meta.tree.get_mut(id).md_content.push(format!("doc {name}"));
        meta.tree.get_mut(id).status = DocItemStatus::UpToDate;
    }

    #[test]
    fn unchanged_symbol_stays_up_to_date() {
        let mut old = meta_of(vec![record("f", 1, 3, "body")]);
        finish(&mut old, "f");
        let mut new = meta_of(vec![record("f", 1, 3, "body")]);
        transfer_docs_from_older(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        assert_eq!(new.tree.get(f).status, DocItemStatus::UpToDate);
        assert_eq!(new.tree.get(f).md_content.len(), 1);
    }

    #[test]
    fn changed_code_flags_code_changed_but_keeps_docs() {
        let mut old = meta_of(vec![record("f", 1, 3, "body")]);
        finish(&mut old, "f");
        let mut new = meta_of(vec![record("f", 1, 3, "edited body")]);
        transfer_docs_from_older(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        assert_eq!(new.tree.get(f).status, DocItemStatus::CodeChanged);
        assert_eq!(new.tree.get(f).md_content, vec!["doc f".to_string()]);
    }

    #[test]
    fn empty_old_docs_mean_not_generated() {
        let old = meta_of(vec![record("f", 1, 3, "body")]);
        let mut new = meta_of(vec![record("f", 1, 3, "body")]);
        transfer_docs_from_older(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        assert_eq!(new.tree.get(f).status, DocItemStatus::NotGenerated);
    }

    #[test]
    fn vanished_symbols_are_recorded() {
        let old = meta_of(vec![record("f", 1, 3, "body"), record("gone", 5, 8, "x")]);
        let mut new = meta_of(vec![record("f", 1, 3, "body")]);
        transfer_docs_from_older(&mut new, &old);
        assert_eq!(
            new.deleted_items_from_older_meta,
            vec![("a.py/gone".to_string(), DocItemKind::Function)]
        );
    }

    #[test]
    fn new_referencer_flags_grown_set() {
        let mut old = meta_of(vec![record("f", 1, 3, "body"), record("g", 5, 8, "calls f")]);
        finish(&mut old, "f");
        finish(&mut old, "g");
        let g_old = old.tree.find(&["a.py", "g"]).unwrap();
        let f_old = old.tree.find(&["a.py", "f"]).unwrap();
        old.tree.add_reference(g_old, f_old, false);

        let mut new = meta_of(vec![
            record("f", 1, 3, "body"),
            record("g", 5, 8, "calls f"),
            record("h", 10, 12, "also calls f"),
        ]);
        transfer_docs_from_older(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        let g = new.tree.find(&["a.py", "g"]).unwrap();
        let h = new.tree.find(&["a.py", "h"]).unwrap();
        new.tree.add_reference(g, f, false);
        new.tree.add_reference(h, f, false);
        detect_referencer_changes(&mut new, &old);

        assert_eq!(new.tree.get(f).status, DocItemStatus::HasNewReferencer);
        assert_eq!(new.tree.get(h).status, DocItemStatus::NotGenerated);
    }

    #[test]
    fn lost_referencer_flags_shrunk_set() {
        let mut old = meta_of(vec![record("f", 1, 3, "body"), record("g", 5, 8, "calls f")]);
        finish(&mut old, "f");
        finish(&mut old, "g");
        let g_old = old.tree.find(&["a.py", "g"]).unwrap();
        let f_old = old.tree.find(&["a.py", "f"]).unwrap();
        old.tree.add_reference(g_old, f_old, false);

        let mut new = meta_of(vec![record("f", 1, 3, "body"), record("g", 5, 8, "no call")]);
        transfer_docs_from_older(&mut new, &old);
        detect_referencer_changes(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        assert_eq!(new.tree.get(f).status, DocItemStatus::HasNoReferencer);
    }

    #[test]
    fn code_change_wins_over_referencer_change() {
        let mut old = meta_of(vec![record("f", 1, 3, "body"), record("g", 5, 8, "calls f")]);
        finish(&mut old, "f");
        finish(&mut old, "g");
        let g_old = old.tree.find(&["a.py", "g"]).unwrap();
        let f_old = old.tree.find(&["a.py", "f"]).unwrap();
        old.tree.add_reference(g_old, f_old, false);

        let mut new = meta_of(vec![
            record("f", 1, 3, "edited"),
            record("g", 5, 8, "calls f"),
            record("h", 10, 12, "calls f"),
        ]);
        transfer_docs_from_older(&mut new, &old);
        let f = new.tree.find(&["a.py", "f"]).unwrap();
        let g = new.tree.find(&["a.py", "g"]).unwrap();
        let h = new.tree.find(&["a.py", "h"]).unwrap();
        new.tree.add_reference(g, f, false);
        new.tree.add_reference(h, f, false);
        detect_referencer_changes(&mut new, &old);
        assert_eq!(new.tree.get(f).status, DocItemStatus::CodeChanged);
    }
}
