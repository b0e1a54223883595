//! Reference resolution: walk the tree, drive the external resolver, and
//! wire the bidirectional edge lists.
//!
//! Hits are filtered before an edge is inserted: referrers inside phantom
//! or jump files resolve against the wrong file version, self-named hits
//! are definition sites or re-imports, and ancestor/descendant pairs are
//! already ordered by containment.

use doctree_prep::{MetaInfo, ReferenceResolver};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Resolve references for every symbol under every file node and populate
/// `references_from_this` / `references_to_this` plus the special flags.
/// Resolver failures are logged with their inputs and skipped.
pub fn resolve_references<R: ReferenceResolver>(meta: &mut MetaInfo, resolver: &R) {
    let whitelist_files: Option<HashSet<String>> = meta
        .whitelist
        .as_ref()
        .map(|wl| wl.iter().map(|e| e.file_path.clone()).collect());
    let whitelist_ids: Option<HashSet<String>> = meta
        .whitelist
        .as_ref()
        .map(|wl| wl.iter().map(|e| e.id_text.clone()).collect());

    let mut edge_count = 0usize;
    for file_id in meta.tree.all_files() {
        let file_path = meta.tree.full_name(file_id);
        if meta.fake_file_reflection.values().any(|v| *v == file_path)
            || meta.jump_files.contains(&file_path)
        {
            warn!(file = %file_path, "skipping phantom/jump file during reference resolution");
            continue;
        }
        if let Some(files) = &whitelist_files {
            if !files.contains(&file_path) {
                continue;
            }
        }

        for id in meta.tree.preorder_from(file_id) {
            let Some(record) = meta.tree.get(id).content.clone() else {
                continue;
            };
            let in_file_only = whitelist_ids
                .as_ref()
                .map(|ids| !ids.contains(&record.name))
                .unwrap_or(false);

            let hits = match resolver.references(
                &meta.repo_root_path,
                &record.name,
                &file_path,
                record.code_start_line,
                record.name_column,
                in_file_only,
            ) {
                Ok(hits) => hits,
                Err(err) => {
                    warn!(
                        symbol = %record.name,
                        file = %file_path,
                        line = record.code_start_line,
                        column = record.name_column,
                        in_file_only,
                        error = %err,
                        "reference resolver failed, skipping symbol"
                    );
                    continue;
                }
            };

            for hit in hits {
                if meta.fake_file_reflection.values().any(|v| *v == hit.file_path) {
                    debug!(file = %hit.file_path, "skipping phantom-content reference");
                    continue;
                }
                if meta.jump_files.contains(&hit.file_path) {
                    debug!(file = %hit.file_path, "skipping jump-file reference");
                    continue;
                }
                let segments: Vec<&str> = hit.file_path.split('/').collect();
                let Some(referrer_file) = meta.tree.find(&segments) else {
                    warn!(file = %hit.file_path, "referrer file not present in tree");
                    continue;
                };
                let referrer = meta.tree.find_symbol_at_line(referrer_file, hit.line);

                let referrer_item = meta.tree.get(referrer);
                let referrer_name = referrer_item
                    .content
                    .as_ref()
                    .map(|r| r.name.as_str())
                    .unwrap_or(referrer_item.name.as_str());
                if referrer_name == record.name {
                    debug!(symbol = %record.name, "skipping self-named reference");
                    continue;
                }
                if meta.tree.check_and_return_ancestor(referrer, id).is_some() {
                    continue;
                }

                let special = referrer_item.kind.is_function_like()
                    && referrer_item.code_start_line == hit.line;
                if meta.tree.add_reference(referrer, id, special) {
                    edge_count += 1;
                }
            }
        }
    }
    info!(edges = edge_count, "reference resolution finished");
}
