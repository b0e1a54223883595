//! Markdown publication: one `.md` per source file, mirroring the source
//! tree under the configured docs folder.
//!
//! The folder is wiped and rewritten on every refresh; callers serialize
//! refreshes against checkpoints with the snapshot lock.

use crate::errors::DocResult;
use doctree_prep::{ItemId, MetaInfo};
use std::fs;
use std::path::Path;
use tracing::info;

/// Render every file whose subtree holds at least one generated body.
pub fn refresh(meta: &MetaInfo, repo_path: &Path, markdown_folder: &str, ext: &str) -> DocResult<()> {
    let out_root = repo_path.join(markdown_folder);
    if out_root.exists() {
        fs::remove_dir_all(&out_root)?;
    }
    fs::create_dir_all(&out_root)?;

    let mut written = 0usize;
    for file_id in meta.tree.all_files() {
        if !subtree_has_docs(meta, file_id) {
            continue;
        }
        let mut markdown = String::new();
        for &child in meta.tree.get(file_id).children.values() {
            markdown.push_str(&render_item(meta, child, 2));
        }

        let file_rel = meta.tree.full_name(file_id);
        let md_rel = swap_extension(&file_rel, ext);
        let out_path = out_root.join(&md_rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, markdown)?;
        written += 1;
    }

    info!(files = written, folder = %out_root.display(), "markdown refreshed");
    Ok(())
}

fn subtree_has_docs(meta: &MetaInfo, id: ItemId) -> bool {
    let item = meta.tree.get(id);
    if !item.md_content.is_empty() {
        return true;
    }
    item.children
        .values()
        .any(|&child| subtree_has_docs(meta, child))
}

/// `"<hashes> <kind> <name>(<params>)"` heading, the latest body (or the
/// waiting note), then every child at the next level followed by a `***`
/// divider.
fn render_item(meta: &MetaInfo, id: ItemId, level: usize) -> String {
    let item = meta.tree.get(id);
    let mut out = String::new();
    out.push_str(&"#".repeat(level));
    out.push(' ');
    out.push_str(item.kind.to_str());
    out.push(' ');
    out.push_str(&item.name);
    if let Some(record) = &item.content {
        if !record.params.is_empty() {
            out.push('(');
            out.push_str(&record.params.join(", "));
            out.push(')');
        }
    }
    out.push('\n');
    out.push_str(item.latest_doc().unwrap_or("Doc is waiting to be generated..."));
    out.push('\n');
    for &child in item.children.values() {
        out.push_str(&render_item(meta, child, level + 1));
        out.push_str("***\n");
    }
    out
}

/// `pkg/mod.py` -> `pkg/mod.md` (first extension boundary wins).
fn swap_extension(file_rel: &str, ext: &str) -> String {
    let suffix = format!(".{ext}");
    match file_rel.split(&suffix as &str).next() {
        Some(prefix) => format!("{prefix}.md"),
        None => format!("{file_rel}.md"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_prep::{DocItemStatus, SymbolKindTag, SymbolRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_meta() -> MetaInfo {
        let mut files = BTreeMap::new();
        files.insert(
            "pkg/mod.py".to_string(),
            vec![
                SymbolRecord::parsed(SymbolKindTag::ClassDef, "C", 1, 10, 6, vec![], false, ""),
                SymbolRecord::parsed(SymbolKindTag::FunctionDef, "m", 2, 5, 4, vec!["self".into(), "x".into()], false, ""),
            ],
        );
        files.insert(
            "pkg/empty.py".to_string(),
            vec![SymbolRecord::parsed(SymbolKindTag::FunctionDef, "nothing", 1, 2, 4, vec![], false, "")],
        );
        MetaInfo::init(PathBuf::from("/repo"), &files, BTreeMap::new(), vec![]).unwrap()
    }

    #[test]
    fn renders_headings_docs_and_dividers() {
        let mut meta = sample_meta();
        let c = meta.tree.find(&["pkg", "mod.py", "C"]).unwrap();
        let m = meta.tree.find(&["pkg", "mod.py", "C", "m"]).unwrap();
        meta.tree.get_mut(c).md_content.push("class docs".into());
        meta.tree.get_mut(c).status = DocItemStatus::UpToDate;
        meta.tree.get_mut(m).md_content.push("method docs".into());

        let dir = TempDir::new().unwrap();
        refresh(&meta, dir.path(), "markdown_docs", "py").unwrap();

        let rendered =
            fs::read_to_string(dir.path().join("markdown_docs/pkg/mod.md")).unwrap();
        assert!(rendered.contains("## ClassDef C\nclass docs"));
        assert!(rendered.contains("### FunctionDef m(self, x)\nmethod docs"));
        assert!(rendered.contains("***\n"));
        // Files with an all-empty subtree are omitted.
        assert!(!dir.path().join("markdown_docs/pkg/empty.md").exists());
    }

    #[test]
    fn waiting_note_for_ungenerated_children() {
        let mut meta = sample_meta();
        let c = meta.tree.find(&["pkg", "mod.py", "C"]).unwrap();
        meta.tree.get_mut(c).md_content.push("class docs".into());

        let dir = TempDir::new().unwrap();
        refresh(&meta, dir.path(), "markdown_docs", "py").unwrap();
        let rendered =
            fs::read_to_string(dir.path().join("markdown_docs/pkg/mod.md")).unwrap();
        assert!(rendered.contains("Doc is waiting to be generated..."));
    }

    #[test]
    fn refresh_wipes_stale_files() {
        let meta = sample_meta();
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("markdown_docs/old.md");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "stale").unwrap();

        refresh(&meta, dir.path(), "markdown_docs", "py").unwrap();
        assert!(!stale.exists());
    }
}
