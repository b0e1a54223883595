//! Arena-backed repository tree: construction from parser output and the
//! traversals every downstream stage leans on.
//!
//! The build runs in three passes: skeleton (dirs/files/symbols with
//! placeholder kinds), parent selection by tightest strictly-containing
//! line range, then a kind rewrite driven by `content.type` and the parent
//! kind. `parse_tree_path` and `calculate_depth` finish the job.

use crate::errors::{BuildError, TreeResult};
use crate::model::item::{DocItem, DocItemKind, DocItemStatus, ItemId};
use crate::model::record::{SymbolKindTag, SymbolRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// Owning arena for [`DocItem`] nodes. The node at index 0 is always the
/// `Repo` root.
#[derive(Debug, Clone)]
pub struct DocTree {
    items: Vec<DocItem>,
    root: ItemId,
}

impl DocTree {
    /// An empty tree holding only the `Repo` root.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = DocItem::new(DocItemKind::Repo, root_name);
        Self {
            items: vec![root],
            root: ItemId(0),
        }
    }

    /// Build the full tree from a flat `file path -> symbol records` map.
    ///
    /// Record order within a file is the parser's emission order and decides
    /// sibling de-duplication (`_0`, `_1`, ...). Two records with identical
    /// line ranges in one file are rejected: the containment rule cannot
    /// pick a parent for them.
    pub fn from_files(
        root_name: impl Into<String>,
        files: &BTreeMap<String, Vec<SymbolRecord>>,
    ) -> TreeResult<Self> {
        let mut tree = Self::new(root_name);

        for (file_path, records) in files {
            let mut seen_ranges = HashSet::new();
            for record in records {
                if !seen_ranges.insert((record.code_start_line, record.code_end_line)) {
                    return Err(BuildError::DuplicateRange {
                        file: file_path.clone(),
                        start: record.code_start_line,
                        end: record.code_end_line,
                    }
                    .into());
                }
            }

            let file_id = tree.ensure_file_node(file_path);

            // Skeleton nodes in emission order; parents attached below.
            let mut symbol_ids = Vec::with_capacity(records.len());
            for record in records {
                let mut item = DocItem::new(DocItemKind::ClassMethod, record.name.clone());
                item.code_start_line = record.code_start_line;
                item.code_end_line = record.code_end_line;
                item.md_content = record.md_content.clone();
                item.status = record.item_status;
                item.content = Some(record.clone());
                let id = ItemId(tree.items.len());
                tree.items.push(item);
                symbol_ids.push(id);
            }

            for (idx, record) in records.iter().enumerate() {
                let parent = tree
                    .tightest_container(records, idx)
                    .map(|j| symbol_ids[j])
                    .unwrap_or(file_id);
                tree.attach(parent, symbol_ids[idx]);
            }

            tree.rewrite_kinds(file_id);
        }

        tree.parse_tree_path();
        tree.calculate_depth();
        Ok(tree)
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> &DocItem {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: ItemId) -> &mut DocItem {
        &mut self.items[id.0]
    }

    /// Index of the record (within `records`) with the tightest range
    /// strictly containing record `idx`, if any. Equal ranges never qualify.
    fn tightest_container(&self, records: &[SymbolRecord], idx: usize) -> Option<usize> {
        let me = &records[idx];
        let mut best: Option<usize> = None;
        for (j, other) in records.iter().enumerate() {
            if j == idx {
                continue;
            }
            let contains = other.code_start_line <= me.code_start_line
                && me.code_end_line <= other.code_end_line
                && (other.code_start_line, other.code_end_line)
                    != (me.code_start_line, me.code_end_line);
            if !contains {
                continue;
            }
            best = match best {
                None => Some(j),
                Some(b) => {
                    let span = |r: &SymbolRecord| r.code_end_line - r.code_start_line;
                    if span(other) < span(&records[b]) {
                        Some(j)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        best
    }

    /// Create missing `Dir` nodes along `file_path` and the `File` leaf.
    fn ensure_file_node(&mut self, file_path: &str) -> ItemId {
        let mut now = self.root;
        let segments: Vec<&str> = file_path.split('/').filter(|s| !s.is_empty()).collect();
        for (pos, segment) in segments.iter().enumerate() {
            let is_last = pos + 1 == segments.len();
            if let Some(&existing) = self.items[now.0].children.get(*segment) {
                now = existing;
                continue;
            }
            let kind = if is_last {
                DocItemKind::File
            } else {
                DocItemKind::Dir
            };
            let child = DocItem::new(kind, *segment);
            let id = ItemId(self.items.len());
            self.items.push(child);
            self.attach(now, id);
            now = id;
        }
        now
    }

    /// Attach `child` under `parent`, renaming later arrivals on a sibling
    /// name collision (`name`, `name_0`, `name_1`, ...).
    fn attach(&mut self, parent: ItemId, child: ItemId) {
        let base = self.items[child.0].name.clone();
        let mut key = base.clone();
        let mut suffix = 0usize;
        while self.items[parent.0].children.contains_key(&key) {
            key = format!("{base}_{suffix}");
            suffix += 1;
        }
        if key != base {
            warn!(parent = %self.full_name(parent), name = %base, renamed = %key,
                "sibling name collision");
        }
        self.items[child.0].name = key.clone();
        self.items[child.0].parent = Some(parent);
        self.items[parent.0].children.insert(key, child);
    }

    /// Second pass: placeholder kinds become real ones once parents exist.
    fn rewrite_kinds(&mut self, file_id: ItemId) {
        for id in self.preorder_from(file_id) {
            if id == file_id {
                continue;
            }
            let tag = match &self.items[id.0].content {
                Some(record) => record.kind,
                None => continue,
            };
            let parent_kind = self.items[id.0]
                .parent
                .map(|p| self.items[p.0].kind)
                .unwrap_or(DocItemKind::File);
            self.items[id.0].kind = match tag {
                SymbolKindTag::ClassDef => DocItemKind::Class,
                SymbolKindTag::FunctionDef => match parent_kind {
                    DocItemKind::Class => DocItemKind::ClassMethod,
                    DocItemKind::Function | DocItemKind::SubFunction | DocItemKind::ClassMethod => {
                        DocItemKind::SubFunction
                    }
                    _ => DocItemKind::Function,
                },
            };
        }
    }

    /// Pre-order traversal of the whole tree.
    pub fn preorder(&self) -> Vec<ItemId> {
        self.preorder_from(self.root)
    }

    /// Pre-order traversal rooted at `start`.
    pub fn preorder_from(&self, start: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Reverse so the name-ordered children pop in order.
            for &child in self.items[id.0].children.values().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Every `File` node, in pre-order.
    pub fn all_files(&self) -> Vec<ItemId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.items[id.0].kind == DocItemKind::File)
            .collect()
    }

    /// Walk `segments` down from the root; `None` when a segment is missing.
    pub fn find(&self, segments: &[&str]) -> Option<ItemId> {
        let mut now = self.root;
        for segment in segments {
            now = *self.items[now.0].children.get(*segment)?;
        }
        Some(now)
    }

    /// Qualified name: `/`-joined path from (but excluding) the root.
    pub fn full_name(&self, id: ItemId) -> String {
        self.full_name_with(id, false)
    }

    /// Strict qualified name: renamed duplicates carry a
    /// `(name_duplicate_version)` marker so reruns match deterministically.
    pub fn full_name_strict(&self, id: ItemId) -> String {
        self.full_name_with(id, true)
    }

    fn full_name_with(&self, id: ItemId, strict: bool) -> String {
        if id == self.root {
            return self.items[id.0].name.clone();
        }
        let mut segments = Vec::new();
        let mut now = Some(id);
        while let Some(current) = now {
            if current == self.root {
                break;
            }
            let item = &self.items[current.0];
            let mut segment = item.name.clone();
            if strict && item.is_renamed_duplicate() {
                segment.push_str("(name_duplicate_version)");
            }
            segments.push(segment);
            now = item.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Qualified name truncated at the first `.{ext}` boundary and
    /// re-suffixed, yielding the enclosing file's path for symbol nodes.
    pub fn file_name(&self, id: ItemId, ext: &str) -> String {
        let full = self.full_name(id);
        let suffix = format!(".{ext}");
        match full.split(&suffix as &str).next() {
            Some(prefix) => format!("{prefix}{suffix}"),
            None => full,
        }
    }

    /// Fill `tree_path` for every node (root-to-self id sequences).
    pub fn parse_tree_path(&mut self) {
        let mut path = Vec::new();
        self.parse_tree_path_inner(self.root, &mut path);
    }

    fn parse_tree_path_inner(&mut self, id: ItemId, path: &mut Vec<ItemId>) {
        path.push(id);
        self.items[id.0].tree_path = path.clone();
        let children: Vec<ItemId> = self.items[id.0].children.values().copied().collect();
        for child in children {
            self.parse_tree_path_inner(child, path);
        }
        path.pop();
    }

    /// Fill `depth` for every node: leaves are 0, inner nodes the longest
    /// path to a leaf below them.
    pub fn calculate_depth(&mut self) {
        self.depth_of(self.root);
    }

    fn depth_of(&mut self, id: ItemId) -> usize {
        let children: Vec<ItemId> = self.items[id.0].children.values().copied().collect();
        let depth = if children.is_empty() {
            0
        } else {
            children
                .into_iter()
                .map(|c| self.depth_of(c))
                .max()
                .unwrap_or(0)
                + 1
        };
        self.items[id.0].depth = depth;
        depth
    }

    /// If one node lies on the other's root path, return the ancestor.
    pub fn check_and_return_ancestor(&self, a: ItemId, b: ItemId) -> Option<ItemId> {
        if self.items[b.0].tree_path.contains(&a) {
            Some(a)
        } else if self.items[a.0].tree_path.contains(&b) {
            Some(b)
        } else {
            None
        }
    }

    /// Descend from `file_id` into the tightest symbol whose range contains
    /// `line`; the file node itself when no symbol does.
    pub fn find_symbol_at_line(&self, file_id: ItemId, line: i64) -> ItemId {
        let mut now = file_id;
        loop {
            let next = self.items[now.0].children.values().copied().find(|&c| {
                let child = &self.items[c.0];
                child.code_start_line <= line && line <= child.code_end_line
            });
            match next {
                Some(child) => now = child,
                None => return now,
            }
        }
    }

    /// `strict` qualified name -> id for every node below the root.
    pub fn strict_name_index(&self) -> HashMap<String, ItemId> {
        self.preorder()
            .into_iter()
            .filter(|&id| id != self.root)
            .map(|id| (self.full_name_strict(id), id))
            .collect()
    }

    /// Nearest `File` node on the root path: the node itself when it is a
    /// file, otherwise the closest ancestor file.
    pub fn enclosing_file(&self, id: ItemId) -> Option<ItemId> {
        let mut now = Some(id);
        while let Some(current) = now {
            if self.items[current.0].kind == DocItemKind::File {
                return Some(current);
            }
            now = self.items[current.0].parent;
        }
        None
    }

    /// Whether `id` is due for (re)generation: not up to date, a symbol
    /// kind, inside a file, and not under an ignored path prefix.
    pub fn needs_doc(&self, id: ItemId, ignore_list: &[String]) -> bool {
        let item = &self.items[id.0];
        if item.status == DocItemStatus::UpToDate || !item.kind.is_symbol() {
            return false;
        }
        let full_name = self.full_name(id);
        let mut now = item.parent;
        while let Some(current) = now {
            if self.items[current.0].kind == DocItemKind::File {
                return !ignore_list
                    .iter()
                    .any(|prefix| full_name.starts_with(prefix.as_str()));
            }
            now = self.items[current.0].parent;
        }
        false
    }

    /// Insert a bidirectional reference edge; no-op when already present.
    pub fn add_reference(&mut self, from: ItemId, to: ItemId, special: bool) -> bool {
        if self.items[from.0].references_from_this.contains(&to) {
            return false;
        }
        self.items[from.0].references_from_this.push(to);
        self.items[from.0].special_reference_flags.push(special);
        self.items[to.0].references_to_this.push(from);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::SymbolKindTag;

    fn record(name: &str, start: i64, end: i64) -> SymbolRecord {
        SymbolRecord::parsed(SymbolKindTag::FunctionDef, name, start, end, 4, vec![], false, "")
    }

    fn class(name: &str, start: i64, end: i64) -> SymbolRecord {
        SymbolRecord::parsed(SymbolKindTag::ClassDef, name, start, end, 6, vec![], false, "")
    }

    fn one_file(records: Vec<SymbolRecord>) -> BTreeMap<String, Vec<SymbolRecord>> {
        let mut files = BTreeMap::new();
        files.insert("pkg/mod.py".to_string(), records);
        files
    }

    #[test]
    fn builds_dirs_files_and_symbols() {
        let tree = DocTree::from_files("repo", &one_file(vec![record("f", 1, 3)])).unwrap();
        let file = tree.find(&["pkg", "mod.py"]).unwrap();
        assert_eq!(tree.get(file).kind, DocItemKind::File);
        let f = tree.find(&["pkg", "mod.py", "f"]).unwrap();
        assert_eq!(tree.get(f).kind, DocItemKind::Function);
        assert_eq!(tree.full_name(f), "pkg/mod.py/f");
        assert_eq!(tree.get(tree.find(&["pkg"]).unwrap()).kind, DocItemKind::Dir);
    }

    #[test]
    fn tightest_container_wins() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![
                class("Outer", 1, 20),
                record("method", 2, 10),
                record("inner", 3, 6),
            ]),
        )
        .unwrap();
        let inner = tree.find(&["pkg", "mod.py", "Outer", "method", "inner"]).unwrap();
        assert_eq!(tree.get(inner).kind, DocItemKind::SubFunction);
        let method = tree.get(inner).parent.unwrap();
        assert_eq!(tree.get(method).kind, DocItemKind::ClassMethod);
    }

    #[test]
    fn identical_ranges_are_rejected() {
        let err = DocTree::from_files(
            "repo",
            &one_file(vec![record("a", 1, 5), record("b", 1, 5)]),
        );
        assert!(err.is_err());
    }

    #[test]
    fn sibling_collision_renames_later_arrival() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![record("handler", 1, 3), record("handler", 5, 8)]),
        )
        .unwrap();
        let first = tree.find(&["pkg", "mod.py", "handler"]).unwrap();
        let second = tree.find(&["pkg", "mod.py", "handler_0"]).unwrap();
        assert_eq!(tree.full_name_strict(first), "pkg/mod.py/handler");
        assert_eq!(
            tree.full_name_strict(second),
            "pkg/mod.py/handler_0(name_duplicate_version)"
        );
    }

    #[test]
    fn strict_names_are_unique() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![
                record("handler", 1, 3),
                record("handler", 5, 8),
                record("other", 10, 12),
            ]),
        )
        .unwrap();
        let names: Vec<String> = tree
            .preorder()
            .into_iter()
            .filter(|&id| id != tree.root())
            .map(|id| tree.full_name_strict(id))
            .collect();
        let unique: std::collections::HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn depth_and_tree_path() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![class("Outer", 1, 20), record("method", 2, 10)]),
        )
        .unwrap();
        let root = tree.root();
        let method = tree.find(&["pkg", "mod.py", "Outer", "method"]).unwrap();
        assert_eq!(tree.get(method).depth, 0);
        assert_eq!(tree.get(root).depth, 4);
        let path = &tree.get(method).tree_path;
        assert_eq!(path[0], root);
        assert_eq!(*path.last().unwrap(), method);
        for pair in path.windows(2) {
            assert_eq!(tree.get(pair[1]).parent, Some(pair[0]));
        }
    }

    #[test]
    fn ancestor_check() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![class("Outer", 1, 20), record("method", 2, 10), record("free", 25, 30)]),
        )
        .unwrap();
        let outer = tree.find(&["pkg", "mod.py", "Outer"]).unwrap();
        let method = tree.find(&["pkg", "mod.py", "Outer", "method"]).unwrap();
        let free = tree.find(&["pkg", "mod.py", "free"]).unwrap();
        assert_eq!(tree.check_and_return_ancestor(outer, method), Some(outer));
        assert_eq!(tree.check_and_return_ancestor(method, outer), Some(outer));
        assert_eq!(tree.check_and_return_ancestor(method, free), None);
    }

    #[test]
    fn symbol_lookup_by_line() {
        let tree = DocTree::from_files(
            "repo",
            &one_file(vec![class("Outer", 1, 20), record("method", 2, 10)]),
        )
        .unwrap();
        let file = tree.find(&["pkg", "mod.py"]).unwrap();
        let method = tree.find(&["pkg", "mod.py", "Outer", "method"]).unwrap();
        let outer = tree.find(&["pkg", "mod.py", "Outer"]).unwrap();
        assert_eq!(tree.find_symbol_at_line(file, 5), method);
        assert_eq!(tree.find_symbol_at_line(file, 15), outer);
        assert_eq!(tree.find_symbol_at_line(file, 42), file);
    }

    #[test]
    fn file_name_truncates_at_extension() {
        let tree = DocTree::from_files("repo", &one_file(vec![record("f", 1, 3)])).unwrap();
        let f = tree.find(&["pkg", "mod.py", "f"]).unwrap();
        assert_eq!(tree.file_name(f, "py"), "pkg/mod.py");
    }

    #[test]
    fn needs_doc_respects_ignore_list() {
        let tree = DocTree::from_files("repo", &one_file(vec![record("f", 1, 3)])).unwrap();
        let f = tree.find(&["pkg", "mod.py", "f"]).unwrap();
        assert!(tree.needs_doc(f, &[]));
        assert!(!tree.needs_doc(f, &["pkg/".to_string()]));
        let file = tree.find(&["pkg", "mod.py"]).unwrap();
        assert!(!tree.needs_doc(file, &[]));
    }
}
