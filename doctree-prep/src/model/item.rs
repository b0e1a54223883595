//! Node model for the hierarchical symbol tree.
//!
//! Nodes live in an arena (`DocTree`) and point at each other with
//! [`ItemId`] indices, so the cyclic reference graph never needs shared
//! ownership: the tree owns the nodes, the edges are plain integers.

use crate::model::record::SymbolRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Index of a node inside [`crate::tree::DocTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub usize);

/// Kind of a documentable node.
///
/// `Function` nested inside a `Class` is `ClassMethod`; nested inside a
/// `Function`/`SubFunction` it is `SubFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocItemKind {
    Repo,
    Dir,
    File,
    Class,
    ClassMethod,
    Function,
    SubFunction,
    GlobalVar,
}

impl DocItemKind {
    /// Symbol kinds carry parser payloads and get documentation generated.
    pub fn is_symbol(self) -> bool {
        matches!(
            self,
            DocItemKind::Class
                | DocItemKind::ClassMethod
                | DocItemKind::Function
                | DocItemKind::SubFunction
                | DocItemKind::GlobalVar
        )
    }

    /// Function-like kinds; signature-level references from these are
    /// treated as special during cycle breaking.
    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            DocItemKind::Function | DocItemKind::SubFunction | DocItemKind::ClassMethod
        )
    }

    /// Renderer-facing spelling: classes print as `ClassDef`, every
    /// function-shaped kind as `FunctionDef`, the rest by variant name.
    pub fn to_str(self) -> &'static str {
        match self {
            DocItemKind::Class => "ClassDef",
            DocItemKind::ClassMethod | DocItemKind::Function | DocItemKind::SubFunction => {
                "FunctionDef"
            }
            DocItemKind::Repo => "Repo",
            DocItemKind::Dir => "Dir",
            DocItemKind::File => "File",
            DocItemKind::GlobalVar => "GlobalVar",
        }
    }
}

impl Display for DocItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Documentation state of one node across revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocItemStatus {
    /// Docs exist and neither code nor reference context changed.
    UpToDate,
    /// Never generated, or generation failed and must be redone.
    #[default]
    NotGenerated,
    /// The symbol's own source changed since the last snapshot.
    CodeChanged,
    /// A new referrer appeared; docs may want to mention it.
    HasNewReferencer,
    /// A referrer went away.
    HasNoReferencer,
}

/// One node of the repository tree.
///
/// `name` is the de-duplicated sibling key (`handler`, `handler_0`, ...);
/// the parser's original spelling stays in `content.name`.
#[derive(Debug, Clone)]
pub struct DocItem {
    pub kind: DocItemKind,
    pub status: DocItemStatus,
    pub name: String,

    /// 1-based inclusive source range; `-1` for nodes that are not
    /// source-backed (repo, dirs, files).
    pub code_start_line: i64,
    pub code_end_line: i64,

    /// Append-only history of generated bodies; the last entry is current.
    pub md_content: Vec<String>,

    /// Parser payload; `None` for repo/dir/file nodes.
    pub content: Option<SymbolRecord>,

    pub children: BTreeMap<String, ItemId>,
    pub parent: Option<ItemId>,

    /// Longest path to a leaf, computed after tree build.
    pub depth: usize,
    /// Root-to-self path, computed after tree build.
    pub tree_path: Vec<ItemId>,

    pub references_from_this: Vec<ItemId>,
    pub references_to_this: Vec<ItemId>,
    /// Parallel to `references_from_this`: `true` when the reference line is
    /// the referrer's own definition line (signature-level reference).
    pub special_reference_flags: Vec<bool>,

    /// Transient planner state.
    pub has_task: bool,
    /// Planner-assigned id, `-1` when no task.
    pub task_id: i64,
}

impl DocItem {
    pub fn new(kind: DocItemKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            status: DocItemStatus::NotGenerated,
            name: name.into(),
            code_start_line: -1,
            code_end_line: -1,
            md_content: Vec::new(),
            content: None,
            children: BTreeMap::new(),
            parent: None,
            depth: 0,
            tree_path: Vec::new(),
            references_from_this: Vec::new(),
            references_to_this: Vec::new(),
            special_reference_flags: Vec::new(),
            has_task: false,
            task_id: -1,
        }
    }

    /// Latest generated body, if any.
    pub fn latest_doc(&self) -> Option<&str> {
        self.md_content.last().map(String::as_str)
    }

    /// True when the de-duplication pass renamed this node away from the
    /// parser's spelling.
    pub fn is_renamed_duplicate(&self) -> bool {
        match &self.content {
            Some(record) => record.name != self.name,
            None => false,
        }
    }
}
