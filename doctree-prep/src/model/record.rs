//! Serialized symbol records: the parser's output and the snapshot's
//! on-disk row format.
//!
//! The same struct serves both roles. Parser emissions leave the
//! documentation fields at their defaults; checkpointing fills them in, and
//! `flash_references` additionally writes the resolved edge lists as
//! qualified names. Avoid renaming the JSON keys; they are part of the
//! `project_hierarchy.json` format.

use crate::model::item::DocItemStatus;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Parser-level classification of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKindTag {
    ClassDef,
    FunctionDef,
}

impl Display for SymbolKindTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKindTag::ClassDef => f.write_str("ClassDef"),
            SymbolKindTag::FunctionDef => f.write_str("FunctionDef"),
        }
    }
}

/// One symbol as the external parser reports it, plus the documentation
/// state the snapshot store persists alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SymbolKindTag,
    pub code_start_line: i64,
    pub code_end_line: i64,
    /// Column of the symbol's name on its definition line (resolver input).
    pub name_column: i64,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub have_return: bool,
    #[serde(default)]
    pub code_content: String,

    #[serde(default)]
    pub md_content: Vec<String>,
    #[serde(default)]
    pub item_status: DocItemStatus,

    /// Qualified names this symbol references; written when the checkpoint
    /// is taken with `flash_references`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_who: Option<Vec<String>>,
    /// Qualified names referencing this symbol (mirror of `reference_who`;
    /// derived on load, never trusted over the forward edges).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_reference_me: Option<Vec<String>>,
    /// Parallel to `reference_who`: signature-level reference flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_reference_type: Option<Vec<bool>>,
}

impl SymbolRecord {
    /// A bare parser emission with documentation fields at defaults.
    pub fn parsed(
        kind: SymbolKindTag,
        name: impl Into<String>,
        code_start_line: i64,
        code_end_line: i64,
        name_column: i64,
        params: Vec<String>,
        have_return: bool,
        code_content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            code_start_line,
            code_end_line,
            name_column,
            params,
            have_return,
            code_content: code_content.into(),
            md_content: Vec::new(),
            item_status: DocItemStatus::NotGenerated,
            reference_who: None,
            who_reference_me: None,
            special_reference_type: None,
        }
    }
}

/// One whitelist row: restricts generation to `id_text` symbols of
/// `file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub file_path: String,
    pub id_text: String,
}
