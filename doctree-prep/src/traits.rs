//! Seams for the external analysis collaborators.
//!
//! The pipeline drives a language parser and a cross-reference resolver it
//! does not implement. Both are deterministic, synchronous, and only used
//! during the single-threaded analysis phase, so plain traits with static
//! dispatch are enough.

use crate::model::record::SymbolRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extracts the documentable symbols of one source file.
///
/// Implementations must be deterministic: identical source text yields the
/// same records in the same order (emission order drives sibling
/// de-duplication).
pub trait SourceParser {
    fn functions_and_classes(&self, source: &str) -> Vec<SymbolRecord>;
}

/// One reference site reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefHit {
    /// Repo-relative path of the file containing the reference.
    pub file_path: String,
    /// 1-based line of the reference.
    pub line: i64,
    /// 0-based column of the reference.
    pub column: i64,
}

/// Cross-reference resolver: all sites referring to the symbol defined at
/// `(file_path, line, column)`. Stable under identical inputs and
/// filesystem state.
pub trait ReferenceResolver {
    fn references(
        &self,
        repo_root: &Path,
        symbol_name: &str,
        file_path: &str,
        line: i64,
        column: i64,
        in_file_only: bool,
    ) -> Result<Vec<RefHit>, String>;
}
