//! Symbol-tree preparation for the documentation pipeline.
//!
//! This crate owns the hierarchical symbol model and everything that reads
//! or writes it outside of generation proper:
//! - [`model`]: typed nodes ([`model::item::DocItem`]) and the serialized
//!   symbol records the parser emits and the snapshot persists.
//! - [`tree`]: the arena-backed repository tree with build, traversal, and
//!   naming rules.
//! - [`meta`]: the per-run container ([`meta::MetaInfo`]).
//! - [`snapshot`]: checkpoint/load of `project_hierarchy.json` and its
//!   `meta-info.json` sidecar.
//! - [`transfer`]: incremental change detection against the previous
//!   snapshot.
//! - [`traits`]: seams for the external parser and reference resolver.

pub mod errors;
pub mod meta;
pub mod model;
pub mod snapshot;
pub mod transfer;
pub mod traits;
pub mod tree;

pub use errors::{Error, TreeResult};
pub use meta::MetaInfo;
pub use model::item::{DocItem, DocItemKind, DocItemStatus, ItemId};
pub use model::record::{SymbolKindTag, SymbolRecord, WhitelistEntry};
pub use traits::{RefHit, ReferenceResolver, SourceParser};
pub use tree::DocTree;
