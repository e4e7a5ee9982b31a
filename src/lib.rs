//! A JSON exploration engine: parse documents under depth and node budgets,
//! measure their shape, address individual nodes with human-readable paths,
//! search keys and values, and flatten the tree into a bounded list of
//! display rows.
//!
//! [`ExplorerState`] ties the pieces together behind a lock-protected facade
//! holding one document at a time. The underlying functions are exported for
//! callers that manage documents themselves.

pub mod analyze;
pub mod parse;
pub mod path;
pub mod search;
pub mod state;
pub mod tree;
pub mod types;

pub use analyze::{analyze, Analysis};
pub use parse::{parse, ParseOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};
pub use path::{Path, PathError, PathSegment};
pub use search::{expansion_paths, search, HitCursor, SearchHit, SearchNavigator, SearchOptions};
pub use state::{ExplorerError, ExplorerState, LoadReport};
pub use tree::{list_children, node_at, visible_rows};
pub use types::{
    HitRecord, JsonKind, MatchReason, ParseResult, SearchResponse, StructuralMetadata, TreeNode,
    TreeRow,
};
