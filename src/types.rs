use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Semantic type tag of a JSON value.
///
/// Serializes as the lowercase name (`"object"`, `"boolean"`, ...) so callers
/// can forward it straight to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Object(_) => JsonKind::Object,
            Value::Array(_) => JsonKind::Array,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Object => "object",
            JsonKind::Array => "array",
        }
    }

    /// Objects and arrays can have children; everything else is a leaf.
    pub fn is_container(&self) -> bool {
        matches!(self, JsonKind::Object | JsonKind::Array)
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural facts about a parsed document.
///
/// `depth` and `node_count` are computed under the budgets passed to
/// [`parse`](crate::parse::parse) and saturate there; `kind` is absent when
/// parsing failed and there is no root value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralMetadata {
    /// Length of the original text in bytes.
    pub size_bytes: usize,
    /// Maximum nesting level reached (root = 0).
    pub depth: usize,
    /// Number of values visited, root and leaves included.
    pub node_count: usize,
    /// Type tag of the root value.
    #[serde(rename = "type")]
    pub kind: Option<JsonKind>,
    /// Parse succeeded and, under the strict option, the node budget held.
    pub is_valid: bool,
    /// Wall-clock time spent parsing and analyzing.
    pub parse_time_ms: u64,
}

impl StructuralMetadata {
    /// Best-effort metadata for a failed parse: everything zeroed except the
    /// input size and elapsed time, which are always known.
    pub(crate) fn failed(size_bytes: usize, parse_time_ms: u64) -> Self {
        StructuralMetadata {
            size_bytes,
            depth: 0,
            node_count: 0,
            kind: None,
            is_valid: false,
            parse_time_ms,
        }
    }
}

/// Outcome of one parse attempt.
///
/// A syntactically invalid input has no `value` and at least one entry in
/// `errors`. Limit overruns land in `warnings` and only become errors under
/// the strict option, in which case the value is still returned for callers
/// that want to inspect it anyway.
#[derive(Debug, Serialize)]
pub struct ParseResult {
    pub value: Option<Value>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: StructuralMetadata,
}

impl ParseResult {
    /// True when a value was produced and no error was recorded.
    pub fn is_ok(&self) -> bool {
        self.value.is_some() && self.errors.is_empty()
    }
}

/// Which check produced a search hit. A node whose key and value both match
/// contributes one hit per reason, at the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchReason {
    Key,
    Value,
}

/// One entry of a child listing or the payload of a visible row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    /// Canonical path of this node (`""` for the root).
    pub path: String,
    /// Object member key; `None` for array elements and the root.
    pub key: Option<String>,
    pub kind: JsonKind,
    pub has_children: bool,
    pub child_count: usize,
    /// Short display text: scalars (possibly truncated) or a container
    /// summary like `{…} 3 keys`.
    pub preview: String,
}

/// One entry of the bounded pre-order traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum TreeRow {
    Node {
        #[serde(flatten)]
        node: TreeNode,
        depth: usize,
        expanded: bool,
    },
    /// Terminal marker: the node budget was exhausted with nodes remaining.
    LimitReached,
}

impl TreeRow {
    pub fn is_limit_marker(&self) -> bool {
        matches!(self, TreeRow::LimitReached)
    }

    pub fn node(&self) -> Option<&TreeNode> {
        match self {
            TreeRow::Node { node, .. } => Some(node),
            TreeRow::LimitReached => None,
        }
    }
}

/// Owned summary of a search hit, kept by [`ExplorerState`](crate::state::ExplorerState)
/// for cursor navigation after the borrowed hits are gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRecord {
    /// Canonical path of the matching node.
    pub path: String,
    pub kind: JsonKind,
    pub reason: MatchReason,
    /// The text that matched: the key, or the scalar's string form.
    pub matched: String,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<HitRecord>,
    pub total_count: usize,
    pub has_more: bool,
}
