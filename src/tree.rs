use std::collections::HashSet;

use serde_json::Value;

use crate::path::{Path, PathSegment};
use crate::types::{JsonKind, TreeNode, TreeRow};

/// Longest string preview, in characters.
pub const PREVIEW_LIMIT: usize = 120;

/// Shorten `s` to at most `max` characters, appending an ellipsis when cut.
/// Cuts on character boundaries, never mid code point.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s.to_string(),
    }
}

/// One-line rendering of a value for tree rows and search results.
pub fn preview(value: &Value, truncate_limit: Option<usize>) -> String {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                "{} 0 keys".to_string()
            } else {
                format!("{{…}} {} keys", map.len())
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                "[] 0 items".to_string()
            } else {
                format!("[…] {} items", items.len())
            }
        }
        Value::String(s) => match truncate_limit {
            Some(limit) => truncate(s, limit),
            None => s.to_string(),
        },
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

fn make_node(path: String, key: Option<String>, value: &Value) -> TreeNode {
    let child_count = match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    };
    TreeNode {
        path,
        key,
        kind: JsonKind::of(value),
        has_children: child_count > 0,
        child_count,
        preview: preview(value, Some(PREVIEW_LIMIT)),
    }
}

/// Describe the node at `path`, or `None` when the path does not resolve.
pub fn node_at(root: &Value, path: &Path) -> Option<TreeNode> {
    let value = path.resolve(root)?;
    let key = path.segments().last().and_then(|segment| match segment {
        PathSegment::Key(k) => Some(k.clone()),
        PathSegment::Index(_) => None,
    });
    Some(make_node(path.render(), key, value))
}

/// One page of a container's immediate children.
///
/// Children are produced in document order, `offset`/`limit` select the
/// page. A path that does not resolve, or resolves to a scalar, yields an
/// empty page.
pub fn list_children(root: &Value, path: &Path, offset: usize, limit: usize) -> Vec<TreeNode> {
    let Some(target) = path.resolve(root) else {
        return Vec::new();
    };
    let mut child_path = path.clone();
    match target {
        Value::Object(map) => map
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(key, member)| {
                child_path.push(PathSegment::Key(key.clone()));
                let node = make_node(child_path.render(), Some(key.clone()), member);
                child_path.pop();
                node
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .skip(offset)
            .take(limit)
            .map(|(index, item)| {
                child_path.push(PathSegment::Index(index));
                let node = make_node(child_path.render(), None, item);
                child_path.pop();
                node
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Flatten the document into the rows a tree view would display, honoring
/// the expansion set and a shared row budget.
///
/// The root is always expanded; any other composite contributes its children
/// only when its rendered path is in `expanded`. A collapsed composite costs
/// a single row no matter how large its subtree is. Once `max_nodes` rows
/// have been produced, a terminal [`TreeRow::LimitReached`] marker replaces
/// whatever remains.
pub fn visible_rows(root: &Value, expanded: &HashSet<String>, max_nodes: usize) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let mut visited = 0usize;
    let mut path = Path::root();
    push_rows(
        root, &mut path, None, 0, expanded, max_nodes, &mut visited, &mut rows,
    );
    rows
}

/// Emits the row for `value` and, when expanded, its children. Returns
/// `false` once the budget is spent and the marker has been written, which
/// aborts every enclosing loop.
#[allow(clippy::too_many_arguments)]
fn push_rows(
    value: &Value,
    path: &mut Path,
    key: Option<&str>,
    depth: usize,
    expanded: &HashSet<String>,
    max_nodes: usize,
    visited: &mut usize,
    rows: &mut Vec<TreeRow>,
) -> bool {
    if *visited >= max_nodes {
        rows.push(TreeRow::LimitReached);
        return false;
    }
    *visited += 1;

    let rendered = path.render();
    let is_expanded = match value {
        Value::Object(_) | Value::Array(_) => path.is_root() || expanded.contains(&rendered),
        _ => false,
    };
    rows.push(TreeRow::Node {
        node: make_node(rendered, key.map(str::to_string), value),
        depth,
        expanded: is_expanded,
    });
    if !is_expanded {
        return true;
    }

    match value {
        Value::Object(map) => {
            for (child_key, member) in map {
                path.push(PathSegment::Key(child_key.clone()));
                let keep_going = push_rows(
                    member,
                    path,
                    Some(child_key),
                    depth + 1,
                    expanded,
                    max_nodes,
                    visited,
                    rows,
                );
                path.pop();
                if !keep_going {
                    return false;
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                let keep_going = push_rows(
                    item, path, None, depth + 1, expanded, max_nodes, visited, rows,
                );
                path.pop();
                if !keep_going {
                    return false;
                }
            }
        }
        _ => {}
    }
    true
}
