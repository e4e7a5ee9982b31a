use serde::Serialize;
use serde_json::Value;

use crate::types::JsonKind;

/// Structural summary of one budgeted walk over a value graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Maximum nesting level reached before any short-circuit (root = 0).
    pub depth: usize,
    /// Values visited, root and leaves included, capped at the node budget.
    pub node_count: usize,
    /// Type tag of the root value.
    pub kind: JsonKind,
    /// Kept for callers feeding graphs from other sources. `serde_json`
    /// values are owned trees, so this walk can never observe a cycle and
    /// the flag is always `false` here.
    pub has_circular_references: bool,
}

// Walk state threaded through the recursion; mutating it is the walk's only
// side effect.
struct Walk {
    max_depth: usize,
    max_nodes: usize,
    depth: usize,
    node_count: usize,
}

impl Walk {
    fn budget_spent(&self) -> bool {
        self.node_count >= self.max_nodes
    }
}

/// Depth-first pre-order walk computing depth, node count and root type.
///
/// Counting stops as soon as `node_count` reaches `max_nodes` (remaining
/// siblings and subtrees are not visited), and the walk never descends past
/// `max_depth` levels, so both counters saturate at their budgets. Results
/// are deterministic for a given value and budgets: object members are
/// visited in insertion order, array elements in index order.
pub fn analyze(value: &Value, max_depth: usize, max_nodes: usize) -> Analysis {
    let mut walk = Walk {
        max_depth,
        max_nodes,
        depth: 0,
        node_count: 0,
    };
    visit(value, 0, &mut walk);
    Analysis {
        depth: walk.depth,
        node_count: walk.node_count,
        kind: JsonKind::of(value),
        has_circular_references: false,
    }
}

fn visit(value: &Value, level: usize, walk: &mut Walk) {
    if walk.budget_spent() {
        return;
    }
    walk.node_count += 1;
    if level > walk.depth {
        walk.depth = level;
    }
    if level >= walk.max_depth {
        return;
    }
    match value {
        Value::Object(map) => {
            for (_, member) in map {
                if walk.budget_spent() {
                    return;
                }
                visit(member, level + 1, walk);
            }
        }
        Value::Array(items) => {
            for item in items {
                if walk.budget_spent() {
                    return;
                }
                visit(item, level + 1, walk);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NO_LIMIT: usize = usize::MAX;

    #[test]
    fn scalar_root_is_one_node_at_depth_zero() {
        let analysis = analyze(&json!(42), NO_LIMIT, NO_LIMIT);
        assert_eq!(analysis.depth, 0);
        assert_eq!(analysis.node_count, 1);
        assert_eq!(analysis.kind, JsonKind::Number);
        assert!(!analysis.has_circular_references);
    }

    #[test]
    fn counts_every_node_including_leaves() {
        // root + "a" object + 2 members + array + 2 elements = 7
        let doc = json!({"a": {"x": 1, "y": 2}, "b": [true, null]});
        let analysis = analyze(&doc, NO_LIMIT, NO_LIMIT);
        assert_eq!(analysis.node_count, 7);
        assert_eq!(analysis.depth, 2);
        assert_eq!(analysis.kind, JsonKind::Object);
    }

    #[test]
    fn node_budget_short_circuits_mid_siblings() {
        let doc = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        let analysis = analyze(&doc, NO_LIMIT, 3);
        assert_eq!(analysis.node_count, 3);
        // Only root + two members were processed.
        assert_eq!(analysis.depth, 1);
    }

    #[test]
    fn depth_budget_stops_descent_not_counting() {
        // Chain of nested objects, 5 levels below the root.
        let doc = json!({"a": {"b": {"c": {"d": {"e": 1}}}}});
        let analysis = analyze(&doc, 2, NO_LIMIT);
        assert_eq!(analysis.depth, 2);
        // root, a, b were counted; the guard refuses to descend past level 2.
        assert_eq!(analysis.node_count, 3);
    }

    #[test]
    fn zero_node_budget_counts_nothing() {
        let analysis = analyze(&json!({"a": 1}), NO_LIMIT, 0);
        assert_eq!(analysis.node_count, 0);
        assert_eq!(analysis.depth, 0);
    }

    #[test]
    fn analysis_is_idempotent() {
        let doc = json!({"a": [1, {"b": [2, 3]}], "c": "x"});
        let first = analyze(&doc, 10, 100);
        let second = analyze(&doc, 10, 100);
        assert_eq!(first, second);
    }

    #[test]
    fn node_count_is_monotone_in_budget() {
        let doc = json!([[1, 2, 3], [4, 5, 6], {"a": 7}]);
        let mut previous = 0;
        for budget in 0..16 {
            let count = analyze(&doc, NO_LIMIT, budget).node_count;
            assert!(count >= previous);
            previous = count;
        }
        // Stable once the budget covers the whole graph.
        assert_eq!(previous, analyze(&doc, NO_LIMIT, NO_LIMIT).node_count);
    }

    #[test]
    fn exact_budget_reports_exact_count() {
        let doc = json!({"a": 1, "b": 2}); // 3 nodes
        assert_eq!(analyze(&doc, NO_LIMIT, 3).node_count, 3);
        assert_eq!(analyze(&doc, NO_LIMIT, 2).node_count, 2);
    }

    #[test]
    fn deep_nesting_terminates_under_budgets() {
        let mut doc = json!(1);
        for _ in 0..500 {
            doc = json!([doc]);
        }
        let analysis = analyze(&doc, 100, 10_000);
        assert_eq!(analysis.depth, 100);
        assert_eq!(analysis.node_count, 101);
        assert!(!analysis.has_circular_references);
    }
}
