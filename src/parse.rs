use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

use crate::analyze::analyze;
use crate::types::{ParseResult, StructuralMetadata};

/// Default nesting ceiling; past this the analyzer stops descending.
pub const DEFAULT_MAX_DEPTH: usize = 100;
/// Default node budget; past this the analyzer stops counting.
pub const DEFAULT_MAX_NODES: usize = 10_000;

/// Limit policy for one parse call.
///
/// Serializable so a gating layer can persist per-tier budgets and hand them
/// in unchanged. Budget overruns are warnings unless `strict` is set, in
/// which case a spent node budget invalidates the document. Depth overruns
/// never invalidate, they only warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            strict: false,
        }
    }
}

/// Parse `text` into a value graph and analyze it under `options`.
///
/// All problems are collected into the returned [`ParseResult`] rather than
/// raised: syntax errors yield no value and at least one error string; limit
/// overruns keep the value and add warnings (an error too, under strict).
/// The analyzer caps its counters at the budgets, so "over budget" is
/// observed as a saturated counter: a document with exactly `max_nodes`
/// nodes is indistinguishable from a larger one and warns as well.
pub fn parse(text: &str, options: &ParseOptions) -> ParseResult {
    let started = Instant::now();
    let size_bytes = text.len();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return failed(
            size_bytes,
            started,
            "empty input: document contains no JSON value".to_string(),
        );
    }
    if let Err(reason) = check_document_shape(trimmed) {
        return failed(size_bytes, started, reason);
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return failed(size_bytes, started, format!("syntax error: {e}")),
    };

    let analysis = analyze(&value, options.max_depth, options.max_nodes);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    if analysis.depth >= options.max_depth {
        warnings.push(format!(
            "maximum depth exceeded: document nests to {} levels or more (limit {})",
            analysis.depth, options.max_depth
        ));
    }
    let mut is_valid = true;
    if analysis.node_count >= options.max_nodes {
        warnings.push(format!(
            "node budget exceeded: counted {} nodes or more (limit {})",
            analysis.node_count, options.max_nodes
        ));
        if options.strict {
            errors.push(format!(
                "document exceeds the strict node budget of {}",
                options.max_nodes
            ));
            is_valid = false;
        }
    }

    let parse_time_ms = elapsed_ms(started);
    debug!(
        size_bytes,
        node_count = analysis.node_count,
        depth = analysis.depth,
        kind = %analysis.kind,
        parse_time_ms,
        "parsed document"
    );

    ParseResult {
        value: Some(value),
        errors,
        warnings,
        metadata: StructuralMetadata {
            size_bytes,
            depth: analysis.depth,
            node_count: analysis.node_count,
            kind: Some(analysis.kind),
            is_valid,
            parse_time_ms,
        },
    }
}

fn failed(size_bytes: usize, started: Instant, error: String) -> ParseResult {
    let parse_time_ms = elapsed_ms(started);
    debug!(size_bytes, error = %error, "parse failed");
    ParseResult {
        value: None,
        errors: vec![error],
        warnings: Vec::new(),
        metadata: StructuralMetadata::failed(size_bytes, parse_time_ms),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// Fast-reject guard: the trimmed text's first and last characters must be
// consistent with some top-level JSON production. Not a substitute for the
// full parse behind it; it only bails out of obviously non-JSON payloads
// before materializing them.
fn check_document_shape(trimmed: &str) -> Result<(), String> {
    let (Some(first), Some(last)) = (trimmed.chars().next(), trimmed.chars().next_back()) else {
        return Ok(());
    };
    let problem = match first {
        '{' if last != '}' => Some("starts with '{' but does not end with '}'"),
        '[' if last != ']' => Some("starts with '[' but does not end with ']'"),
        '"' if last != '"' || trimmed.len() < 2 => {
            Some("starts with '\"' but does not end with '\"'")
        }
        't' | 'f' if last != 'e' => Some("looks like a literal but does not end with 'e'"),
        'n' if last != 'l' => Some("looks like null but does not end with 'l'"),
        '-' | '0'..='9' if !last.is_ascii_digit() => {
            Some("looks like a number but does not end with a digit")
        }
        '{' | '[' | '"' | 't' | 'f' | 'n' | '-' | '0'..='9' => None,
        other => {
            return Err(format!(
                "invalid document start {other:?}: expected an object, array, string, number, true, false or null"
            ))
        }
    };
    match problem {
        Some(detail) => Err(format!("malformed document: {detail}")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_matches_reference_decoder() {
        let text = r#"{"a": [1, {"b": 2}], "c": "x"}"#;
        let result = parse(text, &ParseOptions::default());
        assert!(result.errors.is_empty());
        assert_eq!(result.value, Some(serde_json::from_str(text).unwrap()));
        assert!(result.metadata.is_valid);
        assert_eq!(result.metadata.size_bytes, text.len());
        assert_eq!(result.metadata.kind, Some(crate::types::JsonKind::Object));
    }

    #[test]
    fn syntax_error_yields_no_value() {
        let result = parse(r#"{"a":}"#, &ParseOptions::default());
        assert!(result.value.is_none());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("syntax error:"), "{}", result.errors[0]);
        assert!(!result.metadata.is_valid);
        assert_eq!(result.metadata.node_count, 0);
    }

    #[test]
    fn empty_and_whitespace_input_fast_path() {
        for text in ["", "   ", "\n\t  \r\n"] {
            let result = parse(text, &ParseOptions::default());
            assert!(result.value.is_none());
            assert_eq!(result.errors, vec!["empty input: document contains no JSON value"]);
            assert_eq!(result.metadata.size_bytes, text.len());
        }
    }

    #[test]
    fn shape_guard_names_the_violation() {
        let result = parse("xyz", &ParseOptions::default());
        assert!(result.value.is_none());
        assert!(result.errors[0].contains("invalid document start 'x'"), "{}", result.errors[0]);

        let result = parse("{\"a\": 1", &ParseOptions::default());
        assert!(result.errors[0].contains("does not end with '}'"), "{}", result.errors[0]);
    }

    #[test]
    fn shape_guard_accepts_every_valid_top_level_production() {
        for text in [
            "{}", "[]", "\"s\"", "true", "false", "null", "0", "-1", "1.5", "1e5", "2E+10",
            "  {\"a\": 1}  ",
        ] {
            let result = parse(text, &ParseOptions::default());
            assert!(result.errors.is_empty(), "rejected {text:?}: {:?}", result.errors);
        }
    }

    #[test]
    fn guard_is_not_a_substitute_for_parsing() {
        // Consistent first/last characters, still invalid JSON.
        let result = parse("{\"a\" 1}", &ParseOptions::default());
        assert!(result.value.is_none());
        assert!(result.errors[0].starts_with("syntax error:"));
    }

    #[test]
    fn duplicate_keys_resolve_last_write_wins() {
        let result = parse(r#"{"a": 1, "a": 2}"#, &ParseOptions::default());
        assert_eq!(result.value, Some(json!({"a": 2})));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn object_member_order_is_preserved() {
        let result = parse(r#"{"z": 1, "a": 2, "m": 3}"#, &ParseOptions::default());
        let value = result.value.unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn node_budget_overrun_warns_but_stays_valid() {
        let options = ParseOptions { max_nodes: 3, ..ParseOptions::default() };
        let result = parse(r#"{"a": 1, "b": 2, "c": 3}"#, &options);
        assert!(result.value.is_some());
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("node budget exceeded"));
        assert!(result.metadata.is_valid);
        assert_eq!(result.metadata.node_count, 3);
    }

    #[test]
    fn strict_node_budget_overrun_is_an_error_with_value_kept() {
        let options = ParseOptions { max_nodes: 3, strict: true, ..ParseOptions::default() };
        let result = parse(r#"{"a": 1, "b": 2, "c": 3}"#, &options);
        assert!(result.value.is_some());
        assert_eq!(result.errors.len(), 1);
        assert!(!result.metadata.is_valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn depth_overrun_warns_even_under_strict() {
        let options = ParseOptions { max_depth: 2, strict: true, ..ParseOptions::default() };
        let result = parse(r#"{"a": {"b": {"c": 1}}}"#, &options);
        assert!(result.value.is_some());
        assert!(result.errors.is_empty(), "depth overruns never invalidate");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("maximum depth exceeded"));
        assert!(result.metadata.is_valid);
        assert_eq!(result.metadata.depth, 2);
    }

    #[test]
    fn within_budget_documents_produce_no_warnings() {
        let result = parse(r#"{"a": [1, 2, 3]}"#, &ParseOptions::default());
        assert!(result.warnings.is_empty());
        assert!(result.is_ok());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ParseOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(options.max_nodes, DEFAULT_MAX_NODES);
        assert!(options.strict);
    }
}
