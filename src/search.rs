use std::borrow::Cow;
use std::collections::HashSet;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::path::{Path, PathSegment};
use crate::types::{JsonKind, MatchReason};

/// Flags controlling how query text is compared against keys and values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Compare without case folding.
    pub case_sensitive: bool,
    /// Match only complete alphanumeric words.
    pub whole_word: bool,
    /// Interpret the query as a regular expression. A pattern that fails to
    /// compile falls back to plain substring matching.
    pub regex: bool,
}

/// A single match found while scanning a document.
///
/// Borrows the matched value from the scanned document, so hits cannot
/// outlive the scan's input.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit<'a> {
    pub path: Path,
    pub value: &'a Value,
    pub kind: JsonKind,
    pub reason: MatchReason,
    /// The text that satisfied the query: the key itself for key matches,
    /// the scalar's rendering for value matches.
    pub matched: String,
}

impl From<&SearchHit<'_>> for crate::types::HitRecord {
    fn from(hit: &SearchHit<'_>) -> Self {
        crate::types::HitRecord {
            path: hit.path.render(),
            kind: hit.kind,
            reason: hit.reason,
            matched: hit.matched.clone(),
        }
    }
}

/// Query comparison strategy, compiled once per scan.
enum Matcher {
    Regex(regex::Regex),
    WholeWord { query: String, case_sensitive: bool },
    Substring { query: String, case_sensitive: bool },
}

impl Matcher {
    fn compile(query: &str, options: &SearchOptions) -> Matcher {
        if options.regex {
            let built = RegexBuilder::new(query)
                .case_insensitive(!options.case_sensitive)
                .build();
            match built {
                Ok(re) => return Matcher::Regex(re),
                Err(err) => {
                    debug!(query, %err, "invalid regex, falling back to plain matching");
                }
            }
        }
        let query = if options.case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        if options.whole_word {
            Matcher::WholeWord {
                query,
                case_sensitive: options.case_sensitive,
            }
        } else {
            Matcher::Substring {
                query,
                case_sensitive: options.case_sensitive,
            }
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(text),
            Matcher::WholeWord {
                query,
                case_sensitive,
            } => fold(text, *case_sensitive)
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == query),
            Matcher::Substring {
                query,
                case_sensitive,
            } => fold(text, *case_sensitive).contains(query.as_str()),
        }
    }
}

fn fold(text: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.to_lowercase())
    }
}

/// The text a scalar contributes to value matching. Composites contribute
/// nothing; their members are scanned individually.
fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(true) => Some(Cow::Borrowed("true")),
        Value::Bool(false) => Some(Cow::Borrowed("false")),
        Value::Null => Some(Cow::Borrowed("null")),
        Value::Object(_) | Value::Array(_) => None,
    }
}

/// Scan `root` in document order and collect every key and scalar value
/// matching `query`.
///
/// A key match is reported at the member's own path and carries the member's
/// value, so one member can appear twice: once for its key, once for its
/// value. An empty or all-whitespace query matches nothing.
pub fn search<'a>(root: &'a Value, query: &str, options: &SearchOptions) -> Vec<SearchHit<'a>> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let matcher = Matcher::compile(query, options);
    let mut hits = Vec::new();
    let mut path = Path::root();
    visit(root, &mut path, &matcher, &mut hits);
    debug!(query, hit_count = hits.len(), "search finished");
    hits
}

fn visit<'a>(value: &'a Value, path: &mut Path, matcher: &Matcher, hits: &mut Vec<SearchHit<'a>>) {
    if let Some(text) = scalar_text(value) {
        if matcher.matches(&text) {
            hits.push(SearchHit {
                path: path.clone(),
                value,
                kind: JsonKind::of(value),
                reason: MatchReason::Value,
                matched: text.into_owned(),
            });
        }
    }
    match value {
        Value::Object(map) => {
            for (key, member) in map {
                path.push(PathSegment::Key(key.clone()));
                if matcher.matches(key) {
                    hits.push(SearchHit {
                        path: path.clone(),
                        value: member,
                        kind: JsonKind::of(member),
                        reason: MatchReason::Key,
                        matched: key.clone(),
                    });
                }
                visit(member, path, matcher, hits);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                visit(item, path, matcher, hits);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Paths to mark expanded so every hit is visible in a collapsed-by-default
/// tree: every growing prefix of every hit path, the full path included,
/// root excluded. Entries for scalar positions are harmless since only
/// composites ever consult the set; a matching composite opens itself.
pub fn expansion_paths(hits: &[SearchHit<'_>]) -> HashSet<String> {
    let mut expanded = HashSet::new();
    for hit in hits {
        expanded.extend(hit.path.prefix_renderings());
    }
    expanded
}

/// Cyclic position over an ordered hit list. `None` means no selection,
/// the only possible state over an empty list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCursor {
    position: Option<usize>,
}

impl HitCursor {
    /// Cursor for a fresh result set: the first hit when there is one.
    pub fn start(len: usize) -> HitCursor {
        HitCursor {
            position: if len == 0 { None } else { Some(0) },
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Step forward, wrapping from the last hit to the first. No-op over an
    /// empty list.
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            self.position = None;
            return None;
        }
        let next = match self.position {
            Some(current) => (current + 1) % len,
            None => 0,
        };
        self.position = Some(next);
        self.position
    }

    /// Step backward, wrapping from the first hit to the last. No-op over an
    /// empty list.
    pub fn retreat(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            self.position = None;
            return None;
        }
        let previous = match self.position {
            Some(current) => (current + len - 1) % len,
            None => len - 1,
        };
        self.position = Some(previous);
        self.position
    }
}

/// Hit list plus cursor, for stepping through results one at a time.
pub struct SearchNavigator<'a> {
    hits: Vec<SearchHit<'a>>,
    cursor: HitCursor,
}

impl<'a> SearchNavigator<'a> {
    pub fn new(hits: Vec<SearchHit<'a>>) -> SearchNavigator<'a> {
        let cursor = HitCursor::start(hits.len());
        SearchNavigator { hits, cursor }
    }

    pub fn hits(&self) -> &[SearchHit<'a>] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor.position()
    }

    pub fn current(&self) -> Option<&SearchHit<'a>> {
        self.hits.get(self.cursor.position()?)
    }

    pub fn next_hit(&mut self) -> Option<&SearchHit<'a>> {
        self.cursor.advance(self.hits.len());
        self.current()
    }

    pub fn previous_hit(&mut self) -> Option<&SearchHit<'a>> {
        self.cursor.retreat(self.hits.len());
        self.current()
    }

    /// Prefixes to mark expanded so every hit is visible.
    pub fn expansion_paths(&self) -> HashSet<String> {
        expansion_paths(&self.hits)
    }

    pub fn into_hits(self) -> Vec<SearchHit<'a>> {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(hits: &[SearchHit<'_>]) -> Vec<String> {
        hits.iter().map(|h| h.path.render()).collect()
    }

    #[test]
    fn value_match_reports_scalar_path() {
        let doc = json!({"name": "Widget", "tags": ["red", "name-tag"]});
        let hits = search(&doc, "red", &SearchOptions::default());
        assert_eq!(paths(&hits), vec!["tags[0]"]);
        assert_eq!(hits[0].reason, MatchReason::Value);
        assert_eq!(hits[0].matched, "red");
        assert_eq!(hits[0].kind, JsonKind::String);
    }

    #[test]
    fn key_and_value_matches_are_distinct_hits() {
        let doc = json!({"name": "Widget", "tags": ["red", "name-tag"]});
        let hits = search(&doc, "name", &SearchOptions::default());
        assert_eq!(paths(&hits), vec!["name", "tags[1]"]);
        assert_eq!(hits[0].reason, MatchReason::Key);
        assert_eq!(hits[0].matched, "name");
        assert_eq!(hits[1].reason, MatchReason::Value);
        assert_eq!(hits[1].matched, "name-tag");
    }

    #[test]
    fn member_matching_by_key_and_value_appears_twice() {
        let doc = json!({"color": "color"});
        let hits = search(&doc, "color", &SearchOptions::default());
        assert_eq!(paths(&hits), vec!["color", "color"]);
        assert_eq!(hits[0].reason, MatchReason::Key);
        assert_eq!(hits[1].reason, MatchReason::Value);
    }

    #[test]
    fn key_hit_carries_the_member_value() {
        let doc = json!({"items": [1, 2]});
        let hits = search(&doc, "items", &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, JsonKind::Array);
        assert_eq!(hits[0].value, &json!([1, 2]));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let doc = json!({"a": 1});
        assert!(search(&doc, "", &SearchOptions::default()).is_empty());
        assert!(search(&doc, "   ", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_by_default() {
        let doc = json!({"Status": "ACTIVE"});
        let hits = search(&doc, "active", &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched, "ACTIVE");

        let options = SearchOptions {
            case_sensitive: true,
            ..Default::default()
        };
        assert!(search(&doc, "active", &options).is_empty());
    }

    #[test]
    fn whole_word_rejects_partial_words() {
        let doc = json!({"log": "restarted the cat process"});
        let options = SearchOptions {
            whole_word: true,
            ..Default::default()
        };
        let hits = search(&doc, "cat", &options);
        assert_eq!(hits.len(), 1);
        assert!(search(&doc, "restart", &options).is_empty());
    }

    #[test]
    fn regex_matches_scalar_renderings() {
        let doc = json!({"ids": [17, 170, 9]});
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let hits = search(&doc, "^17$", &options);
        assert_eq!(paths(&hits), vec!["ids[0]"]);
        assert_eq!(hits[0].matched, "17");
    }

    #[test]
    fn invalid_regex_falls_back_to_substring() {
        let doc = json!({"note": "an [unclosed bracket"});
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let hits = search(&doc, "[unclosed", &options);
        assert_eq!(paths(&hits), vec!["note"]);
    }

    #[test]
    fn null_and_booleans_match_their_literals() {
        let doc = json!({"a": null, "b": true, "c": "annulled"});
        let hits = search(&doc, "null", &SearchOptions::default());
        assert_eq!(paths(&hits), vec!["a", "c"]);
        let hits = search(&doc, "true", &SearchOptions::default());
        assert_eq!(paths(&hits), vec!["b"]);
    }

    #[test]
    fn composites_do_not_match_by_rendering() {
        let doc = json!({"a": {"true": 1}});
        let options = SearchOptions {
            whole_word: true,
            ..Default::default()
        };
        let hits = search(&doc, "true", &options);
        assert_eq!(paths(&hits), vec!["a.true"]);
        assert_eq!(hits[0].reason, MatchReason::Key);
    }

    #[test]
    fn hits_arrive_in_document_order() {
        let doc = json!({
            "first": "x",
            "nested": {"second": ["x", {"third": "x"}]},
            "last": "x"
        });
        let hits = search(&doc, "x", &SearchOptions::default());
        assert_eq!(
            paths(&hits),
            vec!["first", "nested.second[0]", "nested.second[1].third", "last"]
        );
    }

    #[test]
    fn root_scalar_is_searchable() {
        let doc = json!("lonely");
        let hits = search(&doc, "lonely", &SearchOptions::default());
        assert_eq!(paths(&hits), vec![""]);
        assert_eq!(hits[0].reason, MatchReason::Value);
    }

    #[test]
    fn navigator_wraps_in_both_directions() {
        let doc = json!(["x", "x", "x"]);
        let hits = search(&doc, "x", &SearchOptions::default());
        let mut nav = SearchNavigator::new(hits);
        assert_eq!(nav.position(), Some(0));
        assert_eq!(nav.next_hit().map(|h| h.path.render()), Some("[1]".into()));
        assert_eq!(nav.next_hit().map(|h| h.path.render()), Some("[2]".into()));
        assert_eq!(nav.next_hit().map(|h| h.path.render()), Some("[0]".into()));
        assert_eq!(
            nav.previous_hit().map(|h| h.path.render()),
            Some("[2]".into())
        );
    }

    #[test]
    fn empty_navigator_stays_unselected() {
        let mut nav = SearchNavigator::new(Vec::new());
        assert_eq!(nav.position(), None);
        assert!(nav.next_hit().is_none());
        assert!(nav.previous_hit().is_none());
        assert!(nav.current().is_none());
    }

    #[test]
    fn expansion_covers_every_hit_prefix() {
        let doc = json!({"a": [{"b": "x"}], "c": "x"});
        let hits = search(&doc, "x", &SearchOptions::default());
        let expanded = expansion_paths(&hits);
        let expected: HashSet<String> = ["a", "a[0]", "a[0].b", "c"]
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(expanded, expected);
        assert!(!expanded.contains(""));
    }

    #[test]
    fn matching_composite_expands_itself() {
        let doc = json!({"items": [1]});
        let hits = search(&doc, "items", &SearchOptions::default());
        let expanded = expansion_paths(&hits);
        assert!(expanded.contains("items"));
    }
}
