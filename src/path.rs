use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One step of a canonical path: an object member or an array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

// Characters that force a key into the bracket-quoted form. A bare key would
// collide with the path grammar itself.
const KEY_DELIMITERS: [char; 5] = ['.', '[', ']', '"', '\\'];

fn key_needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(KEY_DELIMITERS)
}

impl PathSegment {
    fn render_into(&self, out: &mut String, first: bool) {
        match self {
            PathSegment::Key(key) if key_needs_quoting(key) => {
                out.push_str("[\"");
                for ch in key.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push_str("\"]");
            }
            PathSegment::Key(key) => {
                if !first {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
}

/// Error produced when a path string does not follow the canonical grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path segment at byte {0}")]
    EmptySegment(usize),
    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },
    #[error("unterminated bracket segment starting at byte {0}")]
    UnterminatedBracket(usize),
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
    #[error("array index too large at byte {0}")]
    IndexOutOfRange(usize),
}

/// Canonical address of a position inside a value graph.
///
/// Object members render as `.key` (the leading dot is omitted for the first
/// segment), array elements as `[i]`, and the root as the empty string, so
/// the number `2` in `{"a":[1,{"b":2}]}` lives at `a[1].b`. Keys containing
/// any of `.`, `[`, `]`, `"`, `\` (or the empty key) render bracket-quoted,
/// e.g. `["a.b"]`, with `\`-escaped quotes and backslashes; [`Path::parse`]
/// accepts both forms, so every rendering round-trips.
///
/// Paths are derived and stateless: they are only meaningful against the
/// parse that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Path::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Child path addressing the object member `key`.
    pub fn key(&self, key: impl Into<String>) -> Path {
        let mut child = self.clone();
        child.segments.push(PathSegment::Key(key.into()));
        child
    }

    /// Child path addressing the array element at `index`.
    pub fn index(&self, index: usize) -> Path {
        let mut child = self.clone();
        child.segments.push(PathSegment::Index(index));
        child
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// Canonical string form. The root renders as `""`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            segment.render_into(&mut out, i == 0);
        }
        out
    }

    /// Parse a canonical path string back into segments.
    pub fn parse(text: &str) -> Result<Path, PathError> {
        let mut segments = Vec::new();
        let mut chars = text.char_indices().peekable();
        let mut first = true;
        while let Some(&(pos, ch)) = chars.peek() {
            match ch {
                '[' => {
                    chars.next();
                    segments.push(parse_bracket_segment(&mut chars, pos)?);
                }
                '.' if !first => {
                    chars.next();
                    segments.push(parse_bare_key(&mut chars, pos + ch.len_utf8())?);
                }
                '.' | ']' => return Err(PathError::UnexpectedCharacter { ch, pos }),
                _ if first => segments.push(parse_bare_key(&mut chars, pos)?),
                _ => return Err(PathError::UnexpectedCharacter { ch, pos }),
            }
            first = false;
        }
        Ok(Path { segments })
    }

    /// Walk the graph along this path. `None` when any step is missing or
    /// hits a value of the wrong shape.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(key) => match current {
                    Value::Object(map) => map.get(key)?,
                    _ => return None,
                },
                PathSegment::Index(index) => match current {
                    Value::Array(items) => items.get(*index)?,
                    _ => return None,
                },
            };
        }
        Some(current)
    }

    /// Renderings of every growing prefix, from the first segment through
    /// the full path. Empty for the root. This is what expansion-state
    /// bookkeeping consumes, so it must stay in lockstep with [`render`].
    ///
    /// [`render`]: Path::render
    pub fn prefix_renderings(&self) -> Vec<String> {
        let mut prefixes = Vec::with_capacity(self.segments.len());
        let mut acc = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            segment.render_into(&mut acc, i == 0);
            prefixes.push(acc.clone());
        }
        prefixes
    }
}

fn parse_bare_key(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<PathSegment, PathError> {
    let mut key = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch == '.' || ch == '[' || ch == ']' {
            break;
        }
        key.push(ch);
        chars.next();
    }
    if key.is_empty() {
        return Err(PathError::EmptySegment(start));
    }
    Ok(PathSegment::Key(key))
}

// Called with the opening '[' already consumed; `start` is its byte offset.
fn parse_bracket_segment(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<PathSegment, PathError> {
    match chars.peek().copied() {
        Some((_, '"')) => {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some((pos, '\\')) => match chars.next() {
                        Some((_, escaped @ ('"' | '\\'))) => key.push(escaped),
                        _ => return Err(PathError::InvalidEscape(pos)),
                    },
                    Some((_, '"')) => break,
                    Some((_, ch)) => key.push(ch),
                    None => return Err(PathError::UnterminatedBracket(start)),
                }
            }
            match chars.next() {
                Some((_, ']')) => Ok(PathSegment::Key(key)),
                Some((pos, ch)) => Err(PathError::UnexpectedCharacter { ch, pos }),
                None => Err(PathError::UnterminatedBracket(start)),
            }
        }
        Some((_, ch)) if ch.is_ascii_digit() => {
            let mut digits = String::new();
            while let Some(&(_, ch)) = chars.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                digits.push(ch);
                chars.next();
            }
            match chars.next() {
                Some((_, ']')) => digits
                    .parse::<usize>()
                    .map(PathSegment::Index)
                    .map_err(|_| PathError::IndexOutOfRange(start)),
                Some((pos, ch)) => Err(PathError::UnexpectedCharacter { ch, pos }),
                None => Err(PathError::UnterminatedBracket(start)),
            }
        }
        Some((pos, ']')) => Err(PathError::EmptySegment(pos)),
        Some((pos, ch)) => Err(PathError::UnexpectedCharacter { ch, pos }),
        None => Err(PathError::UnterminatedBracket(start)),
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Path::parse(text)
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path { segments }
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
