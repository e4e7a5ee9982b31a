use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::parse::{parse, ParseOptions};
use crate::path::{Path, PathError};
use crate::search::{expansion_paths, HitCursor, SearchOptions};
use crate::tree::{list_children, node_at, visible_rows};
use crate::types::{HitRecord, SearchResponse, StructuralMetadata, TreeNode, TreeRow};

/// Size of the children page returned with a fresh load.
pub const FIRST_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("no document loaded")]
    NoDocument,
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("path {0:?} does not resolve in the current document")]
    Unresolved(String),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

struct Loaded {
    value: Arc<Value>,
    metadata: StructuralMetadata,
    name: Option<String>,
}

struct ActiveSearch {
    query: String,
    records: Vec<HitRecord>,
    cursor: HitCursor,
}

/// Outcome of a load: parse diagnostics plus the first page of top-level
/// children, empty when nothing was stored.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub metadata: StructuralMetadata,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub children: Vec<TreeNode>,
}

/// The engine's shared state: at most one document, with the search results
/// and expansion set that belong to it.
///
/// All methods take `&self`; interior locks keep readers concurrent. Values
/// handed out are `Arc` clones or owned copies, never guard-backed
/// references, so no lock is held across caller code.
#[derive(Default)]
pub struct ExplorerState {
    doc: RwLock<Option<Loaded>>,
    search: RwLock<Option<ActiveSearch>>,
    expanded: RwLock<HashSet<String>>,
}

impl ExplorerState {
    pub fn new() -> ExplorerState {
        ExplorerState::default()
    }

    /// Parse `text` and make it the current document.
    ///
    /// Search results and the expansion set always reset, even when the
    /// parse fails; a failed load leaves the engine empty rather than
    /// keeping a document the diagnostics no longer describe.
    pub fn load(&self, text: &str, options: &ParseOptions) -> LoadReport {
        self.load_named(text, options, None)
    }

    pub fn load_named(
        &self,
        text: &str,
        options: &ParseOptions,
        name: Option<String>,
    ) -> LoadReport {
        let outcome = parse(text, options);

        *self.search.write() = None;
        self.expanded.write().clear();

        match outcome.value {
            Some(value) => {
                let value = Arc::new(value);
                let children = list_children(&value, &Path::root(), 0, FIRST_PAGE);
                info!(
                    name = name.as_deref().unwrap_or("<inline>"),
                    nodes = outcome.metadata.node_count,
                    "document loaded"
                );
                *self.doc.write() = Some(Loaded {
                    value,
                    metadata: outcome.metadata.clone(),
                    name,
                });
                LoadReport {
                    metadata: outcome.metadata,
                    errors: outcome.errors,
                    warnings: outcome.warnings,
                    children,
                }
            }
            None => {
                *self.doc.write() = None;
                debug!(error_count = outcome.errors.len(), "document rejected");
                LoadReport {
                    metadata: outcome.metadata,
                    errors: outcome.errors,
                    warnings: outcome.warnings,
                    children: Vec::new(),
                }
            }
        }
    }

    /// Drop the document and everything derived from it.
    pub fn clear(&self) {
        *self.doc.write() = None;
        *self.search.write() = None;
        self.expanded.write().clear();
        debug!("document cleared");
    }

    /// The current document, if any. The `Arc` keeps it alive even if the
    /// state is cleared while the caller still holds it.
    pub fn document(&self) -> Option<Arc<Value>> {
        self.doc
            .read()
            .as_ref()
            .map(|loaded| Arc::clone(&loaded.value))
    }

    pub fn metadata(&self) -> Option<StructuralMetadata> {
        self.doc.read().as_ref().map(|loaded| loaded.metadata.clone())
    }

    pub fn document_name(&self) -> Option<String> {
        self.doc.read().as_ref().and_then(|loaded| loaded.name.clone())
    }

    /// One page of children of the node at `path`. A path that fails to
    /// parse or resolve yields an empty page, not an error.
    pub fn children(
        &self,
        path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let value = self.document().ok_or(ExplorerError::NoDocument)?;
        let Ok(parsed) = Path::parse(path) else {
            return Ok(Vec::new());
        };
        Ok(list_children(&value, &parsed, offset, limit))
    }

    /// Describe the node at `path`.
    pub fn node(&self, path: &str) -> Result<TreeNode, ExplorerError> {
        let value = self.document().ok_or(ExplorerError::NoDocument)?;
        let parsed = Path::parse(path)?;
        node_at(&value, &parsed).ok_or_else(|| ExplorerError::Unresolved(path.to_string()))
    }

    /// The subtree at `path` as compact JSON text.
    pub fn node_text(&self, path: &str) -> Result<String, ExplorerError> {
        let target = self.resolve(path)?;
        Ok(serde_json::to_string(&target)?)
    }

    /// The subtree at `path` as pretty-printed JSON text.
    pub fn node_text_pretty(&self, path: &str) -> Result<String, ExplorerError> {
        let target = self.resolve(path)?;
        Ok(serde_json::to_string_pretty(&target)?)
    }

    fn resolve(&self, path: &str) -> Result<Value, ExplorerError> {
        let value = self.document().ok_or(ExplorerError::NoDocument)?;
        let parsed = Path::parse(path)?;
        parsed
            .resolve(&value)
            .cloned()
            .ok_or_else(|| ExplorerError::Unresolved(path.to_string()))
    }

    /// Run a search over the whole document and make it the active result
    /// set, replacing any previous one.
    ///
    /// The cursor starts on the first hit, ancestors of every hit join the
    /// expansion set, and `offset`/`limit` select the returned page.
    pub fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResponse, ExplorerError> {
        // Clone the Arc out so no lock is held while walking the document.
        let value = self.document().ok_or(ExplorerError::NoDocument)?;
        let hits = crate::search::search(&value, query, options);
        let prefixes = expansion_paths(&hits);
        let records: Vec<HitRecord> = hits.iter().map(HitRecord::from).collect();
        drop(hits);

        let total_count = records.len();
        let results: Vec<HitRecord> = records.iter().skip(offset).take(limit).cloned().collect();
        let has_more = offset + limit < total_count;

        self.expanded.write().extend(prefixes);
        *self.search.write() = Some(ActiveSearch {
            query: query.to_string(),
            cursor: HitCursor::start(total_count),
            records,
        });

        Ok(SearchResponse {
            results,
            total_count,
            has_more,
        })
    }

    /// The query behind the active result set.
    pub fn query(&self) -> Option<String> {
        self.search.read().as_ref().map(|active| active.query.clone())
    }

    pub fn hit_count(&self) -> usize {
        self.search
            .read()
            .as_ref()
            .map_or(0, |active| active.records.len())
    }

    pub fn hit_position(&self) -> Option<usize> {
        self.search.read().as_ref()?.cursor.position()
    }

    pub fn current_hit(&self) -> Option<HitRecord> {
        let guard = self.search.read();
        let active = guard.as_ref()?;
        active.records.get(active.cursor.position()?).cloned()
    }

    /// Move the cursor to the next hit, wrapping past the end.
    pub fn next_hit(&self) -> Option<HitRecord> {
        let mut guard = self.search.write();
        let active = guard.as_mut()?;
        let index = active.cursor.advance(active.records.len())?;
        active.records.get(index).cloned()
    }

    /// Move the cursor to the previous hit, wrapping past the start.
    pub fn previous_hit(&self) -> Option<HitRecord> {
        let mut guard = self.search.write();
        let active = guard.as_mut()?;
        let index = active.cursor.retreat(active.records.len())?;
        active.records.get(index).cloned()
    }

    pub fn expand(&self, path: &str) {
        self.expanded.write().insert(path.to_string());
    }

    pub fn collapse(&self, path: &str) {
        self.expanded.write().remove(path);
    }

    /// Flip the expansion of `path`, returning the new state.
    pub fn toggle(&self, path: &str) -> bool {
        let mut expanded = self.expanded.write();
        if expanded.remove(path) {
            false
        } else {
            expanded.insert(path.to_string());
            true
        }
    }

    /// The root counts as expanded without an entry in the set.
    pub fn is_expanded(&self, path: &str) -> bool {
        path.is_empty() || self.expanded.read().contains(path)
    }

    /// The rows a tree view would display right now, cut off at `max_nodes`.
    pub fn visible(&self, max_nodes: usize) -> Result<Vec<TreeRow>, ExplorerError> {
        let value = self.document().ok_or(ExplorerError::NoDocument)?;
        let expanded = self.expanded.read();
        Ok(visible_rows(&value, &expanded, max_nodes))
    }
}
