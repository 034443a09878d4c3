//! Schema Hierarchy Graph
//!
//! All schemas of one source file are the nodes of a single petgraph
//! `DiGraph` owned by [`SchemaGraph`]; every edge points from parent to child.
//! [`SchemaIdx`] wraps the node index, so parents and children are both read
//! off the same edge set and can never disagree.
//!
//! The graph is built once (see [`builder`]), analyzed once (see [`analysis`])
//! and is read-only afterwards. Family queries copy what they need.

pub mod analysis;
pub mod builder;
pub mod diagnostics;

pub use analysis::{depth_of, height_of};
pub use builder::GraphBuilder;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Index;
use std::path::Path;

use crate::error::{Result, SchemaError};
use crate::family::Family;
use crate::source::{SourceFormat, SourceLoader};

/// Marker introducing the tag character inside a type reference
pub const REF_MARKER: char = '?';

/// Stable handle of a schema inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaIdx(pub(crate) NodeIndex);

impl SchemaIdx {
    /// Declaration position of the schema
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// A parsed type reference such as `(?A Animal)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'a> {
    /// Blood type the reference points at
    pub tag: char,
    /// Name of the referenced schema
    pub target: &'a str,
}

impl<'a> TypeRef<'a> {
    /// The target starts one character before the first `?`; the tag follows it.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let marker = raw.find(REF_MARKER)?;
        let (start, _) = raw[..marker].char_indices().last()?;
        let tag = raw[marker + REF_MARKER.len_utf8()..].chars().next()?;
        Some(Self {
            tag,
            target: &raw[start..],
        })
    }
}

/// One parsed object schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Full name, e.g. `(?A Mammal)`; unique within a graph
    pub name: String,
    /// Raw type references from the `types` section
    #[serde(default)]
    pub type_refs: Vec<String>,
    /// Remaining sections in declaration order
    #[serde(default)]
    pub descriptions: IndexMap<String, Vec<String>>,
    /// Longest path up to a root
    #[serde(default)]
    pub depth: usize,
    /// Longest path down to a leaf
    #[serde(default)]
    pub height: usize,
    /// Line of the header in the source
    #[serde(skip)]
    pub(crate) line: usize,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_refs: Vec::new(),
            descriptions: IndexMap::new(),
            depth: 0,
            height: 0,
            line: 0,
        }
    }

    pub(crate) fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Tag character at offset 2 of the name
    pub fn blood_type(&self) -> Option<char> {
        self.name.chars().nth(2)
    }

    /// Display label: `(?A Mammal)` becomes `Mammal`
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    /// Names this schema claims as parents (same blood type)
    pub fn parent_candidates(&self) -> Vec<&str> {
        let Some(blood_type) = self.blood_type() else {
            return Vec::new();
        };
        self.type_refs
            .iter()
            .filter_map(|raw| TypeRef::parse(raw))
            .filter(|r| r.tag == blood_type)
            .map(|r| r.target)
            .collect()
    }

    /// Source line of the header (0 for schemas not read from text)
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn section(&self, key: &str) -> Option<&[String]> {
        self.descriptions.get(key).map(Vec::as_slice)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.descriptions.keys().map(String::as_str)
    }

    /// Detail text: a `Types` block followed by every section, items indented
    pub fn describe(&self) -> String {
        let mut out = String::new();

        if !self.type_refs.is_empty() {
            push_block(&mut out, "Types", &self.type_refs);
        }
        for (key, items) in &self.descriptions {
            push_block(&mut out, &capitalize(key), items);
        }

        out
    }

    /// Copy of name, references and sections with levels cleared
    pub(crate) fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            type_refs: self.type_refs.clone(),
            descriptions: self.descriptions.clone(),
            line: self.line,
            ..Self::new(String::new())
        }
    }
}

fn push_block(out: &mut String, title: &str, items: &[String]) {
    out.push_str(title);
    out.push('\n');
    for item in items {
        out.push_str("        ");
        out.push_str(item);
        out.push('\n');
    }
    out.push_str("\n\n");
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Text between the first space and the closing character of a name
pub fn short_name(name: &str) -> &str {
    match name.find(' ') {
        Some(space) if space + 1 < name.len() => {
            let rest = &name[space + 1..];
            let end = rest.char_indices().last().map(|(i, _)| i).unwrap_or(0);
            &rest[..end]
        }
        _ => name,
    }
}

/// A schema together with the names of its direct links
#[derive(Debug, Clone, Serialize)]
pub struct SchemaView<'a> {
    #[serde(flatten)]
    pub schema: &'a Schema,
    pub short_name: &'a str,
    pub parents: Vec<&'a str>,
    pub children: Vec<&'a str>,
}

/// Search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub short_name: String,
    pub score: i64,
}

/// The full schema hierarchy
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    /// Parent -> child hierarchy; node indices follow declaration order
    pub(crate) graph: DiGraph<Schema, ()>,

    /// Index: name -> handle
    pub(crate) by_name: HashMap<String, SchemaIdx>,

    /// Non-fatal findings from the build
    pub(crate) diagnostics: Diagnostics,

    /// SHA-256 of the source text, if built from text
    pub(crate) source_hash: Option<String>,
}

impl SchemaGraph {
    /// Load a schema file with the default grammar
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_format(path, &SourceFormat::default())
    }

    pub fn from_file_with_format(path: &Path, format: &SourceFormat) -> Result<Self> {
        let content = crate::source::read_source(path)?;
        Self::parse_with_format(&content, format)
    }

    /// Build a graph from schema text with the default grammar
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_with_format(content, &SourceFormat::default())
    }

    pub fn parse_with_format(content: &str, format: &SourceFormat) -> Result<Self> {
        let lines = SourceLoader::new(format.clone()).normalize(content)?;
        let mut graph = GraphBuilder::new(format.clone()).build(&lines)?;
        graph.source_hash = Some(builder::content_hash(content));
        Ok(graph)
    }

    // ========== Public API ==========

    /// Get schema count
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get parent/child edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get(&self, idx: SchemaIdx) -> Option<&Schema> {
        self.graph.node_weight(idx.0)
    }

    /// Exact lookup by full name
    pub fn find(&self, name: &str) -> Option<&Schema> {
        self.index_of(name).map(|idx| &self[idx])
    }

    pub fn index_of(&self, name: &str) -> Option<SchemaIdx> {
        self.by_name.get(name).copied()
    }

    /// Resolve a query (full name, short name, or short name in any case)
    pub fn resolve(&self, query: &str) -> Option<SchemaIdx> {
        if let Some(idx) = self.index_of(query) {
            return Some(idx);
        }

        if let Some(idx) = self.indices().find(|&i| self[i].short_name() == query) {
            return Some(idx);
        }

        let query_lower = query.to_lowercase();
        self.indices()
            .find(|&i| self[i].short_name().to_lowercase() == query_lower)
    }

    /// Handles in declaration order
    pub fn indices(&self) -> impl Iterator<Item = SchemaIdx> {
        self.graph.node_indices().map(SchemaIdx)
    }

    /// All schemas in declaration order
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> + '_ {
        self.graph.node_indices().map(move |n| &self.graph[n])
    }

    /// All schema names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.schemas().map(|s| s.name.as_str()).collect()
    }

    /// Schemas without parents
    pub fn roots(&self) -> Vec<&Schema> {
        self.indices()
            .filter(|&idx| self.is_root(idx))
            .map(|idx| &self[idx])
            .collect()
    }

    pub fn is_root(&self, idx: SchemaIdx) -> bool {
        self.graph
            .neighbors_directed(idx.0, Direction::Incoming)
            .next()
            .is_none()
    }

    pub fn is_leaf(&self, idx: SchemaIdx) -> bool {
        self.graph
            .neighbors_directed(idx.0, Direction::Outgoing)
            .next()
            .is_none()
    }

    pub fn max_depth(&self) -> usize {
        self.schemas().map(|s| s.depth).max().unwrap_or(0)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn source_hash(&self) -> Option<&str> {
        self.source_hash.as_deref()
    }

    /// Direct parents, in the order the schema references them
    pub fn parents(&self, idx: SchemaIdx) -> Vec<SchemaIdx> {
        self.neighbors(idx, Direction::Incoming)
    }

    /// Direct children, in declaration order
    pub fn children(&self, idx: SchemaIdx) -> Vec<SchemaIdx> {
        self.neighbors(idx, Direction::Outgoing)
    }

    pub fn parent_names(&self, idx: SchemaIdx) -> Vec<&str> {
        self.names_of(&self.parents(idx))
    }

    pub fn child_names(&self, idx: SchemaIdx) -> Vec<&str> {
        self.names_of(&self.children(idx))
    }

    /// Name-resolved view of one schema, for display and JSON output
    pub fn view(&self, idx: SchemaIdx) -> SchemaView<'_> {
        let schema = &self[idx];
        SchemaView {
            schema,
            short_name: schema.short_name(),
            parents: self.parent_names(idx),
            children: self.child_names(idx),
        }
    }

    /// Every schema reachable through parent links, nearest first per branch
    pub fn ancestors(&self, idx: SchemaIdx) -> Vec<SchemaIdx> {
        self.closure(idx, Direction::Incoming)
    }

    /// Every schema reachable through child links, depth-first in child order
    pub fn descendants(&self, idx: SchemaIdx) -> Vec<SchemaIdx> {
        self.closure(idx, Direction::Outgoing)
    }

    pub fn ancestor_names(&self, idx: SchemaIdx) -> Vec<&str> {
        self.names_of(&self.ancestors(idx))
    }

    pub fn descendant_names(&self, idx: SchemaIdx) -> Vec<&str> {
        self.names_of(&self.descendants(idx))
    }

    /// Transitive closure in one direction, excluding the start node.
    /// `Incoming` follows parents, `Outgoing` follows children.
    pub fn closure(&self, idx: SchemaIdx, direction: Direction) -> Vec<SchemaIdx> {
        let mut seen = HashSet::from([idx]);
        let mut result = Vec::new();
        self.gather(idx, direction, &mut seen, &mut result);
        result
    }

    /// Depth-first preorder walk from `start`, appending nodes not yet in
    /// `seen`. Neighbors are visited in link order.
    pub(crate) fn gather(
        &self,
        start: SchemaIdx,
        direction: Direction,
        seen: &mut HashSet<SchemaIdx>,
        out: &mut Vec<SchemaIdx>,
    ) {
        let mut stack: Vec<SchemaIdx> = self.neighbors(start, direction).into_iter().rev().collect();

        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            out.push(idx);
            stack.extend(self.neighbors(idx, direction).into_iter().rev());
        }
    }

    /// Direct neighbors in edge insertion order
    pub(crate) fn neighbors(&self, idx: SchemaIdx, direction: Direction) -> Vec<SchemaIdx> {
        let mut edges: Vec<_> = self.graph.edges_directed(idx.0, direction).collect();
        edges.sort_by_key(|e| e.id());

        edges
            .into_iter()
            .map(|e| match direction {
                Direction::Outgoing => SchemaIdx(e.target()),
                Direction::Incoming => SchemaIdx(e.source()),
            })
            .collect()
    }

    /// Names containing `keyword`, ignoring case, sorted
    pub fn search(&self, keyword: &str) -> Vec<&str> {
        let keyword = keyword.to_lowercase();
        let mut hits: Vec<&str> = self
            .schemas()
            .filter(|s| s.name.to_lowercase().contains(&keyword))
            .map(|s| s.name.as_str())
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Search schemas by short name (fuzzy)
    pub fn fuzzy_search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &Schema)> = self
            .schemas()
            .filter_map(|s| matcher.fuzzy_match(s.short_name(), query).map(|score| (score, s)))
            .collect();

        // Sort by score descending, name for ties
        results.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));

        results
            .into_iter()
            .take(limit)
            .map(|(score, schema)| SearchResult {
                name: schema.name.clone(),
                short_name: schema.short_name().to_string(),
                score,
            })
            .collect()
    }

    /// Extract the family of the schema matching `query`
    pub fn family(&self, query: &str) -> Result<Family> {
        let idx = self
            .resolve(query)
            .ok_or_else(|| SchemaError::NotFound(query.to_string()))?;
        Family::extract(self, idx)
    }

    fn names_of(&self, indices: &[SchemaIdx]) -> Vec<&str> {
        indices.iter().map(|&i| self[i].name.as_str()).collect()
    }

    /// Link `child` under `parent`; repeated links collapse into one edge
    pub(crate) fn link(&mut self, parent: SchemaIdx, child: SchemaIdx) {
        self.graph.update_edge(parent.0, child.0, ());
    }
}

impl Index<SchemaIdx> for SchemaGraph {
    type Output = Schema;

    fn index(&self, idx: SchemaIdx) -> &Schema {
        &self.graph[idx.0]
    }
}
