//! Schema Tree
//!
//! Parses object-schema definition files into a hierarchy of schemas and lays
//! out the "family" of any one schema (its ancestors and descendants) as rows
//! for a top-down tree drawing.
//!
//! ## Pipeline
//!
//! ```text
//! schema file
//!   └─ source::SourceLoader      comments, whitespace, wrapped items
//!       └─ graph::GraphBuilder   records, sections, parent/child links
//!           └─ graph::analysis   cycle check, depth and height
//!               └─ family        ancestor + descendant closure, re-linked
//!                   └─ layout    rows per depth, branches kept together
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use schema_tree::{build_family, find_schema, layout, load_graph};
//! use std::path::Path;
//!
//! let graph = load_graph(Path::new("schemas/animals.schema"))?;
//! let mammal = find_schema(&graph, "(?A Mammal)")
//!     .ok_or_else(|| schema_tree::SchemaError::NotFound("(?A Mammal)".into()))?;
//! let family = build_family(&graph, mammal)?;
//! for row in layout(&family).rows {
//!     println!("{}: {:?}", row.depth, row.members);
//! }
//! # Ok::<(), schema_tree::SchemaError>(())
//! ```

pub mod config;
pub mod error;
pub mod family;
pub mod graph;
pub mod source;

pub use config::{OutputFormat, TreeConfig};
pub use error::{Result, SchemaError};
pub use family::{Family, FamilyLayout, LayoutRow};
pub use graph::{
    DiagnosticCode, DiagnosticItem, Diagnostics, GraphBuilder, Schema, SchemaGraph, SchemaIdx,
    SchemaView, SearchResult, TypeRef,
};
pub use source::{SourceFormat, SourceLine, SourceLoader};

use std::path::Path;

/// Load and analyze a schema file with the default grammar
pub fn load_graph(path: &Path) -> Result<SchemaGraph> {
    SchemaGraph::from_file(path)
}

/// Every schema name, declaration order
pub fn all_schema_names(graph: &SchemaGraph) -> Vec<&str> {
    graph.names()
}

/// Exact lookup by full name; `None` when no header declares it
pub fn find_schema(graph: &SchemaGraph, name: &str) -> Option<SchemaIdx> {
    graph.index_of(name)
}

/// Family of `schema`, detached from `graph`
pub fn build_family(graph: &SchemaGraph, schema: SchemaIdx) -> Result<Family> {
    if graph.get(schema).is_none() {
        return Err(SchemaError::NotFound(format!("#{}", schema.index())));
    }
    Family::extract(graph, schema)
}

/// Rows of a family, depth 0 first
pub fn layout(family: &Family) -> FamilyLayout {
    family.layout()
}
