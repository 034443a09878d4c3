//! Family Extraction
//!
//! A family is one selected schema plus all of its ancestors and descendants,
//! copied out of the full graph and re-linked among themselves. Depth and
//! height are recomputed inside the copy, so they describe the family tree,
//! not the full hierarchy.

pub mod layout;

pub use layout::{FamilyLayout, LayoutRow};

use petgraph::Direction;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::graph::{builder, Diagnostics, Schema, SchemaGraph, SchemaIdx};

/// Detached ancestor + descendant closure of one schema
#[derive(Debug, Clone)]
pub struct Family {
    graph: SchemaGraph,
    selected: SchemaIdx,
}

impl Family {
    /// Copy the family of `selected` out of `source`.
    ///
    /// Members are ordered selected first, then descendants, then ancestors,
    /// each in depth-first link order.
    pub fn extract(source: &SchemaGraph, selected: SchemaIdx) -> Result<Self> {
        let mut seen = HashSet::from([selected]);
        let mut members = vec![selected];
        source.gather(selected, Direction::Outgoing, &mut seen, &mut members);
        source.gather(selected, Direction::Incoming, &mut seen, &mut members);

        let copies: Vec<Schema> = members.iter().map(|&idx| source[idx].detached()).collect();
        let graph = builder::assemble(copies, Diagnostics::new(), false)?;

        debug!(
            selected = %source[selected].name,
            members = graph.len(),
            "extracted family"
        );

        // The selected schema was added first
        let selected = graph
            .indices()
            .next()
            .ok_or_else(|| SchemaError::NotFound(source[selected].name.clone()))?;

        Ok(Self { graph, selected })
    }

    /// The family's own graph; depth and height are family-local
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn selected(&self) -> &Schema {
        &self.graph[self.selected]
    }

    pub fn selected_idx(&self) -> SchemaIdx {
        self.selected
    }

    pub fn members(&self) -> impl Iterator<Item = &Schema> {
        self.graph.schemas()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.index_of(name).is_some()
    }

    pub fn max_depth(&self) -> usize {
        self.graph.max_depth()
    }

    /// Parent/child name pairs, parents in member order
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .indices()
            .flat_map(|parent| {
                self.graph
                    .children(parent)
                    .into_iter()
                    .map(move |child| (self.graph[parent].name.as_str(), self.graph[child].name.as_str()))
            })
            .collect()
    }

    /// Order members into display rows
    pub fn layout(&self) -> FamilyLayout {
        layout::layout(self)
    }
}
