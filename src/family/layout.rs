//! Family Layout
//!
//! Orders family members into rows for a top-down tree drawing: one row per
//! depth, roots first.
//!
//! Depth and height sorting alone gives a valid layering with arbitrary
//! sibling order. The ancestry pass then groups siblings under their parent
//! and pushes that order down, so each branch's descendants line up beneath
//! it instead of interleaving with cousins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::trace;

use super::Family;
use crate::error::Result;
use crate::graph::{short_name, SchemaGraph, SchemaIdx};

/// Members sharing one depth, left to right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub depth: usize,
    pub members: Vec<String>,
}

/// Ordered rows of a family, plus the links between members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyLayout {
    pub selected: String,
    pub rows: Vec<LayoutRow>,
    /// Parent/child name pairs
    pub edges: Vec<(String, String)>,
}

impl FamilyLayout {
    /// All members, row by row
    pub fn flatten(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.members.iter().map(String::as_str))
            .collect()
    }

    pub fn max_depth(&self) -> usize {
        self.rows.last().map(|row| row.depth).unwrap_or(0)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Graphviz rendering, one rank per row
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph Family {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fillcolor=\"white\"];\n");
        output.push('\n');

        for row in &self.rows {
            let _ = writeln!(output, "  {{ rank=same; // depth {}", row.depth);
            for name in &row.members {
                let highlight = if *name == self.selected {
                    ", fillcolor=\"#FFFF00\""
                } else {
                    ""
                };
                let _ = writeln!(
                    output,
                    "    \"{}\" [label=\"{}\"{}];",
                    escape(name),
                    escape(short_name(name)),
                    highlight
                );
            }
            output.push_str("  }\n");
        }

        output.push('\n');
        for (parent, child) in &self.edges {
            let _ = writeln!(output, "  \"{}\" -> \"{}\";", escape(parent), escape(child));
        }

        output.push_str("}\n");
        output
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Lay out a family; deterministic for identical input
pub fn layout(family: &Family) -> FamilyLayout {
    let graph = family.graph();
    let rows = order(graph)
        .into_iter()
        .map(|group| LayoutRow {
            depth: group.first().map(|&idx| graph[idx].depth).unwrap_or(0),
            members: group.iter().map(|&idx| graph[idx].name.clone()).collect(),
        })
        .collect();

    FamilyLayout {
        selected: family.selected().name.clone(),
        rows,
        edges: family
            .edges()
            .into_iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect(),
    }
}

/// Member handles grouped into rows, depth 0 first
pub fn order(graph: &SchemaGraph) -> Vec<Vec<SchemaIdx>> {
    let mut members: Vec<SchemaIdx> = graph.indices().collect();

    // Stable sorts: equal keys keep member order
    members.sort_by(|a, b| graph[*b].depth.cmp(&graph[*a].depth));

    let mut groups = group_by_depth(graph, members);
    for group in &mut groups {
        group.sort_by(|a, b| graph[*b].height.cmp(&graph[*a].height));
    }
    groups.reverse();

    regroup_by_ancestry(graph, &mut groups);
    groups
}

/// Split a depth-sorted sequence into runs of equal depth
fn group_by_depth(graph: &SchemaGraph, members: Vec<SchemaIdx>) -> Vec<Vec<SchemaIdx>> {
    let mut groups: Vec<Vec<SchemaIdx>> = Vec::new();

    for idx in members {
        match groups.last_mut() {
            Some(group) if graph[group[0]].depth == graph[idx].depth => group.push(idx),
            _ => groups.push(vec![idx]),
        }
    }

    groups
}

/// Keep siblings together under their parent and make every deeper row
/// follow the resulting branch order. The first and last rows are never
/// re-bucketed themselves.
fn regroup_by_ancestry(graph: &SchemaGraph, groups: &mut [Vec<SchemaIdx>]) {
    for i in 1..groups.len().saturating_sub(1) {
        if groups[i].len() < 2 {
            continue;
        }

        let regrouped = bucket_by_parent(graph, &groups[i]);
        if regrouped == groups[i] {
            continue;
        }
        trace!(depth = graph[regrouped[0]].depth, "regrouped siblings by parent");
        groups[i] = regrouped;

        let priority = branch_order(graph, &groups[i]);
        for later in &mut groups[i + 1..] {
            *later = prioritize(later, &priority);
        }
    }
}

/// Bucket members by first parent, buckets in first-seen order
fn bucket_by_parent(graph: &SchemaGraph, group: &[SchemaIdx]) -> Vec<SchemaIdx> {
    let mut buckets: IndexMap<Option<SchemaIdx>, Vec<SchemaIdx>> = IndexMap::new();
    for &idx in group {
        let parent = graph.parents(idx).first().copied();
        buckets.entry(parent).or_default().push(idx);
    }
    buckets.into_values().flatten().collect()
}

/// Descendants of each sibling in turn, without repeats
fn branch_order(graph: &SchemaGraph, siblings: &[SchemaIdx]) -> HashMap<SchemaIdx, usize> {
    let mut position = HashMap::new();
    for &sibling in siblings {
        for idx in graph.descendants(sibling) {
            let next = position.len();
            position.entry(idx).or_insert(next);
        }
    }
    position
}

/// Members found in `priority` first (in that order), the rest after
fn prioritize(group: &[SchemaIdx], priority: &HashMap<SchemaIdx, usize>) -> Vec<SchemaIdx> {
    let (mut ranked, rest): (Vec<SchemaIdx>, Vec<SchemaIdx>) =
        group.iter().copied().partition(|idx| priority.contains_key(idx));
    ranked.sort_by_key(|idx| priority[idx]);
    ranked.extend(rest);
    ranked
}
