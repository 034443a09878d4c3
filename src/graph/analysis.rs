//! Schema Graph Analysis
//!
//! Depth and height are longest-path lengths. Both need an acyclic graph:
//! [`check_acyclic`] runs petgraph's topological sort over the hierarchy and
//! its order drives a single pass for each level.

use petgraph::algo::toposort;
use petgraph::Direction;
use tracing::trace;

use super::{SchemaGraph, SchemaIdx};
use crate::error::{Result, SchemaError};

/// Longest chain of parent links from `idx` up to a root
pub fn depth_of(graph: &SchemaGraph, idx: SchemaIdx) -> usize {
    longest_path(graph, idx, Direction::Incoming)
}

/// Longest chain of child links from `idx` down to a leaf
pub fn height_of(graph: &SchemaGraph, idx: SchemaIdx) -> usize {
    longest_path(graph, idx, Direction::Outgoing)
}

fn longest_path(graph: &SchemaGraph, idx: SchemaIdx, direction: Direction) -> usize {
    graph
        .graph
        .neighbors_directed(idx.0, direction)
        .map(|next| longest_path(graph, SchemaIdx(next), direction) + 1)
        .max()
        .unwrap_or(0)
}

/// Parents-first order of every schema; a cycle (including a
/// self-reference) is an error
pub fn check_acyclic(graph: &SchemaGraph) -> Result<Vec<SchemaIdx>> {
    toposort(&graph.graph, None)
        .map(|order| order.into_iter().map(SchemaIdx).collect())
        .map_err(|cycle| SchemaError::Cycle {
            name: graph.graph[cycle.node_id()].name.clone(),
        })
}

/// Fill in `depth` and `height` for every schema, given a parents-first order
pub(crate) fn compute_levels(graph: &mut SchemaGraph, order: &[SchemaIdx]) {
    let mut depth = vec![0usize; graph.len()];
    let mut height = vec![0usize; graph.len()];

    for &idx in order {
        for parent in graph.graph.neighbors_directed(idx.0, Direction::Incoming) {
            depth[idx.index()] = depth[idx.index()].max(depth[parent.index()] + 1);
        }
    }
    for &idx in order.iter().rev() {
        for child in graph.graph.neighbors_directed(idx.0, Direction::Outgoing) {
            height[idx.index()] = height[idx.index()].max(height[child.index()] + 1);
        }
    }

    for node in graph.graph.node_indices() {
        let schema = &mut graph.graph[node];
        schema.depth = depth[node.index()];
        schema.height = height[node.index()];
        trace!(schema = %schema.name, depth = schema.depth, height = schema.height, "levels");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> SchemaGraph {
        SchemaGraph::parse(
            "obj-schema (?A A)\n\
             obj-schema (?A B)\n:types\n?t (?A A)\n\
             obj-schema (?A C)\n:types\n?t (?A B)\n",
        )
        .unwrap()
    }

    #[test]
    fn test_chain_depth_and_height() {
        let graph = chain();
        let a = graph.index_of("(?A A)").unwrap();
        let c = graph.index_of("(?A C)").unwrap();

        assert_eq!(depth_of(&graph, c), 2);
        assert_eq!(height_of(&graph, a), 2);
        assert_eq!(depth_of(&graph, a), 0);
        assert_eq!(height_of(&graph, c), 0);

        assert_eq!(graph[c].depth, 2);
        assert_eq!(graph[a].height, 2);
        assert_eq!(graph.max_depth(), 2);
    }

    #[test]
    fn test_longest_path_wins() {
        // D hangs off both A (depth 0) and C (depth 2)
        let graph = SchemaGraph::parse(
            "obj-schema (?A A)\n\
             obj-schema (?A B)\n:types\n?t (?A A)\n\
             obj-schema (?A C)\n:types\n?t (?A B)\n\
             obj-schema (?A D)\n:types\n?t1 (?A A)\n?t2 (?A C)\n",
        )
        .unwrap();
        let a = graph.index_of("(?A A)").unwrap();
        let d = graph.index_of("(?A D)").unwrap();

        assert_eq!(graph[d].depth, 3);
        assert_eq!(graph[a].height, 3);
    }

    #[test]
    fn test_stored_levels_match_walks() {
        let graph = SchemaGraph::parse(
            "obj-schema (?A A)\n\
             obj-schema (?A B)\n:types\n?t (?A A)\n\
             obj-schema (?A C)\n:types\n?t1 (?A A)\n?t2 (?A B)\n\
             obj-schema (?A D)\n:types\n?t (?A C)\n\
             obj-schema (?A E)\n:types\n?t (?A A)\n",
        )
        .unwrap();

        for idx in graph.indices() {
            assert_eq!(graph[idx].depth, depth_of(&graph, idx));
            assert_eq!(graph[idx].height, height_of(&graph, idx));
        }
    }

    #[test]
    fn test_order_puts_parents_first() {
        let graph = chain();
        let order = check_acyclic(&graph).unwrap();
        let names: Vec<&str> = order.iter().map(|&idx| graph[idx].name.as_str()).collect();
        assert_eq!(names, vec!["(?A A)", "(?A B)", "(?A C)"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let err = SchemaGraph::parse("obj-schema (?A Ouroboros)\n:types\n?t (?A Ouroboros)\n")
            .unwrap_err();
        match err {
            SchemaError::Cycle { name } => assert_eq!(name, "(?A Ouroboros)"),
            other => panic!("Expected Cycle, got {:?}", other),
        }
    }
}
