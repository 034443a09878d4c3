//! Schema Graph Builder
//!
//! Turns normalized source lines into a linked, analyzed [`SchemaGraph`]:
//!
//! 1. **parse** records, sections and items (duplicate headers are fatal)
//! 2. **normalize** the `types` section into `type_refs`
//! 3. **resolve** same-blood-type references into parent/child links
//! 4. **check** the hierarchy is acyclic, then compute depth and height

use petgraph::graph::DiGraph;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

use super::{analysis, Diagnostics, Schema, SchemaGraph, SchemaIdx, TypeRef};
use crate::error::{Result, SchemaError};
use crate::source::{SourceFormat, SourceLine};

/// Builds a [`SchemaGraph`] from normalized lines
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    format: SourceFormat,
}

impl GraphBuilder {
    pub fn new(format: SourceFormat) -> Self {
        Self { format }
    }

    pub fn build(&self, lines: &[SourceLine]) -> Result<SchemaGraph> {
        let mut diagnostics = Diagnostics::new();
        let mut schemas = self.parse_records(lines, &mut diagnostics)?;

        for schema in &mut schemas {
            schema.type_refs = schema
                .descriptions
                .shift_remove(&self.format.types_section)
                .unwrap_or_default();
        }

        let graph = assemble(schemas, diagnostics, true)?;
        debug!(
            schemas = graph.len(),
            edges = graph.edge_count(),
            warnings = graph.diagnostics.len(),
            "built schema graph"
        );
        Ok(graph)
    }

    fn parse_records(
        &self,
        lines: &[SourceLine],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Schema>> {
        let mut schemas: Vec<Schema> = Vec::new();
        let mut declared: HashMap<String, usize> = HashMap::new();
        let mut section: Option<String> = None;
        // Item id token -> line of first use, per record
        let mut item_ids: HashMap<String, usize> = HashMap::new();

        for line in lines {
            let text = line.text.as_str();

            if self.format.is_header(text) {
                let name = header_name(text)
                    .ok_or_else(|| malformed(line, "header has no parenthesized name"))?;
                if let Some(&first_line) = declared.get(name) {
                    return Err(SchemaError::DuplicateHeader {
                        name: name.to_string(),
                        first_line,
                        second_line: line.number,
                    });
                }
                declared.insert(name.to_string(), line.number);
                schemas.push(Schema::new(name).at_line(line.number));
                section = None;
                item_ids.clear();
                continue;
            }

            let Some(schema) = schemas.last_mut() else {
                return Err(malformed(line, "content before the first header"));
            };

            if self.format.is_section(text) {
                let key = text[self.format.section.len_utf8()..].trim().to_string();
                if schema.descriptions.contains_key(&key) {
                    diagnostics.duplicate_section(&schema.name, &key, line.number);
                }
                schema.descriptions.insert(key.clone(), Vec::new());
                section = Some(key);
                continue;
            }

            let Some(key) = section.as_deref() else {
                return Err(malformed(line, "item outside of any section"));
            };

            let item = if self.format.is_item(text) {
                let id = text.split_whitespace().next().unwrap_or(text);
                match item_ids.get(id) {
                    Some(&first_line) => {
                        diagnostics.duplicate_item_id(&schema.name, id, first_line, line.number)
                    }
                    None => {
                        item_ids.insert(id.to_string(), line.number);
                    }
                }
                item_payload(text)
            } else {
                text
            };

            schema
                .descriptions
                .entry(key.to_string())
                .or_default()
                .push(item.to_string());
        }

        Ok(schemas)
    }
}

/// Index, link and analyze a set of schemas.
///
/// Used for the full graph and for family subsets; `report_dangling` is off
/// for subsets, where references leaving the subset are expected.
pub(crate) fn assemble(
    schemas: Vec<Schema>,
    diagnostics: Diagnostics,
    report_dangling: bool,
) -> Result<SchemaGraph> {
    let mut dag: DiGraph<Schema, ()> = DiGraph::with_capacity(schemas.len(), schemas.len());
    let mut by_name = HashMap::with_capacity(schemas.len());
    for schema in schemas {
        let name = schema.name.clone();
        by_name.insert(name, SchemaIdx(dag.add_node(schema)));
    }

    let mut graph = SchemaGraph {
        graph: dag,
        by_name,
        diagnostics,
        source_hash: None,
    };

    resolve_edges(&mut graph, report_dangling);
    let order = analysis::check_acyclic(&graph)?;
    analysis::compute_levels(&mut graph, &order);
    Ok(graph)
}

/// Link every schema to the same-blood-type schemas its references name.
fn resolve_edges(graph: &mut SchemaGraph, report_dangling: bool) {
    let mut edges: Vec<(SchemaIdx, SchemaIdx)> = Vec::new();

    for node in graph.graph.node_indices() {
        let schema = &graph.graph[node];
        let blood_type = schema.blood_type();

        for raw in &schema.type_refs {
            let Some(type_ref) = TypeRef::parse(raw) else {
                continue;
            };

            match graph.by_name.get(type_ref.target) {
                Some(&parent) if Some(type_ref.tag) == blood_type => {
                    edges.push((parent, SchemaIdx(node)));
                }
                Some(_) => {}
                None if report_dangling => graph.diagnostics.dangling_reference(&schema.name, raw),
                None => {}
            }
        }
    }

    for (parent, child) in edges {
        graph.link(parent, child);
    }
}

/// Name of a header line: everything from the first `(`
fn header_name(line: &str) -> Option<&str> {
    line.find('(').map(|i| &line[i..])
}

/// Marker items keep only the text from the first `(`
fn item_payload(line: &str) -> &str {
    line.find('(').map(|i| &line[i..]).unwrap_or(line)
}

fn malformed(line: &SourceLine, reason: &str) -> SchemaError {
    SchemaError::MalformedRecord {
        line_no: line.number,
        line: line.text.clone(),
        reason: reason.to_string(),
    }
}

/// Hex SHA-256 of the raw source
pub(crate) fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DiagnosticCode;
    use crate::source::SourceLoader;

    fn build(text: &str) -> Result<SchemaGraph> {
        let lines = SourceLoader::default().normalize(text)?;
        GraphBuilder::default().build(&lines)
    }

    #[test]
    fn test_sections_and_items() {
        let graph = build(
            "obj-schema (?A Animal)\n\
             :description\n\
             Moves around\n\
             :methods\n\
             !m1 (breathe\n\
             air)\n\
             !m2 (move)\n",
        )
        .unwrap();

        let animal = graph.find("(?A Animal)").unwrap();
        assert_eq!(animal.line(), 1);
        assert_eq!(animal.section("description").unwrap(), ["Moves around"]);
        assert_eq!(animal.section("methods").unwrap(), ["(breathe air)", "(move)"]);
        assert_eq!(
            animal.section_names().collect::<Vec<_>>(),
            vec!["description", "methods"]
        );
        assert!(animal.type_refs.is_empty());
    }

    #[test]
    fn test_types_moved_out_of_descriptions() {
        let graph = build(
            "obj-schema (?A Animal)\n\
             obj-schema (?A Cat)\n\
             :description\n\
             Purrs\n\
             :types\n\
             ?t1 (?A Animal)\n",
        )
        .unwrap();

        let cat = graph.find("(?A Cat)").unwrap();
        assert_eq!(cat.type_refs, vec!["(?A Animal)"]);
        assert!(cat.section("types").is_none());
        assert_eq!(graph.parent_names(graph.index_of("(?A Cat)").unwrap()), vec!["(?A Animal)"]);
    }

    #[test]
    fn test_duplicate_header_is_fatal() {
        let err = build("obj-schema (?A Animal)\n:description\nx\nobj-schema (?A Animal)\n")
            .unwrap_err();
        match err {
            SchemaError::DuplicateHeader {
                name,
                first_line,
                second_line,
            } => {
                assert_eq!(name, "(?A Animal)");
                assert_eq!(first_line, 1);
                assert_eq!(second_line, 4);
            }
            other => panic!("Expected DuplicateHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_item_id_warns_and_keeps_both() {
        let graph = build(
            "obj-schema (?A Animal)\n\
             :methods\n\
             !m1 (eat)\n\
             !m1 (sleep)\n",
        )
        .unwrap();

        let animal = graph.find("(?A Animal)").unwrap();
        assert_eq!(animal.section("methods").unwrap(), ["(eat)", "(sleep)"]);
        let dups: Vec<_> = graph
            .diagnostics()
            .with_code(DiagnosticCode::DuplicateItemId)
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].schema, "(?A Animal)");
    }

    #[test]
    fn test_item_ids_are_scoped_per_record() {
        let graph = build(
            "obj-schema (?A Animal)\n:methods\n!m1 (eat)\n\
             obj-schema (?A Plant)\n:methods\n!m1 (grow)\n",
        )
        .unwrap();
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_dangling_reference_warns_and_omits_edge() {
        let graph = build("obj-schema (?A Cat)\n:types\n?t1 (?A Feline)\n").unwrap();

        let cat = graph.index_of("(?A Cat)").unwrap();
        assert!(graph.is_root(cat));
        assert_eq!(
            graph
                .diagnostics()
                .with_code(DiagnosticCode::DanglingReference)
                .count(),
            1
        );
    }

    #[test]
    fn test_other_blood_type_is_not_a_parent() {
        let graph = build(
            "obj-schema (?H Habitat)\n\
             obj-schema (?A Cat)\n\
             :types\n\
             ?t1 (?H Habitat)\n",
        )
        .unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_repeated_parent_reference_links_once() {
        let graph = build(
            "obj-schema (?A Animal)\n\
             obj-schema (?A Cat)\n\
             :types\n\
             ?t1 (?A Animal)\n\
             ?t2 (?A Animal)\n",
        )
        .unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_section_restarts() {
        let graph = build(
            "obj-schema (?A Animal)\n\
             :notes\n\
             first\n\
             :notes\n\
             second\n",
        )
        .unwrap();
        let animal = graph.find("(?A Animal)").unwrap();
        assert_eq!(animal.section("notes").unwrap(), ["second"]);
        assert_eq!(
            graph
                .diagnostics()
                .with_code(DiagnosticCode::DuplicateSection)
                .count(),
            1
        );
    }

    #[test]
    fn test_malformed_records() {
        let err = build(":description\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedRecord { line_no: 1, .. }));

        let err = build("obj-schema (?A Animal)\n!m1 (eat)\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedRecord { line_no: 2, .. }));

        let err = build("obj-schema Animal\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedRecord { .. }));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = build(
            "obj-schema (?A Egg)\n:types\n?t1 (?A Chicken)\n\
             obj-schema (?A Chicken)\n:types\n?t1 (?A Egg)\n",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Cycle { .. }));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("").len(), 64);
    }
}
