//! End-to-end tests over the fixture schema files
//!
//! Loads real files from `tests/fixtures/` and checks the properties every
//! graph and family layout must hold.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use schema_tree::{
    all_schema_names, build_family, find_schema, layout, load_graph, DiagnosticCode, SchemaError,
    SchemaGraph, SourceFormat,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn animals() -> SchemaGraph {
    load_graph(&fixture("animals.schema")).unwrap()
}

fn short_rows(graph: &SchemaGraph, name: &str) -> Vec<Vec<String>> {
    let family = graph.family(name).unwrap();
    layout(&family)
        .rows
        .iter()
        .map(|row| {
            row.members
                .iter()
                .map(|m| schema_tree::graph::short_name(m).to_string())
                .collect()
        })
        .collect()
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_fixture() {
    let graph = animals();

    assert_eq!(
        all_schema_names(&graph),
        vec![
            "(?A Animal)",
            "(?H Habitat)",
            "(?A Mammal)",
            "(?A Bird)",
            "(?A Pet)",
            "(?A Cat)",
            "(?A Dog)",
            "(?A Puppy)",
            "(?A Sparrow)",
        ]
    );
    assert_eq!(graph.edge_count(), 7);
    assert!(graph.diagnostics().is_empty());
    assert_eq!(graph.source_hash().map(str::len), Some(64));
}

#[test]
fn test_names_are_unique() {
    let graph = animals();
    let names = all_schema_names(&graph);
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn test_section_text_survives_normalization() {
    let graph = animals();

    let animal = graph.find("(?A Animal)").unwrap();
    assert_eq!(animal.section("description").unwrap(), ["A living thing that moves"]);
    assert_eq!(
        animal.section("methods").unwrap(),
        ["(breathe)", "(move from place to place)"]
    );

    let habitat = graph.find("(?H Habitat)").unwrap();
    assert_eq!(habitat.section("description").unwrap(), ["Where things live ; or die"]);

    let dog = graph.find("(?A Dog)").unwrap();
    assert_eq!(dog.type_refs, vec!["(?A Mammal)", "(?A Pet)"]);
}

#[test]
fn test_header_line_numbers() {
    let graph = animals();
    assert_eq!(graph.find("(?A Animal)").unwrap().line(), 4);
    assert_eq!(graph.find("(?H Habitat)").unwrap().line(), 12);
}

#[test]
fn test_unreadable_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_graph(&dir.path().join("missing.schema")).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));

    // A directory cannot be read as text either
    let err = load_graph(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}

#[test]
fn test_duplicate_header_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.schema");
    std::fs::write(
        &path,
        "obj-schema (?A Animal)\n:description\nfirst\n\nobj-schema (?A Animal)\n",
    )
    .unwrap();

    match load_graph(&path).unwrap_err() {
        SchemaError::DuplicateHeader {
            name,
            first_line,
            second_line,
        } => {
            assert_eq!(name, "(?A Animal)");
            assert_eq!((first_line, second_line), (1, 5));
        }
        other => panic!("Expected DuplicateHeader, got {:?}", other),
    }
}

#[test]
fn test_cycle_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycle.schema");
    std::fs::write(
        &path,
        "obj-schema (?A Rock)\n:types\n?t (?A Paper)\n\
         obj-schema (?A Paper)\n:types\n?t (?A Scissors)\n\
         obj-schema (?A Scissors)\n:types\n?t (?A Rock)\n",
    )
    .unwrap();

    let err = load_graph(&path).unwrap_err();
    assert!(matches!(err, SchemaError::Cycle { .. }));
    assert!(err.is_parse_error());
}

#[test]
fn test_warnings_do_not_block_loading() {
    let graph = load_graph(&fixture("broken_refs.schema")).unwrap();
    let diags = graph.diagnostics();

    assert_eq!(diags.len(), 3);
    assert_eq!(diags.with_code(DiagnosticCode::DanglingReference).count(), 1);
    assert_eq!(diags.with_code(DiagnosticCode::DuplicateItemId).count(), 1);
    assert_eq!(diags.with_code(DiagnosticCode::DuplicateSection).count(), 1);

    assert!(graph.is_root(graph.index_of("(?A Cat)").unwrap()));
    let cat = graph.find("(?A Cat)").unwrap();
    assert_eq!(cat.section("methods").unwrap(), ["(purr)", "(hiss)"]);

    let lion = graph.find("(?A Lion)").unwrap();
    assert_eq!(lion.section("notes").unwrap(), ["sleeps"]);
    assert_eq!(lion.depth, 1);
}

#[test]
fn test_custom_format() {
    let format = SourceFormat {
        header_keyword: "schema".to_string(),
        comment: '#',
        section: '@',
        item_markers: vec!['-', '+'],
        types_section: "isa".to_string(),
    };
    let graph = SchemaGraph::parse_with_format(
        "# custom grammar\n\
         schema (?A Animal)\n\
         schema (?A Cat)   # a cat\n\
         @isa\n\
         + (?A Animal)\n\
         @methods\n\
         - (purr\n\
         loudly)\n",
        &format,
    )
    .unwrap();

    let cat = graph.find("(?A Cat)").unwrap();
    assert_eq!(cat.depth, 1);
    assert_eq!(cat.section("methods").unwrap(), ["(purr loudly)"]);
    assert!(cat.section("isa").is_none());
}

// =============================================================================
// Graph Properties
// =============================================================================

#[test]
fn test_edges_are_mutual() {
    let graph = animals();
    for idx in graph.indices() {
        for parent in graph.parents(idx) {
            assert!(graph.children(parent).contains(&idx));
        }
        for child in graph.children(idx) {
            assert!(graph.parents(child).contains(&idx));
        }
    }
}

#[test]
fn test_parents_share_blood_type() {
    let graph = animals();
    let mammal = graph.index_of("(?A Mammal)").unwrap();

    // The habitat reference is kept but never becomes a link
    assert_eq!(graph.parent_names(mammal), vec!["(?A Animal)"]);
    assert!(graph.is_leaf(graph.index_of("(?H Habitat)").unwrap()));

    for idx in graph.indices() {
        for parent in graph.parents(idx) {
            assert_eq!(graph[parent].blood_type(), graph[idx].blood_type());
        }
    }
}

#[test]
fn test_depth_and_height() {
    let graph = animals();
    let levels = |name: &str| {
        let s = graph.find(name).unwrap();
        (s.depth, s.height)
    };

    assert_eq!(levels("(?A Animal)"), (0, 3));
    assert_eq!(levels("(?A Pet)"), (0, 2));
    assert_eq!(levels("(?A Mammal)"), (1, 2));
    assert_eq!(levels("(?A Dog)"), (2, 1));
    assert_eq!(levels("(?A Puppy)"), (3, 0));
    assert_eq!(levels("(?A Sparrow)"), (2, 0));
    assert_eq!(levels("(?H Habitat)"), (0, 0));

    // Roots sit at depth 0, leaves at height 0
    for idx in graph.indices() {
        assert_eq!(graph.is_root(idx), graph[idx].depth == 0);
        assert_eq!(graph.is_leaf(idx), graph[idx].height == 0);
    }
}

// =============================================================================
// Families
// =============================================================================

#[test]
fn test_family_is_ancestors_plus_descendants() {
    let graph = animals();

    for idx in graph.indices() {
        let family = build_family(&graph, idx).unwrap();

        let mut expected: HashSet<&str> = HashSet::from([graph[idx].name.as_str()]);
        expected.extend(graph.ancestor_names(idx));
        expected.extend(graph.descendant_names(idx));

        let actual: HashSet<&str> = family.members().map(|s| s.name.as_str()).collect();
        assert_eq!(actual, expected, "family of {}", graph[idx].name);
        assert_eq!(family.len(), expected.len());
    }
}

#[test]
fn test_family_excludes_co_parents() {
    let graph = animals();
    let mammal = find_schema(&graph, "(?A Mammal)").unwrap();
    let family = build_family(&graph, mammal).unwrap();

    assert_eq!(
        family.members().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["(?A Mammal)", "(?A Cat)", "(?A Dog)", "(?A Puppy)", "(?A Animal)"]
    );
    assert!(!family.contains("(?A Pet)"));

    let dog = family.graph().index_of("(?A Dog)").unwrap();
    assert_eq!(family.graph().parent_names(dog), vec!["(?A Mammal)"]);
}

#[test]
fn test_layout_rows() {
    let graph = animals();

    assert_eq!(
        short_rows(&graph, "Mammal"),
        vec![
            vec!["Animal"],
            vec!["Mammal"],
            vec!["Dog", "Cat"],
            vec!["Puppy"],
        ]
    );
    assert_eq!(
        short_rows(&graph, "Dog"),
        vec![
            vec!["Animal", "Pet"],
            vec!["Mammal"],
            vec!["Dog"],
            vec!["Puppy"],
        ]
    );
    assert_eq!(short_rows(&graph, "Habitat"), vec![vec!["Habitat"]]);
}

#[test]
fn test_layout_rows_match_depth() {
    let graph = animals();

    for name in all_schema_names(&graph) {
        let family = graph.family(name).unwrap();
        let rows = layout(&family).rows;

        for (expected_depth, row) in rows.iter().enumerate() {
            assert_eq!(row.depth, expected_depth, "family of {}", name);
            for member in &row.members {
                assert_eq!(family.graph().find(member).unwrap().depth, row.depth);
            }
        }

        let placed: Vec<&str> = rows.iter().flat_map(|r| r.members.iter().map(String::as_str)).collect();
        let unique: HashSet<&str> = placed.iter().copied().collect();
        assert_eq!(placed.len(), family.len(), "family of {}", name);
        assert_eq!(unique.len(), family.len(), "family of {}", name);
    }
}

#[test]
fn test_layout_is_deterministic() {
    let first = animals();
    let second = animals();

    for name in all_schema_names(&first) {
        assert_eq!(
            layout(&first.family(name).unwrap()),
            layout(&second.family(name).unwrap())
        );
    }
}

#[test]
fn test_layout_serializes() {
    let graph = animals();
    let family = graph.family("Sparrow").unwrap();
    let json = serde_json::to_value(layout(&family)).unwrap();

    assert_eq!(json["selected"], "(?A Sparrow)");
    assert_eq!(json["rows"][0]["members"][0], "(?A Animal)");
    assert_eq!(json["rows"][2]["depth"], 2);
}

#[test]
fn test_find_schema_absent() {
    let graph = animals();
    assert_eq!(find_schema(&graph, "Unicorn"), None);
    // Exact names only; short names go through `SchemaGraph::resolve`
    assert_eq!(find_schema(&graph, "Cat"), None);
    assert_eq!(find_schema(&graph, "(?A Cat)"), graph.index_of("(?A Cat)"));
}
