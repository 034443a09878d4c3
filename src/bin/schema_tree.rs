//! Schema Tree CLI
//!
//! Browse an object-schema file and lay out schema families.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_tree::{OutputFormat, SchemaError, SchemaGraph, SchemaView, TreeConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-tree")]
#[command(about = "Browse object-schema hierarchies and lay out schema families")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Schema file (defaults to source.path from config)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every schema, indented by depth
    List,

    /// Search schema names
    Search {
        /// Text to look for
        query: String,
    },

    /// Show one schema's links and sections
    Show {
        /// Full name or short name
        name: String,
    },

    /// Lay out the family of a schema
    Family {
        /// Full name or short name
        name: String,
    },

    /// Report diagnostics and the source fingerprint
    Check,

    /// Export a family layout as Graphviz DOT
    Dot {
        /// Full name or short name
        name: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct CheckReport<'a> {
    path: String,
    schemas: usize,
    edges: usize,
    max_depth: usize,
    source_hash: Option<&'a str>,
    diagnostics: &'a schema_tree::Diagnostics,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = TreeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let json = cli.json || cfg.output.format == OutputFormat::Json;

    let path = cli
        .file
        .or_else(|| cfg.source_path())
        .context("no schema file given; pass --file or set source.path in schema-tree.toml")?;

    let graph = SchemaGraph::from_file_with_format(&path, &cfg.format)
        .with_context(|| format!("loading {}", path.display()))?;

    match cli.command {
        Commands::List => {
            let views: Vec<SchemaView> = graph.indices().map(|idx| graph.view(idx)).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                println!(
                    "📚 {} schemas, {} links, max depth {}\n",
                    graph.len(),
                    graph.edge_count(),
                    graph.max_depth()
                );
                for view in &views {
                    println!("{:indent$}{}", "", view.schema.name, indent = view.schema.depth * 2);
                }
            }
        }

        Commands::Search { query } => {
            if cfg.search.fuzzy {
                let hits = graph.fuzzy_search(&query, cfg.search.limit);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else if hits.is_empty() {
                    println!("No schemas match '{}'", query);
                } else {
                    println!("🔍 {} match(es) for '{}'\n", hits.len(), query);
                    for hit in &hits {
                        println!("  {:>4}  {}", hit.score, hit.name);
                    }
                }
            } else {
                let hits = graph.search(&query);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else if hits.is_empty() {
                    println!("No schemas match '{}'", query);
                } else {
                    println!("🔍 {} match(es) for '{}'\n", hits.len(), query);
                    for name in &hits {
                        println!("  {}", name);
                    }
                }
            }
        }

        Commands::Show { name } => {
            let idx = graph
                .resolve(&name)
                .ok_or_else(|| SchemaError::NotFound(name.clone()))?;
            let view = graph.view(idx);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_schema(&view);
            }
        }

        Commands::Family { name } => {
            let family = graph.family(&name)?;
            let layout = family.layout();

            if json {
                println!("{}", layout.to_json()?);
            } else {
                println!(
                    "🌳 Family of {} ({} members)\n",
                    layout.selected,
                    family.len()
                );
                for row in &layout.rows {
                    let labels: Vec<String> = row
                        .members
                        .iter()
                        .map(|member| {
                            let label = schema_tree::graph::short_name(member);
                            if *member == layout.selected {
                                format!("[{}]", label)
                            } else {
                                label.to_string()
                            }
                        })
                        .collect();
                    println!("  {:>2} │ {}", row.depth, labels.join("  "));
                }
            }
        }

        Commands::Check => {
            let diagnostics = graph.diagnostics();

            if json {
                let report = CheckReport {
                    path: path.display().to_string(),
                    schemas: graph.len(),
                    edges: graph.edge_count(),
                    max_depth: graph.max_depth(),
                    source_hash: graph.source_hash(),
                    diagnostics,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("🔍 Checked {}", path.display());
                println!("   Schemas: {}", graph.len());
                println!("   Links: {}", graph.edge_count());
                println!("   Roots: {}", graph.roots().len());
                println!("   SHA-256: {}", graph.source_hash().unwrap_or("-"));
                println!();

                if diagnostics.is_empty() {
                    println!("✅ No issues found");
                } else {
                    print!("{}", diagnostics);
                }
            }
        }

        Commands::Dot { name, output } => {
            let dot = graph.family(&name)?.layout().to_dot();

            match output {
                Some(output_path) => {
                    std::fs::write(&output_path, &dot)
                        .with_context(|| format!("writing {}", output_path.display()))?;
                    println!("✅ Exported DOT to: {:?}", output_path);
                }
                None => print!("{}", dot),
            }
        }
    }

    Ok(())
}

fn print_schema(view: &SchemaView) {
    let schema = view.schema;
    println!("📄 {}", schema.name);
    println!("   Line: {}", schema.line());
    println!("   Depth: {}  Height: {}", schema.depth, schema.height);

    if !view.parents.is_empty() {
        println!("   Parents: {}", view.parents.join(", "));
    }
    if !view.children.is_empty() {
        println!("   Children: {}", view.children.join(", "));
    }

    let details = schema.describe();
    if !details.is_empty() {
        println!();
        print!("{}", details);
    }
}
