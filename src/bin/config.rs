//! Schema Tree Config CLI
//!
//! Print, scaffold and check the layered schema-tree configuration.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_tree::TreeConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-tree-config")]
#[command(about = "Print, scaffold and check schema-tree configuration")]
struct Cli {
    /// Extra config file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration (TOML unless --json)
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "schema-tree.toml")]
        output: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load the configuration and check its grammar for collisions
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let load = || TreeConfig::load_from(cli.config.as_deref()).context("loading configuration");

    match cli.command {
        Commands::Show { json } => {
            let cfg = load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                print!("{}", toml::to_string_pretty(&cfg)?);
            }
        }

        Commands::Init { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists; pass --force to replace it", output.display());
            }
            TreeConfig::default()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("✅ Created config file: {}", output.display());
        }

        Commands::Validate => {
            let cfg = load()?;
            let problems = cfg.problems();

            if let Some(path) = cfg.source_path() {
                let status = if path.exists() { "found" } else { "missing" };
                println!("   Source: {} ({})", path.display(), status);
            }

            if problems.is_empty() {
                println!("✅ Configuration is valid");
            } else {
                for problem in &problems {
                    eprintln!("❌ {}", problem);
                }
                bail!("{} configuration problem(s)", problems.len());
            }
        }
    }

    Ok(())
}
