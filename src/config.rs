//! Configuration management for schema-tree
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-tree.toml)
//! - Environment variables (SCHEMA_TREE__*)
//!
//! ## Example config file (schema-tree.toml):
//! ```toml
//! [source]
//! path = "schemas/animals.schema"
//!
//! [format]
//! header_keyword = "obj-schema"
//! comment = ";"
//! section = ":"
//! item_markers = ["!", "?"]
//! types_section = "types"
//!
//! [search]
//! limit = 20
//! fuzzy = true
//!
//! [output]
//! format = "text"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::source::SourceFormat;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Input settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Grammar of the schema files
    #[serde(default)]
    pub format: SourceFormat,

    /// Search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Schema file used when none is given on the command line
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of fuzzy hits
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    /// Fuzzy matching; plain substring search when off
    #[serde(default = "default_true")]
    pub fuzzy: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_search_limit() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
            fuzzy: true,
        }
    }
}

impl TreeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "schema-tree.toml",
            ".schema-tree.toml",
            "config/schema-tree.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-tree") {
            let xdg_config = config_dir.config_dir().join("schema-tree.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SCHEMA_TREE__*)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_TREE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Grammar problems that would make schema files unparseable as intended
    pub fn problems(&self) -> Vec<String> {
        let format = &self.format;
        let mut problems = Vec::new();

        if format.header_keyword.trim().is_empty() {
            problems.push("format.header_keyword is empty; every line would be a header".to_string());
        }
        if format.types_section.trim().is_empty() {
            problems.push("format.types_section is empty".to_string());
        }
        if format.item_markers.contains(&format.section) {
            problems.push(format!(
                "format.section '{}' is also an item marker",
                format.section
            ));
        }
        if format.comment == format.section || format.item_markers.contains(&format.comment) {
            problems.push(format!(
                "format.comment '{}' collides with a section or item marker",
                format.comment
            ));
        }
        if self.search.limit == 0 {
            problems.push("search.limit is 0; fuzzy search would never return hits".to_string());
        }

        problems
    }

    /// Source path, resolved against the working directory
    pub fn source_path(&self) -> Option<PathBuf> {
        self.source.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}
