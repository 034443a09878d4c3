//! Error types for schema loading and queries

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Fatal schema errors.
///
/// Non-fatal findings (duplicate item ids, dangling references) are not errors;
/// they are collected as [`crate::graph::Diagnostics`] on the loaded graph.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate header: {name} declared on line {first_line} and again on line {second_line}")]
    DuplicateHeader {
        name: String,
        first_line: usize,
        second_line: usize,
    },

    #[error("Malformed continuation on line {line_no}: '{line}' continues nothing")]
    MalformedContinuation { line_no: usize, line: String },

    #[error("Malformed record on line {line_no}: {reason} ('{line}')")]
    MalformedRecord {
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("Cycle detected in schema hierarchy at {name}")]
    Cycle { name: String },

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Whether the error came from the input text rather than the environment
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateHeader { .. }
                | Self::MalformedContinuation { .. }
                | Self::MalformedRecord { .. }
                | Self::Cycle { .. }
        )
    }
}
