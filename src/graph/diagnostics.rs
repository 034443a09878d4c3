//! Diagnostics
//!
//! Collects non-fatal findings while a schema graph is built. Every entry is a
//! warning: fatal problems are [`crate::SchemaError`]s and never end up here.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Two marker items in one record share their leading id token
    DuplicateItemId,
    /// A type reference names no declared header
    DanglingReference,
    /// A section key appears twice in one record; the later one wins
    DuplicateSection,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateItemId => "W001",
            Self::DanglingReference => "W002",
            Self::DuplicateSection => "W003",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Schema the finding belongs to
    pub schema: String,
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (line numbers, offending text)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(schema: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] warning: {} ({})", self.code, self.message, self.schema)?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from the build passes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item, logging it as it arrives
    pub fn push(&mut self, item: DiagnosticItem) {
        warn!(code = %item.code, schema = %item.schema, "{}", item.message);
        self.items.push(item);
    }

    pub fn duplicate_item_id(&mut self, schema: &str, id: &str, first_line: usize, line: usize) {
        self.push(
            DiagnosticItem::new(
                schema,
                DiagnosticCode::DuplicateItemId,
                format!("Item id '{}' is declared more than once", id),
            )
            .with_context(format!("first on line {}, again on line {}", first_line, line)),
        );
    }

    pub fn dangling_reference(&mut self, schema: &str, reference: &str) {
        self.push(DiagnosticItem::new(
            schema,
            DiagnosticCode::DanglingReference,
            format!("Type reference '{}' matches no declared header", reference),
        ));
    }

    pub fn duplicate_section(&mut self, schema: &str, section: &str, line: usize) {
        self.push(
            DiagnosticItem::new(
                schema,
                DiagnosticCode::DuplicateSection,
                format!("Section '{}' restarts; earlier items are discarded", section),
            )
            .with_context(format!("line {}", line)),
        );
    }

    /// Items carrying the given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.len()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
