//! Source Loading
//!
//! Reads raw object-schema text, strips comments, normalizes whitespace and
//! reassembles wrapped item lines into logical records.
//!
//! ```text
//! obj-schema (?A Mammal)      ; header
//! :types                      ; section
//! ?t1 (?A Animal)             ; item
//! !m1 (nurse young            ; item ...
//!      until weaned)          ; ... continued
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Grammar tokens of the object-schema format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFormat {
    /// Keyword opening a record
    #[serde(default = "default_header_keyword")]
    pub header_keyword: String,
    /// Comment marker; everything after it is dropped
    #[serde(default = "default_comment")]
    pub comment: char,
    /// Prefix of a section line
    #[serde(default = "default_section")]
    pub section: char,
    /// Prefixes of list items (attribute and reference kinds)
    #[serde(default = "default_item_markers")]
    pub item_markers: Vec<char>,
    /// Section holding the type references
    #[serde(default = "default_types_section")]
    pub types_section: String,
}

fn default_header_keyword() -> String {
    "obj-schema".to_string()
}

fn default_comment() -> char {
    ';'
}

fn default_section() -> char {
    ':'
}

fn default_item_markers() -> Vec<char> {
    vec!['!', '?']
}

fn default_types_section() -> String {
    "types".to_string()
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self {
            header_keyword: default_header_keyword(),
            comment: default_comment(),
            section: default_section(),
            item_markers: default_item_markers(),
            types_section: default_types_section(),
        }
    }
}

impl SourceFormat {
    pub fn is_header(&self, line: &str) -> bool {
        line.starts_with(self.header_keyword.as_str())
    }

    pub fn is_section(&self, line: &str) -> bool {
        line.starts_with(self.section)
    }

    pub fn is_item(&self, line: &str) -> bool {
        line.chars()
            .next()
            .map(|c| self.item_markers.contains(&c))
            .unwrap_or(false)
    }

    /// Header, section and item lines start a new logical line
    fn starts_logical_line(&self, line: &str) -> bool {
        self.is_header(line) || self.is_section(line) || self.is_item(line)
    }
}

/// One normalized logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based physical line the logical line starts on
    pub number: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Turns raw schema text into normalized record lines
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    format: SourceFormat,
}

impl SourceLoader {
    pub fn new(format: SourceFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &SourceFormat {
        &self.format
    }

    /// Read and normalize a schema file
    pub fn load(&self, path: &Path) -> Result<Vec<SourceLine>> {
        let content = read_source(path)?;
        self.normalize(&content)
    }

    /// Normalize already-read schema text
    pub fn normalize(&self, content: &str) -> Result<Vec<SourceLine>> {
        let cleaned = content
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let text = collapse_whitespace(&strip_comment(raw, self.format.comment));
                (!text.is_empty()).then(|| SourceLine::new(idx + 1, text))
            });

        let lines = self.merge_continuations(cleaned)?;
        debug!(count = lines.len(), "normalized schema source");
        Ok(lines)
    }

    /// Re-join item descriptions that wrap across physical lines.
    ///
    /// A non-marker line continues the previous logical line only when that
    /// line is an item; otherwise it stands alone as free text.
    fn merge_continuations(
        &self,
        lines: impl Iterator<Item = SourceLine>,
    ) -> Result<Vec<SourceLine>> {
        let mut merged: Vec<SourceLine> = Vec::new();

        for line in lines {
            if self.format.starts_logical_line(&line.text) {
                merged.push(line);
                continue;
            }

            let Some(previous) = merged.last_mut() else {
                return Err(SchemaError::MalformedContinuation {
                    line_no: line.number,
                    line: line.text,
                });
            };

            if self.format.is_item(&previous.text) {
                previous.text.push(' ');
                previous.text.push_str(&line.text);
            } else {
                merged.push(line);
            }
        }

        Ok(merged)
    }
}

/// Read a file's full text, mapping failures to [`SchemaError::Io`]
pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Cut a line at its first unescaped comment marker. `\;` keeps a literal `;`.
fn strip_comment(line: &str, marker: char) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&marker) {
            out.push(marker);
            chars.next();
        } else if c == marker {
            break;
        } else {
            out.push(c);
        }
    }

    out
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
