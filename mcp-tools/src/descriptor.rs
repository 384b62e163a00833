//! Projection of a tool's structured metadata header into a descriptor.

use std::collections::BTreeSet;
use std::path::Path;

use mcp_primitives::ToolId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::registry::ToolResult;

/// Author reported when the header omits an `Author:` line.
pub const DEFAULT_AUTHOR: &str = "Unknown";
/// Version reported when the header omits a `Version:` line.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Read-only metadata describing a tool, reconstructed from its source on
/// every query so it always reflects the artifact currently on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    version: String,
    author: String,
    tags: BTreeSet<String>,
    schema: Value,
    args_doc: Vec<String>,
    examples: Vec<String>,
}

impl ToolDescriptor {
    /// Reads a tool source file and parses its metadata header.
    ///
    /// # Errors
    ///
    /// Returns [`crate::registry::ToolError::Io`] when the source cannot be
    /// read; header parsing itself never fails.
    pub fn from_file(id: &ToolId, path: &Path) -> ToolResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::parse(id, &source))
    }

    /// Parses the leading comment header of a tool source.
    ///
    /// The scan covers the contiguous comment block at the top of the file
    /// (shebang and blank lines are skipped) and stops at the first code
    /// line. Missing fields fall back to defined defaults, and a malformed
    /// embedded schema degrades to an empty object — metadata retrieval
    /// must never fail outright.
    #[must_use]
    pub fn parse(id: &ToolId, source: &str) -> Self {
        let mut descriptor = Self {
            name: id.to_string(),
            description: String::new(),
            version: DEFAULT_VERSION.to_owned(),
            author: DEFAULT_AUTHOR.to_owned(),
            tags: BTreeSet::new(),
            schema: json!({}),
            args_doc: Vec::new(),
            examples: Vec::new(),
        };

        let mut section = Section::None;
        let mut schema_lines: Vec<&str> = Vec::new();

        for line in source.lines() {
            if line.starts_with("#!") {
                continue;
            }
            if !line.starts_with('#') {
                if line.trim().is_empty() {
                    continue;
                }
                break;
            }

            let content = line.trim_start_matches('#').trim();

            if content == "End Schema" {
                section = Section::None;
                continue;
            }
            if matches!(section, Section::Schema) {
                schema_lines.push(content);
                continue;
            }

            if let Some(value) = content.strip_prefix("Tool:") {
                let value = value.trim();
                if !value.is_empty() {
                    descriptor.name = value.to_owned();
                }
                section = Section::None;
            } else if let Some(value) = content.strip_prefix("Description:") {
                descriptor.description = value.trim().to_owned();
                section = Section::None;
            } else if let Some(value) = content.strip_prefix("Version:") {
                let value = value.trim();
                if !value.is_empty() {
                    descriptor.version = value.to_owned();
                }
                section = Section::None;
            } else if let Some(value) = content.strip_prefix("Author:") {
                let value = value.trim();
                if !value.is_empty() {
                    descriptor.author = value.to_owned();
                }
                section = Section::None;
            } else if let Some(value) = content.strip_prefix("Tags:") {
                descriptor.tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect();
                section = Section::None;
            } else if let Some(value) = content.strip_prefix("Args:") {
                section = Section::Args;
                push_entry(&mut descriptor.args_doc, value);
            } else if let Some(value) = content.strip_prefix("Example:") {
                section = Section::Example;
                push_entry(&mut descriptor.examples, value);
            } else if let Some(value) = content.strip_prefix("Schema:") {
                section = Section::Schema;
                let value = value.trim();
                if !value.is_empty() {
                    schema_lines.push(value);
                }
            } else {
                match section {
                    Section::Args => push_entry(&mut descriptor.args_doc, content),
                    Section::Example => push_entry(&mut descriptor.examples, content),
                    Section::None | Section::Schema => {}
                }
            }
        }

        if !schema_lines.is_empty() {
            descriptor.schema =
                serde_json::from_str(&schema_lines.join("\n")).unwrap_or_else(|_| json!({}));
        }

        descriptor
    }

    /// Returns the tool's declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the one-line description, empty when undeclared.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the declared author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the tag set in deterministic order.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the embedded JSON Schema, `{}` when absent or malformed.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns `true` when the tool declared a usable schema.
    #[must_use]
    pub fn has_schema(&self) -> bool {
        self.schema
            .as_object()
            .is_none_or(|object| !object.is_empty())
    }

    /// Returns the documented argument lines in declaration order.
    #[must_use]
    pub fn args_doc(&self) -> &[String] {
        &self.args_doc
    }

    /// Returns the example invocations in declaration order.
    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }
}

fn push_entry(entries: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        entries.push(value.to_owned());
    }
}

enum Section {
    None,
    Args,
    Example,
    Schema,
}
