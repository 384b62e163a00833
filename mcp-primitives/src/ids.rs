//! Tool identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_ID_LEN: usize = 64;

/// Dotted-namespace identifier naming a tool, e.g. `system.info`.
///
/// Identifiers are validated on construction so that a registry lookup can
/// never be handed a value that would escape its search directories.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolId(String);

impl ToolId {
    /// Creates a new tool identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolId`] if the supplied identifier is empty,
    /// too long, contains unsupported characters, or has empty dot segments.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_identifier(&id)?;
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace segment before the first dot.
    ///
    /// An identifier without a dot is its own category.
    #[must_use]
    pub fn category(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

fn validate_identifier(id: &str) -> Result<()> {
    let reject = |reason: &str| Error::InvalidToolId {
        id: id.into(),
        reason: reason.into(),
    };

    if id.is_empty() {
        return Err(reject("identifier cannot be empty"));
    }

    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidToolId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_ID_LEN}"),
        });
    }

    if !id
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
    {
        return Err(reject(
            "identifier must contain lowercase alphanumeric, dash, underscore, or dot",
        ));
    }

    if id.split('.').any(str::is_empty) {
        return Err(reject("identifier must not contain empty dot segments"));
    }

    Ok(())
}

impl Display for ToolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ToolId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ToolId> for String {
    fn from(value: ToolId) -> Self {
        value.0
    }
}

impl FromStr for ToolId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_tool_id() {
        let id = ToolId::new("system.info").expect("id");
        let parsed = id.to_string().parse::<ToolId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn category_is_first_segment() {
        let id = ToolId::new("fs.archive.create").expect("id");
        assert_eq!(id.category(), "fs");

        let flat = ToolId::new("ping").expect("id");
        assert_eq!(flat.category(), "ping");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(ToolId::new("").is_err());
        assert!(ToolId::new("System.Info").is_err());
        assert!(ToolId::new("system..info").is_err());
        assert!(ToolId::new(".info").is_err());
        assert!(ToolId::new("system/info").is_err());
        assert!(ToolId::new("a".repeat(65)).is_err());
    }

    #[test]
    fn deserializing_rejects_invalid_ids() {
        let err = serde_json::from_str::<ToolId>("\"../escape\"");
        assert!(err.is_err());
    }
}
