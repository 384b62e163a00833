//! Directory-backed registry resolving tool identifiers to executables.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use mcp_primitives::ToolId;
use thiserror::Error;
use tracing::debug;

/// File extension expected on tool artifacts.
pub const TOOL_EXTENSION: &str = "sh";

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Ordered list of directories searched for tool artifacts.
///
/// Precedence is local-first: the first root listed shadows every later one,
/// so a project-local `tools/` directory overrides a user-global install of
/// the same identifier. The policy is the single source of truth for search
/// order — existence checks, execution resolution, and enumeration all
/// consume the same instance, so the answer to "does this tool exist" and
/// "which copy runs" can never diverge.
#[derive(Clone, Debug)]
pub struct SearchPolicy {
    roots: Vec<PathBuf>,
}

impl SearchPolicy {
    /// Creates a policy from the supplied roots, highest precedence first.
    ///
    /// Roots do not need to exist yet; missing directories are skipped at
    /// lookup time.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidPolicy`] when no roots are supplied.
    pub fn new(roots: Vec<PathBuf>) -> ToolResult<Self> {
        if roots.is_empty() {
            return Err(ToolError::InvalidPolicy {
                reason: "at least one search root must be supplied".into(),
            });
        }
        Ok(Self { roots })
    }

    /// Returns the search roots in precedence order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn artifact(&self, root: &Path, tool: &ToolId) -> PathBuf {
        root.join(format!("{tool}.{TOOL_EXTENSION}"))
    }
}

/// Stateless registry answering lookup and enumeration queries.
///
/// Nothing is cached: every call re-reads the filesystem, so the registry
/// always reflects the tools currently on disk.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    policy: SearchPolicy,
}

impl ToolRegistry {
    /// Creates a registry over the supplied search policy.
    #[must_use]
    pub fn new(policy: SearchPolicy) -> Self {
        Self { policy }
    }

    /// Returns the search policy this registry consults.
    #[must_use]
    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Resolves a tool identifier to the executable that would run for it.
    ///
    /// The first root containing `<id>.sh` wins.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] when no root contains the artifact.
    pub fn resolve(&self, tool: &ToolId) -> ToolResult<PathBuf> {
        for root in self.policy.roots() {
            let candidate = self.policy.artifact(root, tool);
            if candidate.is_file() {
                debug!(tool = %tool, path = %candidate.display(), "resolved tool");
                return Ok(candidate);
            }
        }
        Err(ToolError::NotFound {
            name: tool.to_string(),
        })
    }

    /// Returns `true` when the identifier resolves under the same policy
    /// that [`resolve`](Self::resolve) applies.
    #[must_use]
    pub fn contains(&self, tool: &ToolId) -> bool {
        self.resolve(tool).is_ok()
    }

    /// Enumerates every discoverable tool identifier across all roots,
    /// deduplicated and sorted for deterministic output.
    ///
    /// Missing roots are skipped; artifacts whose stem is not a valid
    /// identifier are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Io`] when reading an existing root fails.
    pub fn list(&self) -> ToolResult<Vec<ToolId>> {
        let mut ids = BTreeSet::new();
        for root in self.policy.roots() {
            if !root.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(root)? {
                let path = entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(TOOL_EXTENSION) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                match ToolId::new(stem) {
                    Ok(id) => {
                        ids.insert(id);
                    }
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "skipping non-tool artifact");
                    }
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}

/// Errors produced by tool resolution, metadata access, and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Requested tool does not exist in any search location.
    #[error("tool `{name}` is not registered in any search location")]
    NotFound {
        /// Name of the missing tool.
        name: String,
    },

    /// Search policy failed validation.
    #[error("invalid search policy: {reason}")]
    InvalidPolicy {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Underlying I/O failure while reading a root or running a tool.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },

    /// Argument serialization for the sandbox failed.
    #[error("failed to serialize tool arguments: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },
}
