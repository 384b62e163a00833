//! Inbound payload validation and runtime dependency preflight.

use std::path::Path;

use mcp_primitives::Request;
use thiserror::Error;

/// Result alias for engine-level validation.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures detected before any tool is resolved or executed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The payload did not parse or validate as a request envelope.
    #[error("request body is not a valid protocol envelope: {source}")]
    InvalidJson {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },

    /// A runtime capability required by tool scripts is absent.
    #[error("required dependency `{name}` was not found on PATH")]
    MissingDependency {
        /// Name of the missing binary.
        name: String,
    },
}

/// Parses a raw byte payload into a validated [`Request`].
///
/// Structural defaults (`args = {}`, `conversation_id = "none"`) are applied
/// during deserialization; any shape violation — non-object `args`, a
/// malformed or empty `tool` identifier — is an [`EngineError::InvalidJson`].
///
/// # Errors
///
/// Returns [`EngineError::InvalidJson`] when the payload cannot be decoded.
pub fn parse_request(raw: &[u8]) -> EngineResult<Request> {
    Ok(serde_json::from_slice(raw)?)
}

/// Verifies that every named dependency is reachable on `PATH`.
///
/// Runs before request validation: a missing processor fails the request
/// with `MISSING_DEPENDENCY` instead of surfacing as a tool error mid-run.
///
/// # Errors
///
/// Returns [`EngineError::MissingDependency`] naming the first absent
/// binary.
pub fn check_dependencies(names: &[String]) -> EngineResult<()> {
    for name in names {
        if !dependency_available(name) {
            return Err(EngineError::MissingDependency { name: name.clone() });
        }
    }
    Ok(())
}

fn dependency_available(name: &str) -> bool {
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return candidate.is_file();
    }
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
    })
}
