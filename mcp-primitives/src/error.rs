//! Shared error definitions for protocol primitives.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the protocol engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating protocol primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Tool identifier failed validation.
    #[error("invalid tool id `{id}`: {reason}")]
    InvalidToolId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

/// Machine-readable failure codes carried inside the response envelope.
///
/// The protocol-level codes map onto HTTP-style status integers; an
/// `EXECUTION_ERROR` instead mirrors the tool's own exit code in
/// `status.code`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request body did not parse or validate as a protocol envelope.
    InvalidJson,
    /// A runtime capability the dispatcher requires is absent.
    MissingDependency,
    /// The named tool could not be resolved in any registry location.
    ToolNotFound,
    /// The tool subprocess terminated with a non-zero exit status.
    ExecutionError,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ExecutionError => "EXECUTION_ERROR",
        }
    }

    /// Returns the HTTP-style status integer for protocol-level failures.
    ///
    /// `ExecutionError` responses carry the tool's exit code instead; the
    /// value returned here is only used when the tool never ran.
    #[must_use]
    pub const fn protocol_status(self) -> i64 {
        match self {
            Self::InvalidJson => 400,
            Self::ToolNotFound => 404,
            Self::MissingDependency | Self::ExecutionError => 500,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
