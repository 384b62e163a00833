//! Core shared types for the Machine Chat Protocol engine.

#![warn(missing_docs, clippy::pedantic)]

mod envelope;
mod error;
mod ids;

/// Request and response envelopes exchanged with callers.
pub use envelope::{
    ErrorBody, Request, RequestContext, Response, Status, Suggestion, NO_CONVERSATION,
};
/// Error taxonomy and result alias shared across the engine.
pub use error::{Error, ErrorCode, Result};
/// Validated identifier for a tool within the registry.
pub use ids::ToolId;
