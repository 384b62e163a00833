//! Machine Chat Protocol engine.
//!
//! This crate wires the protocol pipeline together: request validation, tool
//! resolution through the registry, sandboxed execution, meta-tool handling,
//! and response-envelope construction. Each request is independent — the
//! dispatcher holds no state across invocations and re-reads the filesystem
//! for every registry or descriptor query.

#![warn(missing_docs, clippy::pedantic)]

mod dispatcher;
pub mod meta;
mod request;
mod response;
mod transcript;

/// Per-request orchestration of the protocol pipeline.
pub use dispatcher::Dispatcher;
/// Validation errors surfaced before a tool is resolved.
pub use request::{check_dependencies, parse_request, EngineError, EngineResult};
/// Pure mapping from execution outcomes to response envelopes.
pub use response::from_outcome;
/// Append-only request/response logging.
pub use transcript::{
    CollectingTranscript, FileTranscript, RecordKind, RecordedEntry, Transcript, TranscriptError,
    TranscriptResult,
};
