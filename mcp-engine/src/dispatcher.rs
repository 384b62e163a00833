//! Per-request orchestration of the protocol pipeline.

use std::sync::Arc;

use mcp_primitives::{ErrorCode, Request, Response, NO_CONVERSATION};
use mcp_tools::registry::{ToolError, ToolRegistry};
use mcp_tools::sandbox::Sandbox;
use tracing::{info, warn};

use crate::meta;
use crate::request::{check_dependencies, parse_request};
use crate::response;
use crate::transcript::Transcript;

/// Stateless dispatcher driving one request through validation, resolution,
/// execution, and response assembly.
///
/// Every failure mode is converted into a well-formed response envelope; a
/// dispatch never returns an error and never panics on caller input.
pub struct Dispatcher {
    registry: ToolRegistry,
    sandbox: Sandbox,
    transcript: Option<Arc<dyn Transcript>>,
    required_dependencies: Vec<String>,
}

impl Dispatcher {
    /// Creates a dispatcher over the supplied registry with a default
    /// sandbox, no transcript, and no dependency preflight.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            sandbox: Sandbox::new(),
            transcript: None,
            required_dependencies: Vec::new(),
        }
    }

    /// Replaces the execution sandbox.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Installs the append-only request/response transcript.
    #[must_use]
    pub fn with_transcript(mut self, transcript: Arc<dyn Transcript>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Adds a binary that tool scripts require at runtime; its absence
    /// fails requests with `MISSING_DEPENDENCY` before validation.
    #[must_use]
    pub fn with_required_dependency(mut self, name: impl Into<String>) -> Self {
        self.required_dependencies.push(name.into());
        self
    }

    /// Returns the registry this dispatcher resolves against.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatches a raw request payload, returning the response envelope.
    ///
    /// The dependency preflight runs before validation; a payload that does
    /// not parse is rejected without touching the registry.
    pub async fn dispatch_bytes(&self, raw: &[u8]) -> Response {
        if let Err(err) = check_dependencies(&self.required_dependencies) {
            warn!(error = %err, "dependency preflight failed");
            let response = Response::protocol_failure(
                NO_CONVERSATION,
                ErrorCode::MissingDependency,
                err.to_string(),
            );
            self.record_response(&response).await;
            return response;
        }

        match parse_request(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                warn!(error = %err, "rejecting request envelope");
                let response = Response::protocol_failure(
                    NO_CONVERSATION,
                    ErrorCode::InvalidJson,
                    err.to_string(),
                );
                self.record_response(&response).await;
                response
            }
        }
    }

    /// Dispatches an already-validated request.
    pub async fn dispatch(&self, request: Request) -> Response {
        self.record_request(&request).await;
        info!(
            tool = %request.tool(),
            conversation_id = request.conversation_id(),
            "dispatching request"
        );

        let response = if meta::is_meta(request.tool()) {
            meta::dispatch_meta(&self.registry, &request)
        } else {
            self.invoke_tool(&request).await
        };

        self.record_response(&response).await;
        response
    }

    async fn invoke_tool(&self, request: &Request) -> Response {
        let path = match self.registry.resolve(request.tool()) {
            Ok(path) => path,
            Err(err @ ToolError::NotFound { .. }) => {
                return Response::protocol_failure(
                    request.conversation_id(),
                    ErrorCode::ToolNotFound,
                    err.to_string(),
                );
            }
            Err(err) => {
                return Response::protocol_failure(
                    request.conversation_id(),
                    ErrorCode::ExecutionError,
                    err.to_string(),
                );
            }
        };

        match self.sandbox.execute(&path, request.args()).await {
            Ok(outcome) => response::from_outcome(request, &outcome),
            Err(err) => {
                warn!(tool = %request.tool(), error = %err, "sandbox failed to run tool");
                Response::protocol_failure(
                    request.conversation_id(),
                    ErrorCode::ExecutionError,
                    err.to_string(),
                )
            }
        }
    }

    async fn record_request(&self, request: &Request) {
        let Some(transcript) = &self.transcript else {
            return;
        };
        match serde_json::to_value(request) {
            Ok(body) => {
                if let Err(err) = transcript
                    .record_request(request.conversation_id(), &body)
                    .await
                {
                    warn!(error = %err, "transcript append failed");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode request for transcript"),
        }
    }

    async fn record_response(&self, response: &Response) {
        let Some(transcript) = &self.transcript else {
            return;
        };
        match serde_json::to_value(response) {
            Ok(body) => {
                if let Err(err) = transcript
                    .record_response(response.conversation_id(), &body)
                    .await
                {
                    warn!(error = %err, "transcript append failed");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode response for transcript"),
        }
    }
}
