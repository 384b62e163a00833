//! Request and response envelopes exchanged between caller and dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorCode;
use crate::ids::ToolId;

/// Sentinel conversation identifier used when the caller supplies none.
pub const NO_CONVERSATION: &str = "none";

fn default_conversation_id() -> String {
    NO_CONVERSATION.to_owned()
}

/// Inbound request envelope naming a tool and its arguments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    tool: ToolId,
    #[serde(default)]
    args: Map<String, Value>,
    #[serde(default = "default_conversation_id")]
    conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<RequestContext>,
}

impl Request {
    /// Creates a request for the given tool with empty arguments.
    #[must_use]
    pub fn new(tool: ToolId) -> Self {
        Self {
            tool,
            args: Map::new(),
            conversation_id: default_conversation_id(),
            context: None,
        }
    }

    /// Replaces the argument object.
    #[must_use]
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    /// Sets the caller-supplied correlation token.
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    /// Attaches free-form caller context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the tool identifier this request targets.
    #[must_use]
    pub fn tool(&self) -> &ToolId {
        &self.tool
    }

    /// Returns the argument object passed to the tool.
    #[must_use]
    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Returns the opaque conversation identifier.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the optional caller context.
    #[must_use]
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }
}

/// Free-form context a caller may attach to a request.
///
/// The engine echoes nothing from this block into the response; it exists
/// for transcript inspection only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
}

impl RequestContext {
    /// Sets the stated user intent.
    #[must_use]
    pub fn with_user_intent(mut self, user_intent: impl Into<String>) -> Self {
        self.user_intent = Some(user_intent.into());
        self
    }

    /// Sets the caller's reasoning note.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Returns the stated user intent, if any.
    #[must_use]
    pub fn user_intent(&self) -> Option<&str> {
        self.user_intent.as_deref()
    }

    /// Returns the caller's reasoning note, if any.
    #[must_use]
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }
}

/// Outcome summary carried at the top of every response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Status {
    code: i64,
    message: String,
}

impl Status {
    /// Creates a status with the supplied code and message.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Status reported for a successful invocation.
    #[must_use]
    pub fn success() -> Self {
        Self::new(0, "Success")
    }

    /// Status reported when a tool subprocess exits non-zero.
    #[must_use]
    pub fn tool_failure(exit_code: i64) -> Self {
        Self::new(exit_code, "Tool execution failed")
    }

    /// Returns the numeric status code; `0` means success.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Returns the human-readable status message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Structured error payload present on failed responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    code: ErrorCode,
    message: String,
    #[serde(default)]
    details: Map<String, Value>,
}

impl ErrorBody {
    /// Creates an error payload with empty details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Adds a key to the detail object.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Returns the machine-readable failure code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the human-readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured failure details.
    #[must_use]
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}

/// A tool recommendation attached to discovery responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    tool: String,
    description: String,
}

impl Suggestion {
    /// Creates a suggestion entry.
    #[must_use]
    pub fn new(tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            description: description.into(),
        }
    }

    /// Returns the suggested tool identifier.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Returns the suggestion description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Outbound response envelope.
///
/// Exactly one of `result` / `error` is non-null; the constructors are the
/// only way to build a response, so the invariant cannot drift.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    conversation_id: String,
    status: Status,
    result: Option<Value>,
    error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<Suggestion>,
}

impl Response {
    /// Builds a successful response carrying the tool's result value.
    #[must_use]
    pub fn success(conversation_id: impl Into<String>, result: Value) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            status: Status::success(),
            result: Some(result),
            error: None,
            explanation: None,
            suggestions: Vec::new(),
        }
    }

    /// Builds a failed response with an explicit status.
    #[must_use]
    pub fn failure(conversation_id: impl Into<String>, status: Status, error: ErrorBody) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            status,
            result: None,
            error: Some(error),
            explanation: None,
            suggestions: Vec::new(),
        }
    }

    /// Builds a protocol-level failure whose status code derives from the
    /// error code's HTTP-style mapping.
    #[must_use]
    pub fn protocol_failure(
        conversation_id: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let status = Status::new(code.protocol_status(), status_message(code));
        Self::failure(conversation_id, status, ErrorBody::new(code, message))
    }

    /// Attaches a natural-language explanation.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Attaches suggested follow-up tools.
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Returns the echoed conversation identifier.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the outcome status.
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the result value, present only on success.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error payload, present only on failure.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorBody> {
        self.error.as_ref()
    }

    /// Returns the optional natural-language explanation.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns any suggested follow-up tools.
    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Returns `true` when the response carries a result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

fn status_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::InvalidJson => "Invalid request",
        ErrorCode::MissingDependency => "Missing dependency",
        ErrorCode::ToolNotFound => "Tool not found",
        ErrorCode::ExecutionError => "Tool execution failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_apply() {
        let request: Request =
            serde_json::from_value(json!({"tool": "system.info"})).expect("parse");
        assert_eq!(request.tool().as_str(), "system.info");
        assert!(request.args().is_empty());
        assert_eq!(request.conversation_id(), NO_CONVERSATION);
        assert!(request.context().is_none());
    }

    #[test]
    fn request_rejects_non_object_args() {
        let err = serde_json::from_value::<Request>(json!({
            "tool": "system.info",
            "args": [1, 2, 3],
        }));
        assert!(err.is_err());
    }

    #[test]
    fn request_carries_context() {
        let request: Request = serde_json::from_value(json!({
            "tool": "system.info",
            "conversation_id": "c-42",
            "context": {"user_intent": "check host", "reasoning": "routine"},
        }))
        .expect("parse");
        assert_eq!(request.conversation_id(), "c-42");
        let context = request.context().expect("context");
        assert_eq!(context.user_intent(), Some("check host"));
        assert_eq!(context.reasoning(), Some("routine"));
    }

    #[test]
    fn success_response_has_null_error() {
        let response = Response::success("c-1", json!({"ok": true}));
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["status"]["code"], 0);
        assert_eq!(value["result"]["ok"], true);
        assert_eq!(value["error"], Value::Null);
        assert!(value.get("explanation").is_none());
        assert!(value.get("suggestions").is_none());
    }

    #[test]
    fn failure_response_has_null_result() {
        let response = Response::protocol_failure(
            "c-2",
            ErrorCode::ToolNotFound,
            "tool `no.such.tool` is not registered",
        );
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["status"]["code"], 404);
        assert_eq!(value["result"], Value::Null);
        assert_eq!(value["error"]["code"], "TOOL_NOT_FOUND");
    }

    #[test]
    fn exactly_one_of_result_and_error() {
        let ok = Response::success("c", json!(1));
        assert!(ok.result().is_some() && ok.error().is_none());

        let failed = Response::failure(
            "c",
            Status::tool_failure(3),
            ErrorBody::new(ErrorCode::ExecutionError, "boom")
                .with_detail("exit_code", json!(3)),
        );
        assert!(failed.result().is_none() && failed.error().is_some());
        assert_eq!(failed.status().code(), 3);
    }
}
