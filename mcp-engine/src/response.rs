//! Construction of response envelopes from execution outcomes.

use mcp_primitives::{ErrorBody, ErrorCode, Request, Response, Status};
use mcp_tools::sandbox::ExecutionOutcome;
use serde_json::{json, Value};

/// Maps a completed sandbox run onto the outbound envelope.
///
/// A zero exit becomes a success carrying the tool's stdout decoded as JSON;
/// anything else becomes an `EXECUTION_ERROR` whose `status.code` mirrors
/// the tool's exit code and whose details carry it alongside the raw
/// stderr.
#[must_use]
pub fn from_outcome(request: &Request, outcome: &ExecutionOutcome) -> Response {
    if outcome.is_success() {
        return Response::success(request.conversation_id(), decode_result(outcome.stdout()));
    }

    let mut error = ErrorBody::new(ErrorCode::ExecutionError, outcome.stderr().trim())
        .with_detail("exit_code", json!(outcome.exit_code()));
    if outcome.is_timed_out() {
        error = error.with_detail("timed_out", json!(true));
    }

    Response::failure(
        request.conversation_id(),
        Status::tool_failure(outcome.exit_code()),
        error,
    )
}

/// Decodes tool stdout into the result value.
///
/// The tool contract guarantees a single JSON value; a violating tool
/// degrades to a JSON string of its raw output instead of failing an
/// otherwise successful execution.
fn decode_result(stdout: &str) -> Value {
    serde_json::from_str(stdout)
        .unwrap_or_else(|_| Value::String(stdout.trim_end_matches('\n').to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use mcp_primitives::ToolId;

    fn request() -> Request {
        Request::new(ToolId::new("system.info").unwrap()).with_conversation_id("c-7")
    }

    #[test]
    fn zero_exit_maps_to_success() {
        let outcome = ExecutionOutcome::new(0, "{\"hostname\": \"alpha\"}\n", "");
        let response = from_outcome(&request(), &outcome);

        assert!(response.is_success());
        assert_eq!(response.conversation_id(), "c-7");
        assert_eq!(response.status().code(), 0);
        assert_eq!(response.result().unwrap()["hostname"], "alpha");
        assert!(response.error().is_none());
    }

    #[test]
    fn nonzero_exit_maps_to_execution_error() {
        let outcome = ExecutionOutcome::new(2, "", "no such directory\n");
        let response = from_outcome(&request(), &outcome);

        assert!(!response.is_success());
        assert_eq!(response.status().code(), 2);
        assert_eq!(response.status().message(), "Tool execution failed");
        let error = response.error().unwrap();
        assert_eq!(error.code(), ErrorCode::ExecutionError);
        assert_eq!(error.message(), "no such directory");
        assert_eq!(error.details()["exit_code"], json!(2));
    }

    #[test]
    fn timed_out_outcome_carries_marker() {
        let outcome = ExecutionOutcome::timed_out(std::time::Duration::from_secs(30));
        let response = from_outcome(&request(), &outcome);

        assert_eq!(response.status().code(), 124);
        let error = response.error().unwrap();
        assert_eq!(error.details()["timed_out"], json!(true));
    }

    #[test]
    fn non_json_stdout_degrades_to_string() {
        let outcome = ExecutionOutcome::new(0, "plain text\n", "");
        let response = from_outcome(&request(), &outcome);
        assert_eq!(response.result().unwrap(), &json!("plain text"));
    }
}
