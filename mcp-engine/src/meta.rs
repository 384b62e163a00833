//! Protocol self-description tools built directly on the registry.
//!
//! These behave like any other tool from the caller's perspective but are
//! implemented in-process against the registry and descriptor parser, so
//! they always agree with the search policy used for execution.

use std::path::PathBuf;

use mcp_primitives::{ErrorCode, Request, Response, Suggestion, ToolId};
use mcp_tools::descriptor::ToolDescriptor;
use mcp_tools::registry::{ToolError, ToolRegistry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Namespace reserved for protocol-level tools.
pub const META_CATEGORY: &str = "meta";
/// Identifier of the discovery meta-tool.
pub const DISCOVER: &str = "meta.discover";
/// Identifier of the description meta-tool.
pub const DESCRIBE: &str = "meta.describe";
/// Identifier of the schema meta-tool.
pub const SCHEMA: &str = "meta.schema";

/// Maximum number of suggested tools attached to discovery responses.
const MAX_SUGGESTIONS: usize = 3;

/// Returns `true` when the identifier lives in the reserved meta namespace.
#[must_use]
pub fn is_meta(tool: &ToolId) -> bool {
    tool.category() == META_CATEGORY
}

/// Routes a request for a `meta.*` tool to its implementation.
///
/// Unknown identifiers in the reserved namespace are reported as
/// `TOOL_NOT_FOUND`; they can never resolve to an on-disk artifact.
#[must_use]
pub fn dispatch_meta(registry: &ToolRegistry, request: &Request) -> Response {
    match request.tool().as_str() {
        DISCOVER => discover(registry, request),
        DESCRIBE => describe(registry, request),
        SCHEMA => schema(registry, request),
        other => Response::protocol_failure(
            request.conversation_id(),
            ErrorCode::ToolNotFound,
            format!("tool `{other}` is not registered in any search location"),
        ),
    }
}

#[derive(Debug, Default, Deserialize)]
struct DiscoverArgs {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ToolArgs {
    tool: String,
}

fn discover(registry: &ToolRegistry, request: &Request) -> Response {
    let args: DiscoverArgs = match parse_args(request) {
        Ok(args) => args,
        Err(response) => return response,
    };

    let ids = match registry.list() {
        Ok(ids) => ids,
        Err(err) => return registry_failure(request, &err),
    };

    let mut entries = Vec::new();
    let mut suggestions = Vec::new();
    for id in ids {
        if let Some(category) = &args.category {
            if !matches_category(&id, category) {
                continue;
            }
        }

        let Ok(path) = registry.resolve(&id) else {
            continue;
        };
        let descriptor = match ToolDescriptor::from_file(&id, &path) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(tool = %id, error = %err, "skipping unreadable tool source");
                continue;
            }
        };

        if let Some(tags) = &args.tags {
            if !tags.iter().any(|tag| descriptor.tags().contains(tag)) {
                continue;
            }
        }

        if suggestions.len() < MAX_SUGGESTIONS {
            suggestions.push(Suggestion::new(id.as_str(), descriptor.description()));
        }
        entries.push(json!({
            "name": id.as_str(),
            "description": descriptor.description(),
            "version": descriptor.version(),
            "author": descriptor.author(),
            "tags": descriptor.tags(),
        }));
    }

    let count = entries.len();
    Response::success(
        request.conversation_id(),
        json!({"tools": entries, "count": count}),
    )
    .with_suggestions(suggestions)
}

fn describe(registry: &ToolRegistry, request: &Request) -> Response {
    let args: ToolArgs = match parse_args(request) {
        Ok(args) => args,
        Err(response) => return response,
    };
    let (id, path) = match lookup(registry, request, &args.tool) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };
    let descriptor = match ToolDescriptor::from_file(&id, &path) {
        Ok(descriptor) => descriptor,
        Err(err) => return registry_failure(request, &err),
    };

    let body = json!({
        "name": id.as_str(),
        "description": descriptor.description(),
        "version": descriptor.version(),
        "author": descriptor.author(),
        "tags": descriptor.tags(),
        "schema": effective_schema(&descriptor),
        "args_doc": descriptor.args_doc(),
        "examples": descriptor.examples(),
    });
    let explanation = synthesize_explanation(&id, &descriptor);
    Response::success(request.conversation_id(), body).with_explanation(explanation)
}

fn schema(registry: &ToolRegistry, request: &Request) -> Response {
    let args: ToolArgs = match parse_args(request) {
        Ok(args) => args,
        Err(response) => return response,
    };
    let (id, path) = match lookup(registry, request, &args.tool) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };
    let descriptor = match ToolDescriptor::from_file(&id, &path) {
        Ok(descriptor) => descriptor,
        Err(err) => return registry_failure(request, &err),
    };

    Response::success(request.conversation_id(), effective_schema(&descriptor))
}

fn parse_args<T: DeserializeOwned>(request: &Request) -> Result<T, Response> {
    serde_json::from_value(Value::Object(request.args().clone())).map_err(|err| {
        Response::protocol_failure(
            request.conversation_id(),
            ErrorCode::InvalidJson,
            format!("invalid arguments for `{}`: {err}", request.tool()),
        )
    })
}

fn lookup(
    registry: &ToolRegistry,
    request: &Request,
    name: &str,
) -> Result<(ToolId, PathBuf), Response> {
    let not_found = || {
        Response::protocol_failure(
            request.conversation_id(),
            ErrorCode::ToolNotFound,
            format!("tool `{name}` is not registered in any search location"),
        )
    };

    let Ok(id) = ToolId::new(name) else {
        return Err(not_found());
    };
    match registry.resolve(&id) {
        Ok(path) => Ok((id, path)),
        Err(ToolError::NotFound { .. }) => Err(not_found()),
        Err(err) => Err(registry_failure(request, &err)),
    }
}

fn registry_failure(request: &Request, err: &ToolError) -> Response {
    Response::protocol_failure(
        request.conversation_id(),
        ErrorCode::ExecutionError,
        err.to_string(),
    )
}

/// Accepts both `system` and `system.*` filter spellings.
fn matches_category(id: &ToolId, filter: &str) -> bool {
    let filter = filter.strip_suffix(".*").unwrap_or(filter);
    id.as_str()
        .strip_prefix(filter)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

fn effective_schema(descriptor: &ToolDescriptor) -> Value {
    if descriptor.has_schema() {
        descriptor.schema().clone()
    } else {
        json!({"type": "object", "properties": {}})
    }
}

fn synthesize_explanation(id: &ToolId, descriptor: &ToolDescriptor) -> String {
    let mut text = format!(
        "`{id}` (v{}, by {})",
        descriptor.version(),
        descriptor.author()
    );
    if descriptor.description().is_empty() {
        text.push('.');
    } else {
        text.push_str(": ");
        text.push_str(descriptor.description());
        if !text.ends_with('.') {
            text.push('.');
        }
    }
    if !descriptor.tags().is_empty() {
        let tags: Vec<&str> = descriptor.tags().iter().map(String::as_str).collect();
        text.push_str(&format!(" Tagged {}.", tags.join(", ")));
    }
    text.push_str(" Invoke it with a JSON args object; `meta.schema` returns the accepted shape.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_namespace_detection() {
        assert!(is_meta(&ToolId::new("meta.discover").unwrap()));
        assert!(!is_meta(&ToolId::new("system.info").unwrap()));
        assert!(!is_meta(&ToolId::new("metadata.read").unwrap()));
    }

    #[test]
    fn category_filter_accepts_both_spellings() {
        let id = ToolId::new("system.info").unwrap();
        assert!(matches_category(&id, "system"));
        assert!(matches_category(&id, "system.*"));
        assert!(!matches_category(&id, "sys"));
        assert!(!matches_category(&id, "net"));
    }

    #[test]
    fn schema_defaults_when_tool_declares_none() {
        let descriptor =
            ToolDescriptor::parse(&ToolId::new("bare").unwrap(), "#!/bin/sh\necho '{}'\n");
        assert_eq!(
            effective_schema(&descriptor),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn explanation_mentions_version_and_description() {
        let descriptor = ToolDescriptor::parse(
            &ToolId::new("system.info").unwrap(),
            "# Tool: system.info\n# Description: Report host identity\n# Version: 1.2.0\n",
        );
        let text = synthesize_explanation(&ToolId::new("system.info").unwrap(), &descriptor);
        assert!(text.contains("v1.2.0"));
        assert!(text.contains("Report host identity."));
    }
}
