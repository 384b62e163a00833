//! Machine Chat Protocol dispatcher binary.
//!
//! Reads a request envelope from stdin and emits the response envelope on
//! stdout; `--list` and `--describe` are shorthands for the discovery
//! meta-tools. Diagnostics go to stderr so stdout stays parseable.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_engine::{meta, Dispatcher, FileTranscript};
use mcp_primitives::{ErrorCode, Request, Response, ToolId};
use mcp_tools::registry::{SearchPolicy, ToolRegistry};
use mcp_tools::sandbox::Sandbox;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying colon-separated tool search directories.
const TOOL_PATH_ENV: &str = "MCP_TOOL_PATH";
/// Environment variable selecting the transcript destination.
const LOG_FILE_ENV: &str = "MCP_LOG_FILE";

#[derive(Debug, Parser)]
#[command(name = "mcp", version, about = "Machine Chat Protocol dispatcher")]
struct Cli {
    /// List every discoverable tool (shorthand for `meta.discover`).
    #[arg(long)]
    list: bool,

    /// Describe a single tool (shorthand for `meta.describe`).
    #[arg(long, value_name = "TOOL", conflicts_with = "list")]
    describe: Option<String>,

    /// Tool search directory, highest precedence first (repeatable).
    #[arg(long = "tools-dir", value_name = "DIR")]
    tools_dirs: Vec<PathBuf>,

    /// Request/response transcript destination.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Tool execution deadline in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let dispatcher = build_dispatcher(&cli).await?;

    let (request_bytes, pretty) = if cli.list {
        (meta_request(meta::DISCOVER, Map::new())?, true)
    } else if let Some(tool) = &cli.describe {
        let mut args = Map::new();
        args.insert("tool".to_owned(), Value::String(tool.clone()));
        (meta_request(meta::DESCRIBE, args)?, true)
    } else {
        let mut payload = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut payload)
            .await
            .context("failed to read request from stdin")?;
        (payload, false)
    };

    let response = dispatcher.dispatch_bytes(&request_bytes).await;
    emit(&response, pretty)?;

    if is_prevalidation_fatal(&response) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn build_dispatcher(cli: &Cli) -> Result<Dispatcher> {
    let policy = SearchPolicy::new(search_roots(cli)).context("invalid tool search path")?;
    let mut dispatcher = Dispatcher::new(ToolRegistry::new(policy));

    if let Some(seconds) = cli.timeout {
        dispatcher =
            dispatcher.with_sandbox(Sandbox::new().with_timeout(Duration::from_secs(seconds)));
    }

    if let Some(path) = transcript_path(cli) {
        match FileTranscript::open(&path).await {
            Ok(transcript) => dispatcher = dispatcher.with_transcript(Arc::new(transcript)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "transcript disabled");
            }
        }
    }

    Ok(dispatcher)
}

/// Search roots in precedence order: explicit flags, then the environment,
/// then the project-local `tools/` directory ahead of the user-global one.
fn search_roots(cli: &Cli) -> Vec<PathBuf> {
    if !cli.tools_dirs.is_empty() {
        return cli.tools_dirs.clone();
    }

    if let Some(path) = std::env::var_os(TOOL_PATH_ENV) {
        let roots: Vec<PathBuf> = std::env::split_paths(&path).collect();
        if !roots.is_empty() {
            return roots;
        }
    }

    let mut roots = vec![PathBuf::from("tools")];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".mcp").join("tools"));
    }
    roots
}

fn transcript_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.log_file {
        return Some(path.clone());
    }
    if let Some(path) = std::env::var_os(LOG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".mcp").join("requests.log"))
}

fn meta_request(tool: &str, args: Map<String, Value>) -> Result<Vec<u8>> {
    let id = ToolId::new(tool).context("invalid meta tool id")?;
    let request = Request::new(id).with_args(args);
    Ok(serde_json::to_vec(&request)?)
}

fn emit(response: &Response, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    println!("{rendered}");
    Ok(())
}

/// Errors travel inside the envelope, so the process reports success for
/// any emitted response except the pre-validation fatal conditions.
fn is_prevalidation_fatal(response: &Response) -> bool {
    matches!(
        response.error().map(mcp_primitives::ErrorBody::code),
        Some(ErrorCode::InvalidJson | ErrorCode::MissingDependency)
    )
}
