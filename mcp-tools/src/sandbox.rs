//! Argument-file subprocess sandbox with a bounded execution deadline.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::registry::ToolResult;

/// Conventional exit code reported when the execution deadline expires.
pub const TIMEOUT_EXIT_CODE: i64 = 124;

/// Runs resolved tools as subprocesses.
///
/// Arguments travel through an ephemeral file whose path is the tool's sole
/// positional argument, so untrusted JSON values never become command-line
/// tokens. The file is removed on every exit path, including deadline
/// expiry.
#[derive(Clone, Debug)]
pub struct Sandbox {
    timeout: Duration,
}

impl Sandbox {
    /// Deadline applied when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a sandbox with the default deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the execution deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes the tool at `executable`, passing `args` via a temp file.
    ///
    /// A child that outlives the deadline is killed and reported as a
    /// timed-out outcome; a child terminated by a signal reports exit code
    /// `-1`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::registry::ToolError::Serialization`] when the
    /// argument object cannot be written, or
    /// [`crate::registry::ToolError::Io`] when the subprocess cannot be
    /// spawned.
    pub async fn execute(
        &self,
        executable: &Path,
        args: &Map<String, Value>,
    ) -> ToolResult<ExecutionOutcome> {
        let args_file = write_args_file(args)?;
        debug!(
            executable = %executable.display(),
            args_file = %args_file.path().display(),
            "spawning tool subprocess"
        );

        let child = Command::new(executable)
            .arg(args_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let outcome = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                ExecutionOutcome::new(
                    output.status.code().map_or(-1, i64::from),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
            Err(_) => {
                warn!(
                    executable = %executable.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "tool exceeded execution deadline"
                );
                ExecutionOutcome::timed_out(self.timeout)
            }
        };

        // args_file drops here: the temp file is removed whether the tool
        // succeeded, failed, or was killed at the deadline.
        Ok(outcome)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

fn write_args_file(args: &Map<String, Value>) -> ToolResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("mcp-args-")
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer(&mut file, args)?;
    file.flush()?;
    Ok(file)
}

/// Captured result of one tool subprocess run.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    exit_code: i64,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

impl ExecutionOutcome {
    /// Creates an outcome for a child that terminated on its own.
    #[must_use]
    pub fn new(exit_code: i64, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// Creates an outcome for a child killed at the deadline.
    #[must_use]
    pub fn timed_out(deadline: Duration) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            stdout: String::new(),
            stderr: format!(
                "tool did not complete within {}s",
                deadline.as_secs_f64()
            ),
            timed_out: true,
        }
    }

    /// Returns the subprocess exit code (`124` on timeout, `-1` on signal).
    #[must_use]
    pub const fn exit_code(&self) -> i64 {
        self.exit_code
    }

    /// Returns the captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Returns the captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Returns `true` when the child was killed at the deadline.
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// Returns `true` for a clean zero exit.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use serde_json::json;

    fn script(body: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("mcp-sandbox-{}.sh", uuid::Uuid::new_v4()));
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_tool() {
        let path = script("#!/bin/sh\ncat \"$1\"\n");
        let outcome = Sandbox::new()
            .execute(&path, &args(json!({"verbose": false})))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code(), 0);
        let echoed: Value = serde_json::from_str(outcome.stdout()).unwrap();
        assert_eq!(echoed, json!({"verbose": false}));

        fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn captures_stderr_and_exit_code_of_failing_tool() {
        let path = script("#!/bin/sh\necho 'disk not found' >&2\nexit 3\n");
        let outcome = Sandbox::new().execute(&path, &Map::new()).await.unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(outcome.stderr().trim(), "disk not found");

        fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn deadline_kills_runaway_tool() {
        let path = script("#!/bin/sh\nsleep 30\n");
        let sandbox = Sandbox::new().with_timeout(Duration::from_millis(200));
        let outcome = sandbox.execute(&path, &Map::new()).await.unwrap();

        assert!(outcome.is_timed_out());
        assert_eq!(outcome.exit_code(), TIMEOUT_EXIT_CODE);

        fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn args_file_is_removed_after_execution() {
        let path = script("#!/bin/sh\nprintf '%s' \"$1\"\n");
        let outcome = Sandbox::new()
            .execute(&path, &args(json!({"key": "value"})))
            .await
            .unwrap();

        let args_path = PathBuf::from(outcome.stdout().trim());
        assert!(args_path.to_string_lossy().contains("mcp-args-"));
        assert!(!args_path.exists());

        fs::remove_file(path).unwrap();
    }
}
