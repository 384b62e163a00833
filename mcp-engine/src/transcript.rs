//! Append-only request/response transcript.

use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Result alias for transcript operations.
pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Errors emitted while appending transcript entries.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Underlying I/O failure while opening or writing the log file.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
}

/// Kind of a transcript entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordKind {
    /// An inbound request envelope.
    Request,
    /// An outbound response envelope.
    Response,
}

impl RecordKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
        }
    }
}

/// Sink receiving every validated request and every built response.
///
/// Appends are best-effort from the dispatcher's perspective: a failing sink
/// is logged and never blocks response delivery.
#[async_trait]
pub trait Transcript: Send + Sync {
    /// Records an inbound request envelope.
    async fn record_request(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()>;

    /// Records an outbound response envelope.
    async fn record_response(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()>;
}

/// File-backed transcript writing one line per envelope.
///
/// Lines have the form `<UTC timestamp> [<conversation_id>] REQUEST: <json>`.
/// A mutex serializes writers so concurrent appends never interleave.
pub struct FileTranscript {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileTranscript {
    /// Opens (or creates) the transcript file at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors encountered while preparing the file.
    pub async fn open(path: impl Into<PathBuf>) -> TranscriptResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the underlying path of the transcript file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(
        &self,
        kind: RecordKind,
        conversation_id: &str,
        body: &Value,
    ) -> TranscriptResult<()> {
        let line = format!(
            "{} [{}] {}: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            conversation_id,
            kind.label(),
            body
        );
        let mut guard = self.file.lock().await;
        guard.write_all(line.as_bytes()).await?;
        guard.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transcript for FileTranscript {
    async fn record_request(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()> {
        self.append(RecordKind::Request, conversation_id, body).await
    }

    async fn record_response(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()> {
        self.append(RecordKind::Response, conversation_id, body)
            .await
    }
}

/// A recorded entry captured by [`CollectingTranscript`].
#[derive(Clone, Debug)]
pub struct RecordedEntry {
    kind: RecordKind,
    conversation_id: String,
    body: Value,
}

impl RecordedEntry {
    /// Returns whether the entry was a request or response.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the conversation identifier the entry was keyed by.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the recorded envelope body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Transcript used during testing to capture entries in memory.
#[derive(Default)]
pub struct CollectingTranscript {
    entries: StdMutex<Vec<RecordedEntry>>,
}

impl CollectingTranscript {
    /// Creates an empty collecting transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected entries, clearing the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<RecordedEntry> {
        let mut guard = self.entries.lock().expect("collecting transcript poisoned");
        guard.drain(..).collect()
    }

    fn push(&self, kind: RecordKind, conversation_id: &str, body: &Value) {
        self.entries
            .lock()
            .expect("collecting transcript poisoned")
            .push(RecordedEntry {
                kind,
                conversation_id: conversation_id.to_owned(),
                body: body.clone(),
            });
    }
}

#[async_trait]
impl Transcript for CollectingTranscript {
    async fn record_request(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()> {
        self.push(RecordKind::Request, conversation_id, body);
        Ok(())
    }

    async fn record_response(&self, conversation_id: &str, body: &Value) -> TranscriptResult<()> {
        self.push(RecordKind::Response, conversation_id, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn temp_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("mcp-transcript-{}.log", uuid::Uuid::new_v4()));
        path
    }

    #[tokio::test]
    async fn appends_request_and_response_lines() {
        let path = temp_path();
        let transcript = FileTranscript::open(&path).await.unwrap();

        transcript
            .record_request("c-9", &json!({"tool": "system.info"}))
            .await
            .unwrap();
        transcript
            .record_response("c-9", &json!({"status": {"code": 0}}))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[c-9] REQUEST: {\"tool\":\"system.info\"}"));
        assert!(lines[1].contains("[c-9] RESPONSE: "));
        // Each line leads with an RFC 3339 UTC timestamp.
        assert!(lines.iter().all(|line| line.ends_with('}')));
        assert!(lines.iter().all(|line| line.contains('T') && line.contains('Z')));

        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }

    #[tokio::test]
    async fn collecting_transcript_captures_entries() {
        let transcript = CollectingTranscript::new();
        transcript
            .record_request("none", &json!({"tool": "fs.list"}))
            .await
            .unwrap();

        let entries = transcript.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind(), RecordKind::Request);
        assert_eq!(entries[0].conversation_id(), "none");
        assert!(transcript.drain().is_empty());
    }
}
