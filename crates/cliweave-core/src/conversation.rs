//! Conversation history types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::tool::{ExecutionMode, Tool};

/// Outcome of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Success,
    Error,
    Timeout,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::Success => "success",
            TurnStatus::Error => "error",
            TurnStatus::Timeout => "timeout",
        }
    }

    /// Parse a stored status, treating unknown values as errors.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "success" => TurnStatus::Success,
            "timeout" => TurnStatus::Timeout,
            _ => TurnStatus::Error,
        }
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a conversation was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Started by a person
    #[default]
    User,
    /// Started by automation
    Internal,
    /// Analysis produced for later review
    Insight,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::User => "user",
            Category::Internal => "internal",
            Category::Insight => "insight",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Category::User),
            "internal" => Ok(Category::Internal),
            "insight" => Ok(Category::Insight),
            other => Err(Error::Config(format!(
                "Unknown category '{}'. Valid values: user, internal, insight",
                other
            ))),
        }
    }
}

/// Captured process output for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCapture {
    /// Leading part of stdout
    pub stdout: String,
    /// Leading part of stderr
    pub stderr: String,
    /// Whether either preview was cut
    pub truncated: bool,
    /// Full output, only kept when caching was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<String>,
}

impl OutputCapture {
    /// Build previews from the complete output of an invocation.
    pub fn capture(
        stdout: &str,
        stderr: &str,
        stdout_limit: usize,
        stderr_limit: usize,
        cache_full: bool,
    ) -> Self {
        let (out, out_cut) = truncate_utf8(stdout, stdout_limit);
        let (err, err_cut) = truncate_utf8(stderr, stderr_limit);
        let cached = cache_full.then(|| {
            if stderr.is_empty() {
                stdout.to_string()
            } else {
                format!("{}\n[stderr]\n{}", stdout, stderr)
            }
        });

        Self {
            stdout: out.to_string(),
            stderr: err.to_string(),
            truncated: out_cut || err_cut,
            cached,
        }
    }

    /// Best available assistant text: the cached copy if present, else the preview.
    pub fn text(&self) -> &str {
        self.cached.as_deref().unwrap_or(&self.stdout)
    }
}

/// Cut `s` to at most `max` bytes without splitting a character.
///
/// Returns the kept prefix and whether anything was removed.
pub fn truncate_utf8(s: &str, max: usize) -> (&str, bool) {
    if s.len() <= max {
        return (s, false);
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    (&s[..end], true)
}

/// One prompt/response cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based position within the owning conversation
    pub index: u32,
    /// Completion time of the invocation
    pub timestamp: DateTime<Utc>,
    /// Prompt as the user wrote it (before any context injection)
    pub prompt: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    pub status: TurnStatus,
    pub exit_code: Option<i32>,
    pub output: OutputCapture,
    /// Originating conversation for turns copied in by a merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl Turn {
    /// Create a turn that has not yet been placed in a conversation.
    pub fn new(
        prompt: impl Into<String>,
        timestamp: DateTime<Utc>,
        duration_ms: u64,
        status: TurnStatus,
        exit_code: Option<i32>,
        output: OutputCapture,
    ) -> Self {
        Self {
            index: 0,
            timestamp,
            prompt: prompt.into(),
            duration_ms,
            status,
            exit_code,
            output,
            source_id: None,
        }
    }

    /// Tag the turn with the conversation it came from.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

/// A multi-turn history with one assistant tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tool that produced the most recent turn
    pub tool: Tool,
    pub model: Option<String>,
    pub mode: ExecutionMode,
    pub category: Category,
    pub total_duration_ms: u64,
    pub turn_count: u32,
    pub latest_status: Option<TurnStatus>,
    pub turns: Vec<Turn>,
    /// Conversation this one was forked from
    pub parent_id: Option<String>,
    /// Source conversations when this record was built by a merge
    #[serde(default)]
    pub merged_from: Vec<String>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(
        id: impl Into<String>,
        tool: Tool,
        model: Option<String>,
        mode: ExecutionMode,
        category: Category,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            tool,
            model,
            mode,
            category,
            total_duration_ms: 0,
            turn_count: 0,
            latest_status: None,
            turns: vec![],
            parent_id: None,
            merged_from: vec![],
        }
    }

    /// Generate a fresh, sortable conversation id for `tool`.
    pub fn generate_id(tool: Tool) -> String {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", stamp, tool, &suffix[..8])
    }

    /// Index the next appended turn will receive.
    pub fn next_index(&self) -> u32 {
        self.turn_count + 1
    }

    /// Append a completed turn, numbering it and updating the aggregates.
    pub fn append_turn(&mut self, mut turn: Turn) -> &Turn {
        turn.index = self.next_index();
        self.turn_count = turn.index;
        self.total_duration_ms += turn.duration_ms;
        self.latest_status = Some(turn.status);
        if turn.timestamp > self.updated_at {
            self.updated_at = turn.timestamp;
        }
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// Most recent turn, if any.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Check `turn_count == turns.len()` and that turns are numbered 1..=n.
    pub fn is_consistent(&self) -> bool {
        self.turn_count as usize == self.turns.len()
            && self
                .turns
                .iter()
                .enumerate()
                .all(|(i, t)| t.index as usize == i + 1)
    }
}

/// Link between a conversation and the tool's own session artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSessionMapping {
    pub conversation_id: String,
    pub tool: Tool,
    /// Session identifier understood by the tool's resume flag
    pub native_session_id: String,
    /// Session file written by the tool, when known
    pub native_session_path: Option<PathBuf>,
    /// Hash of the working directory the session belongs to
    pub project_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NativeSessionMapping {
    pub fn new(
        conversation_id: impl Into<String>,
        tool: Tool,
        native_session_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            tool,
            native_session_id: native_session_id.into(),
            native_session_path: None,
            project_hash: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.native_session_path = Some(path.into());
        self
    }

    pub fn with_project_hash(mut self, hash: impl Into<String>) -> Self {
        self.project_hash = Some(hash.into());
        self
    }

    /// Whether the recorded artifact still exists (true when no path was recorded).
    pub fn artifact_present(&self) -> bool {
        self.native_session_path
            .as_ref()
            .map(|p| p.exists())
            .unwrap_or(true)
    }
}
