//! Supported assistant tools and execution modes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A command-line AI assistant that cliweave knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Google Gemini CLI
    Gemini,
    /// Qwen Code CLI
    Qwen,
    /// OpenAI Codex CLI
    Codex,
    /// Anthropic Claude CLI
    Claude,
}

impl Tool {
    /// Every supported tool, in display order.
    pub const ALL: [Tool; 4] = [Tool::Gemini, Tool::Qwen, Tool::Codex, Tool::Claude];

    /// Identifier used in configuration, storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Gemini => "gemini",
            Tool::Qwen => "qwen",
            Tool::Codex => "codex",
            Tool::Claude => "claude",
        }
    }

    /// Executable name looked up on the search path when no override is set.
    pub fn default_executable(&self) -> &'static str {
        self.as_str()
    }

    /// Whether the tool can continue one of its own sessions by id.
    ///
    /// Every supported tool can: `gemini -r ID`, `qwen --resume ID`,
    /// `codex exec resume ID`, `claude --resume ID`. Resolution still checks
    /// this so a tool added without a resume flag falls back to
    /// prompt concatenation.
    pub fn supports_native_resume(&self) -> bool {
        match self {
            Tool::Gemini | Tool::Qwen | Tool::Codex | Tool::Claude => true,
        }
    }

    /// Whether the tool can continue "the most recent session" without an id.
    ///
    /// `gemini -r latest`, `qwen --continue`, `codex exec resume --last`,
    /// `claude --continue`.
    pub fn supports_native_latest(&self) -> bool {
        match self {
            Tool::Gemini | Tool::Qwen | Tool::Codex | Tool::Claude => true,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Tool::Gemini),
            "qwen" => Ok(Tool::Qwen),
            "codex" => Ok(Tool::Codex),
            "claude" => Ok(Tool::Claude),
            other => Err(Error::unknown_tool(other)),
        }
    }
}

/// Permission level granted to the assistant for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Read-only analysis, no file modifications
    #[default]
    Analysis,
    /// File edits allowed, still asks before anything riskier
    Write,
    /// Fully autonomous, approvals and sandbox bypassed
    Auto,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Analysis => "analysis",
            ExecutionMode::Write => "write",
            ExecutionMode::Auto => "auto",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" => Ok(ExecutionMode::Analysis),
            "write" => Ok(ExecutionMode::Write),
            "auto" => Ok(ExecutionMode::Auto),
            other => Err(Error::Config(format!(
                "Unknown mode '{}'. Valid values: analysis, write, auto",
                other
            ))),
        }
    }
}

/// Result of probing whether a tool's executable can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAvailability {
    /// Whether the executable was found
    pub available: bool,
    /// Resolved path when found
    pub path: Option<PathBuf>,
}

impl ToolAvailability {
    pub fn found(path: impl Into<PathBuf>) -> Self {
        Self {
            available: true,
            path: Some(path.into()),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_case_insensitive() {
        assert_eq!("Gemini".parse::<Tool>().unwrap(), Tool::Gemini);
        assert_eq!(" codex ".parse::<Tool>().unwrap(), Tool::Codex);
    }

    #[test]
    fn test_unknown_tool_is_config_error() {
        let err = "cursor".parse::<Tool>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("cursor"));
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in [ExecutionMode::Analysis, ExecutionMode::Write, ExecutionMode::Auto] {
            assert_eq!(mode.as_str().parse::<ExecutionMode>().unwrap(), mode);
        }
        assert!("yolo".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_every_tool_resumes_natively() {
        for tool in [Tool::Gemini, Tool::Qwen, Tool::Codex, Tool::Claude] {
            assert!(tool.supports_native_resume(), "{} resume", tool);
            assert!(tool.supports_native_latest(), "{} latest", tool);
        }
    }

    #[test]
    fn test_tool_serde_lowercase() {
        let json = serde_json::to_string(&Tool::Claude).unwrap();
        assert_eq!(json, "\"claude\"");
    }
}
