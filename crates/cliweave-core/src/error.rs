//! Error types for cliweave.
//!
//! Only configuration and spawn failures abort an execution. Everything that
//! happens after the child process starts is recorded on the resulting turn
//! instead of being raised.

use thiserror::Error;

/// Result type alias using the cliweave error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cliweave.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown tool, disabled tool, bad working directory)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The executable could not be started
    #[error("Failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    /// No requested resume target could be resolved
    #[error("None of the requested conversations could be resolved: {}", .0.join(", "))]
    UnresolvedTargets(Vec<String>),

    /// Conversation store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your config file at ~/.config/cliweave/config.toml"),
            Error::Spawn { .. } => Some("Install the tool or set tools.<name>.executable in config"),
            Error::UnresolvedTargets(_) => {
                Some("Use 'cliweave history list' to see available conversations")
            }
            Error::NotFound(_) => Some("Use 'cliweave history list' to see available conversations"),
            _ => None,
        }
    }

    /// Create an unknown-tool configuration error.
    pub fn unknown_tool(name: &str) -> Self {
        Error::Config(format!(
            "Unknown tool '{}'. Supported tools: gemini, qwen, codex, claude",
            name
        ))
    }

    /// Create a spawn error carrying the full command line.
    pub fn spawn(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Spawn {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether this error is raised before any process is started.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Spawn { .. } | Error::UnresolvedTargets(_)
        )
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool() {
        let err = Error::unknown_tool("cursor");
        assert!(err.to_string().contains("cursor"));
        assert!(err.recovery_suggestion().is_some());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_spawn_error_includes_command() {
        let err = Error::spawn("gemini -m pro", "No such file or directory");
        assert!(err.to_string().contains("gemini -m pro"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unresolved_targets_lists_ids() {
        let err = Error::UnresolvedTargets(vec!["a".into(), "b".into()]);
        assert!(err.to_string().contains("a, b"));
        assert!(format_error_with_suggestion(&err).contains("Suggestion"));
    }

    #[test]
    fn test_storage_error_not_fatal() {
        assert!(!Error::Storage("disk full".into()).is_fatal());
    }
}
