//! Execution-level error types.

use thiserror::Error;

/// Errors raised by the process layer.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Failed to spawn the child process.
    #[error("failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A locate query exceeded its time limit.
    #[error("probe timed out after {0} seconds")]
    ProbeTimeout(u64),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecError> for cliweave_core::Error {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::SpawnFailed { command, source } => {
                cliweave_core::Error::spawn(command, source.to_string())
            }
            other => cliweave_core::Error::Internal(other.to_string()),
        }
    }
}
