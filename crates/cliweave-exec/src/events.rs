//! Execution event callbacks.

use std::fmt;
use std::time::Duration;

use cliweave_core::{Tool, TurnStatus};

use crate::command::BuiltCommand;

/// Which pipe a chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// A piece of child output as it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub data: String,
}

/// Event handler for UI callbacks during an execution.
///
/// Every method has a no-op default, so implementors only override what they
/// display. Methods are called synchronously from the supervisor loop and
/// should not block.
pub trait ExecutionEventHandler: Send + Sync {
    /// Called right after the child process starts.
    fn on_spawn(&self, _tool: Tool, _command: &BuiltCommand, _pid: Option<u32>) {}

    /// Called for every chunk of output, in arrival order.
    fn on_output(&self, _chunk: &OutputChunk) {}

    /// Called once the run is classified.
    fn on_complete(&self, _status: TurnStatus, _duration: Duration, _exit_code: Option<i32>) {}

    /// Called when the run fails before or during spawn.
    fn on_error(&self, _error: &cliweave_core::Error) {}
}

/// No-op event handler for headless use.
pub struct NoOpEventHandler;

impl ExecutionEventHandler for NoOpEventHandler {}
