//! # cliweave-exec
//!
//! Execution engine for cliweave.
//!
//! This crate provides:
//! - Tool availability probing with a positive-only cache
//! - Per-tool command line construction
//! - Resume strategy resolution (native, hybrid, prompt concatenation, merge)
//! - Prompt concatenation in plain, yaml and json encodings
//! - Child process supervision with timeout and interrupt handling
//! - Native session discovery
//! - The [`Orchestrator`] that ties it all together

pub mod command;
pub mod discovery;
pub mod error;
pub mod events;
pub mod merge;
pub mod orchestrator;
pub mod prober;
pub mod prompt;
pub mod resume;
pub mod supervisor;

pub use command::{BuiltCommand, CommandSpec, NativeResume};
pub use discovery::{
    DiscoveredSession, FsSessionDiscovery, NativeSessionDiscovery, NoSessionDiscovery,
};
pub use error::ExecError;
pub use events::{ExecutionEventHandler, NoOpEventHandler, OutputChunk, OutputStream};
pub use merge::{merge_turns, MergedHistory};
pub use orchestrator::{ExecuteRequest, ExecutionResult, LegacyExecution, Orchestrator};
pub use prober::{ExecutableLocator, SystemLocator, ToolProber};
pub use prompt::{extract_new_request, PromptConcatenator, PromptFormat};
pub use resume::{ResumeDecision, ResumeResolver, ResumeStrategy, ResumeTarget};
pub use supervisor::{classify, ProcessOutcome, ProcessSupervisor, ProcessTracker};
