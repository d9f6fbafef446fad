//! # cliweave-core
//!
//! Core types and abstractions for cliweave - an orchestrator that drives
//! command-line AI assistants and keeps their conversations across runs.
//!
//! This crate provides:
//! - Conversation, turn and native-session primitives
//! - The closed set of supported tools and execution modes
//! - Configuration system
//! - Common error types

pub mod config;
pub mod conversation;
pub mod error;
pub mod tool;

pub use config::Config;
pub use conversation::{
    Category, Conversation, NativeSessionMapping, OutputCapture, Turn, TurnStatus,
};
pub use error::{Error, Result};
pub use tool::{ExecutionMode, Tool, ToolAvailability};
