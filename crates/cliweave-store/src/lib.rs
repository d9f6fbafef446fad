//! # cliweave-store
//!
//! Conversation history persistence for cliweave.
//!
//! This crate provides:
//! - The [`ConversationStore`] trait the execution engine reads and writes through
//! - A SQLite-backed implementation, [`SqliteConversationStore`]
//! - Native session mappings that let a tool resume its own session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cliweave_store::{ConversationStore, SqliteConversationStore};
//!
//! let store = SqliteConversationStore::open_default()?;
//! if let Some(conversation) = store.get("20250101-120000-gemini-1a2b3c4d").await? {
//!     println!("{} turns", conversation.turn_count);
//! }
//! ```
//!
//! ## Storage Architecture
//!
//! Everything lives in `~/.local/share/cliweave/history.db`: one row per
//! conversation, one row per turn, and an append-only table of native
//! session mappings where the newest mapping for a conversation wins.

pub mod store;

pub use store::{
    ConversationQuery, ConversationStore, ConversationSummary, SqliteConversationStore,
    StoreError,
};
