//! # cliweave-cli
//!
//! Command-line interface for cliweave.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cliweave_core::error::format_error_with_suggestion;
use cliweave_core::{Category, Config, ExecutionMode, Tool};
use cliweave_exec::PromptFormat;

mod commands;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
}

/// cliweave - run AI coding assistants and keep their conversations
#[derive(Parser)]
#[command(name = "cliweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a prompt against a tool
    Exec(ExecArgs),
    /// Conversation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check which tools are installed
    Doctor,
    /// Show version information
    Version,
}

#[derive(clap::Args)]
pub struct ExecArgs {
    /// Tool to run (gemini, qwen, codex, claude)
    tool: Tool,

    /// Prompt to send
    prompt: String,

    /// Execution mode (analysis, write, auto)
    #[arg(long)]
    mode: Option<ExecutionMode>,

    /// Model to request from the tool
    #[arg(short, long)]
    model: Option<String>,

    /// Working directory for the tool
    #[arg(long = "cd", value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Extra directory the tool may read (repeatable)
    #[arg(long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Kill the tool after this many milliseconds (0 disables)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Conversation to continue: "latest", an id, or comma-separated ids
    #[arg(short, long, value_name = "TARGET")]
    resume: Option<String>,

    /// Record the run under this conversation id
    #[arg(long = "id", value_name = "CONVERSATION_ID")]
    conversation_id: Option<String>,

    /// Never use the tool's own session resume
    #[arg(long)]
    no_native: bool,

    /// Conversation category (user, internal, insight)
    #[arg(long)]
    category: Option<Category>,

    /// Parent conversation of a new conversation
    #[arg(long, value_name = "CONVERSATION_ID")]
    parent: Option<String>,

    /// History encoding when context is replayed (plain, yaml, json)
    #[arg(long)]
    format: Option<PromptFormat>,

    /// Store complete output instead of previews
    #[arg(long)]
    cache_output: bool,

    /// Print the result as JSON instead of streaming
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List conversations
    List {
        /// Maximum conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only conversations for this tool
        #[arg(short, long)]
        tool: Option<Tool>,
        /// Only conversations in this category
        #[arg(short, long)]
        category: Option<Category>,
    },
    /// Show a conversation
    Show {
        /// Conversation ID or unique prefix
        id: String,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a conversation
    Delete {
        /// Conversation ID or unique prefix
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show where configuration is read from
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration
    let config = Config::load_validated()
        .map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))?;

    let ctx = AppContext { config };

    match cli.command {
        Commands::Exec(args) => {
            let success = commands::exec::run(args, &ctx).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::History { action } => {
            commands::history::handle(action, &ctx).await?;
        }
        Commands::Config { action } => {
            commands::config::handle(action, &ctx)?;
        }
        Commands::Doctor => {
            commands::doctor::run(&ctx).await?;
        }
        Commands::Version => {
            println!("cliweave {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
