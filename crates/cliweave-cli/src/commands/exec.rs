//! Run a prompt against a tool.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use cliweave_core::error::format_error_with_suggestion;
use cliweave_core::{Tool, TurnStatus};
use cliweave_exec::{
    BuiltCommand, ExecuteRequest, ExecutionEventHandler, ExecutionResult, NoOpEventHandler,
    Orchestrator, OutputChunk, OutputStream,
};
use cliweave_store::SqliteConversationStore;

use crate::{AppContext, ExecArgs};

/// Writes child output to the terminal as it arrives.
struct StreamingHandler;

impl ExecutionEventHandler for StreamingHandler {
    fn on_spawn(&self, tool: Tool, command: &BuiltCommand, pid: Option<u32>) {
        tracing::debug!(tool = %tool, pid = ?pid, command = %command.display(), "Tool started");
    }

    fn on_output(&self, chunk: &OutputChunk) {
        // Terminal write failures are not worth aborting the run for.
        let _ = match chunk.stream {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(chunk.data.as_bytes()).and_then(|_| out.flush())
            }
            OutputStream::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(chunk.data.as_bytes()).and_then(|_| err.flush())
            }
        };
    }
}

fn build_request(args: ExecArgs) -> ExecuteRequest {
    let mut request = ExecuteRequest::new(args.tool, args.prompt);

    if let Some(mode) = args.mode {
        request = request.with_mode(mode);
    }
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if let Some(dir) = args.working_dir {
        request = request.with_working_dir(dir);
    }
    for dir in args.include_dirs {
        request = request.with_include_dir(dir);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        request = request.with_timeout_ms(timeout_ms);
    }
    if let Some(target) = args.resume.as_deref() {
        request = request.with_resume(target);
    }
    if let Some(id) = args.conversation_id {
        request = request.with_conversation_id(id);
    }
    if args.no_native {
        request = request.without_native_resume();
    }
    if let Some(category) = args.category {
        request = request.with_category(category);
    }
    if let Some(parent) = args.parent {
        request = request.with_parent(parent);
    }
    if let Some(format) = args.format {
        request = request.with_prompt_format(format);
    }
    if args.cache_output {
        request = request.with_cache_output(true);
    }

    request
}

/// Format the completion summary printed after a streamed run.
fn format_summary(result: &ExecutionResult) -> String {
    let conversation = &result.conversation;
    let legacy = &result.legacy;

    let status = match legacy.status {
        TurnStatus::Success => "✓ success",
        TurnStatus::Error => "✗ error",
        TurnStatus::Timeout => "✗ timeout",
    };
    let exit = legacy
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let duration = Duration::from_millis(legacy.duration_ms);

    let mut lines = vec![
        format!(
            "{} ({}, exit {}, {:.1}s)",
            status,
            legacy.tool,
            exit,
            duration.as_secs_f64()
        ),
        format!(
            "Conversation: {} (turn {})",
            conversation.id, conversation.turn_count
        ),
    ];

    if let Some(strategy) = result.strategy {
        lines.push(format!("Resume:       {}", strategy));
    }
    for other in &result.also_updated {
        lines.push(format!(
            "Also updated: {} (turn {})",
            other.id, other.turn_count
        ));
    }
    if result.interrupted {
        lines.push("Interrupted by user".to_string());
    }

    lines.join("\n")
}

/// Run the prompt. Returns whether the turn succeeded.
pub async fn run(args: ExecArgs, ctx: &AppContext) -> anyhow::Result<bool> {
    let json = args.json;
    let store = SqliteConversationStore::new(ctx.config.data_dir())?;
    let orchestrator = Orchestrator::new(ctx.config.clone(), Arc::new(store));

    // Ctrl-C interrupts the child instead of killing cliweave.
    let tracker = orchestrator.tracker();
    let interrupt = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tracker.interrupt() {
                tracing::info!("Interrupting tool");
            }
        }
    });

    let request = build_request(args);
    let outcome = if json {
        orchestrator.execute(request, &NoOpEventHandler).await
    } else {
        orchestrator.execute(request, &StreamingHandler).await
    };
    interrupt.abort();

    let result = outcome.map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.legacy)?);
    } else {
        if !result.raw_stdout.is_empty() && !result.raw_stdout.ends_with('\n') {
            println!();
        }
        eprintln!();
        eprintln!("{}", format_summary(&result));
    }

    Ok(result.success)
}
