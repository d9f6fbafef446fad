//! Execution orchestrator.
//!
//! The orchestrator is the entry point for running a prompt against a tool.
//! It wires together:
//!
//! ```text
//! Orchestrator
//! ├── ToolProber (is the executable there?)
//! ├── ResumeResolver (how does prior context reach the tool?)
//! ├── PromptConcatenator / command::build
//! ├── ProcessSupervisor (spawn, stream, timeout, interrupt)
//! ├── ConversationStore (history)
//! └── NativeSessionDiscovery (tool-side session tracking)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use cliweave_core::{
    Category, Config, Conversation, Error, ExecutionMode, NativeSessionMapping, OutputCapture,
    Result, Tool, Turn, TurnStatus,
};
use cliweave_store::ConversationStore;

use crate::command::{self, CommandSpec};
use crate::discovery::{FsSessionDiscovery, NativeSessionDiscovery, NoSessionDiscovery};
use crate::events::ExecutionEventHandler;
use crate::merge;
use crate::prober::ToolProber;
use crate::prompt::{PromptConcatenator, PromptFormat};
use crate::resume::{
    ConversationPlan, ResumeDecision, ResumeRequest, ResumeResolver, ResumeStrategy, ResumeTarget,
};
use crate::supervisor::{ProcessRequest, ProcessSupervisor, ProcessTracker};

// ============================================================================
// Request / Result Types
// ============================================================================

/// One prompt to run against one tool.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub tool: Tool,
    pub prompt: String,
    /// Falls back to `execution.default_mode`
    pub mode: Option<ExecutionMode>,
    /// Falls back to the tool's `default_model`
    pub model: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    /// Falls back to `execution.default_timeout_ms`; 0 disables the timeout
    pub timeout_ms: Option<u64>,
    pub resume: Option<ResumeTarget>,
    /// Explicit id for the conversation this run lands in
    pub conversation_id: Option<String>,
    pub disable_native: bool,
    pub category: Category,
    pub parent_id: Option<String>,
    /// Falls back to `resume.format`
    pub prompt_format: Option<PromptFormat>,
    /// Falls back to `execution.cache_output`
    pub cache_output: Option<bool>,
}

impl ExecuteRequest {
    pub fn new(tool: Tool, prompt: impl Into<String>) -> Self {
        Self {
            tool,
            prompt: prompt.into(),
            mode: None,
            model: None,
            working_dir: None,
            include_dirs: vec![],
            timeout_ms: None,
            resume: None,
            conversation_id: None,
            disable_native: false,
            category: Category::default(),
            parent_id: None,
            prompt_format: None,
            cache_output: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Resume `latest`, one id, or several comma-separated ids.
    pub fn with_resume(mut self, target: &str) -> Self {
        self.resume = ResumeTarget::parse(target);
        self
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn without_native_resume(mut self) -> Self {
        self.disable_native = true;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_prompt_format(mut self, format: PromptFormat) -> Self {
        self.prompt_format = Some(format);
        self
    }

    pub fn with_cache_output(mut self, cache: bool) -> Self {
        self.cache_output = Some(cache);
        self
    }
}

/// Flattened single-turn view of a run, for callers that predate
/// conversations.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyExecution {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub tool: Tool,
    pub model: Option<String>,
    pub mode: ExecutionMode,
    pub prompt: String,
    pub status: TurnStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub output: OutputCapture,
}

/// Outcome of [`Orchestrator::execute`].
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the run's turn was classified as success
    pub success: bool,
    /// The conversation the run is reported under
    pub conversation: Conversation,
    /// Other conversations the turn was appended to (merge without a new id)
    pub also_updated: Vec<Conversation>,
    pub legacy: LegacyExecution,
    pub strategy: Option<ResumeStrategy>,
    /// Complete stdout, regardless of output caching
    pub raw_stdout: String,
    /// Complete stderr, regardless of output caching
    pub raw_stderr: String,
    pub timed_out: bool,
    pub interrupted: bool,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs prompts against tools and records the results.
pub struct Orchestrator {
    config: Config,
    store: Arc<dyn ConversationStore>,
    prober: ToolProber,
    discovery: Arc<dyn NativeSessionDiscovery>,
    supervisor: ProcessSupervisor,
}

impl Orchestrator {
    /// Create an orchestrator with the system prober and on-disk discovery.
    pub fn new(config: Config, store: Arc<dyn ConversationStore>) -> Self {
        let discovery: Arc<dyn NativeSessionDiscovery> = match FsSessionDiscovery::from_home_dir() {
            Some(discovery) => Arc::new(discovery),
            None => Arc::new(NoSessionDiscovery),
        };

        Self {
            prober: ToolProber::new(&config.prober),
            supervisor: ProcessSupervisor::new(Arc::new(ProcessTracker::new())),
            config,
            store,
            discovery,
        }
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn NativeSessionDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_prober(mut self, prober: ToolProber) -> Self {
        self.prober = prober;
        self
    }

    /// Shorten or lengthen the SIGTERM-to-kill grace period.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.supervisor = self.supervisor.with_kill_grace(grace);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn prober(&self) -> &ToolProber {
        &self.prober
    }

    /// Shared handle for interrupting the current run from another task.
    pub fn tracker(&self) -> Arc<ProcessTracker> {
        Arc::clone(self.supervisor.tracker())
    }

    /// Interrupt the most recently started run, if it is still going.
    pub fn interrupt(&self) -> bool {
        self.supervisor.tracker().interrupt()
    }

    /// Run `request` to completion.
    ///
    /// Fails only for configuration problems, an executable that cannot be
    /// started, or a merge whose targets are all unknown. Every other outcome
    /// (including timeouts and failing tools) is returned as a recorded turn.
    pub async fn execute(
        &self,
        request: ExecuteRequest,
        handler: &dyn ExecutionEventHandler,
    ) -> Result<ExecutionResult> {
        match self.execute_inner(request, handler).await {
            Ok(result) => Ok(result),
            Err(e) => {
                handler.on_error(&e);
                Err(e)
            }
        }
    }

    async fn execute_inner(
        &self,
        request: ExecuteRequest,
        handler: &dyn ExecutionEventHandler,
    ) -> Result<ExecutionResult> {
        let tool = request.tool;
        let tool_config = self.config.tools.get(tool);

        if !tool_config.enabled {
            return Err(Error::Config(format!(
                "Tool '{}' is disabled in configuration",
                tool
            )));
        }

        if let Some(dir) = &request.working_dir {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "Working directory '{}' does not exist or is not a directory",
                    dir.display()
                )));
            }
        }

        let mode = request.mode.unwrap_or(self.config.execution.default_mode);
        let model = request
            .model
            .clone()
            .or_else(|| tool_config.default_model.clone());

        let executable = tool_config.executable_for(tool);
        let availability = self.prober.probe(&executable).await;
        if !availability.available {
            // Resume flags are not resolved yet; the rest of the argv is final.
            let attempted = command::build(
                tool,
                executable,
                mode,
                &CommandSpec {
                    model: model.as_deref(),
                    include_dirs: &request.include_dirs,
                    native_resume: None,
                },
            );
            return Err(Error::spawn(
                attempted.display(),
                "executable not found on the search path",
            ));
        }
        let executable = availability
            .path
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or(executable);

        let disable_native = request.disable_native || self.config.resume.disable_native;
        let decision = ResumeResolver::new(
            self.store.as_ref(),
            self.config.resume.hybrid_context_turns,
        )
        .resolve(&ResumeRequest {
            tool,
            target: request.resume.as_ref(),
            explicit_id: request.conversation_id.as_deref(),
            disable_native,
        })
        .await?;

        let stdin_prompt = self.build_prompt(&request, &decision)?;

        let native_resume = decision.native_resume();
        let built = command::build(
            tool,
            executable,
            mode,
            &CommandSpec {
                model: model.as_deref(),
                include_dirs: &request.include_dirs,
                native_resume: native_resume.as_ref(),
            },
        );

        let timeout_ms = request
            .timeout_ms
            .unwrap_or(self.config.execution.default_timeout_ms);
        let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        info!(
            tool = %tool,
            conversation_id = %decision.primary_id,
            mode = %mode,
            strategy = decision.strategy.map(|s| s.as_str()).unwrap_or("none"),
            "Executing"
        );

        let started_at = Utc::now();
        let outcome = self
            .supervisor
            .run(
                &ProcessRequest {
                    tool,
                    command: &built,
                    stdin: Some(&stdin_prompt),
                    working_dir: request.working_dir.as_deref(),
                    timeout,
                },
                handler,
            )
            .await?;

        let cache_output = request
            .cache_output
            .unwrap_or(self.config.execution.cache_output);
        let turn = Turn::new(
            request.prompt.clone(),
            Utc::now(),
            outcome.duration.as_millis() as u64,
            outcome.status,
            outcome.exit_code,
            OutputCapture::capture(
                &outcome.stdout,
                &outcome.stderr,
                self.config.execution.stdout_preview_bytes,
                self.config.execution.stderr_preview_bytes,
                cache_output,
            ),
        );

        let strategy = decision.strategy;
        let primary_id = decision.primary_id.clone();
        let mut records = self.apply_turn(&request, decision, turn, mode, model.as_deref());

        // History first, native tracking second; neither can fail the run.
        for conversation in &records {
            if let Err(e) = self.store.save(conversation).await {
                warn!(
                    conversation_id = %conversation.id,
                    error = %e,
                    "Failed to persist conversation"
                );
            }
        }

        if records.len() == 1 && tool.supports_native_resume() {
            let working_dir = request
                .working_dir
                .clone()
                .or_else(|| std::env::current_dir().ok());
            if let Some(working_dir) = working_dir {
                self.track_native_session(
                    tool,
                    &records[0].id,
                    started_at,
                    &working_dir,
                    &request.prompt,
                )
                .await;
            }
        }

        let index = records
            .iter()
            .position(|c| c.id == primary_id)
            .unwrap_or(0);
        let conversation = records.remove(index);
        let legacy = legacy_view(&conversation);
        let success = outcome.status == TurnStatus::Success;

        info!(
            tool = %tool,
            conversation_id = %conversation.id,
            status = %outcome.status,
            duration_ms = outcome.duration.as_millis() as u64,
            "Execution finished"
        );

        Ok(ExecutionResult {
            success,
            conversation,
            also_updated: records,
            legacy,
            strategy,
            raw_stdout: outcome.stdout,
            raw_stderr: outcome.stderr,
            timed_out: outcome.timed_out,
            interrupted: outcome.interrupted,
        })
    }

    /// Prompt text sent on stdin: the user's prompt, with history injected
    /// when the decision calls for it.
    fn build_prompt(&self, request: &ExecuteRequest, decision: &ResumeDecision) -> Result<String> {
        if !decision.injects_context() {
            return Ok(request.prompt.clone());
        }

        let mut concatenator = PromptConcatenator::from_config(&self.config.resume)?;
        if let Some(format) = request.prompt_format {
            concatenator = concatenator.with_format(format);
        }
        debug!(
            format = %concatenator.format(),
            turns = decision.context_turns.len(),
            "Injecting conversation history"
        );
        Ok(concatenator.concatenate(&decision.context_turns, &request.prompt))
    }

    /// Place the finished turn according to the resume plan.
    fn apply_turn(
        &self,
        request: &ExecuteRequest,
        decision: ResumeDecision,
        turn: Turn,
        mode: ExecutionMode,
        model: Option<&str>,
    ) -> Vec<Conversation> {
        let tool = request.tool;
        match decision.plan {
            ConversationPlan::Create { parent_id, seed } => {
                let mut conversation = match seed {
                    Some(seed) => seed.into_conversation(
                        decision.primary_id,
                        tool,
                        model.map(str::to_string),
                        mode,
                        request.category,
                    ),
                    None => Conversation::new(
                        decision.primary_id,
                        tool,
                        model.map(str::to_string),
                        mode,
                        request.category,
                    ),
                };
                conversation.parent_id = request.parent_id.clone().or(parent_id);
                conversation.append_turn(turn);
                vec![conversation]
            }
            ConversationPlan::Continue(mut conversation) => {
                conversation.tool = tool;
                conversation.model = model.map(str::to_string);
                conversation.mode = mode;
                if request.parent_id.is_some() {
                    conversation.parent_id = request.parent_id.clone();
                }
                conversation.append_turn(turn);
                vec![conversation]
            }
            ConversationPlan::AppendEach(mut sources) => {
                merge::append_to_each(&mut sources, &turn, tool, model, mode);
                sources
            }
        }
    }

    async fn track_native_session(
        &self,
        tool: Tool,
        conversation_id: &str,
        started_at: DateTime<Utc>,
        working_dir: &Path,
        prompt: &str,
    ) {
        let Some(session) = self
            .discovery
            .discover(tool, started_at, working_dir, Some(prompt))
            .await
        else {
            return;
        };

        let mut mapping = NativeSessionMapping::new(conversation_id, tool, session.session_id);
        if let Some(path) = session.path {
            mapping = mapping.with_path(path);
        }
        if let Some(hash) = session.project_hash {
            mapping = mapping.with_project_hash(hash);
        }

        match self.store.save_native_mapping(&mapping).await {
            Ok(()) => debug!(
                conversation_id = %conversation_id,
                native_session_id = %mapping.native_session_id,
                "Recorded native session"
            ),
            Err(e) => warn!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to record native session"
            ),
        }
    }
}

fn legacy_view(conversation: &Conversation) -> LegacyExecution {
    let turn = conversation.last_turn();
    LegacyExecution {
        id: conversation.id.clone(),
        timestamp: turn.map(|t| t.timestamp).unwrap_or(conversation.updated_at),
        tool: conversation.tool,
        model: conversation.model.clone(),
        mode: conversation.mode,
        prompt: turn.map(|t| t.prompt.clone()).unwrap_or_default(),
        status: turn.map(|t| t.status).unwrap_or(TurnStatus::Error),
        exit_code: turn.and_then(|t| t.exit_code),
        duration_ms: turn.map(|t| t.duration_ms).unwrap_or(0),
        output: turn.map(|t| t.output.clone()).unwrap_or_default(),
    }
}
