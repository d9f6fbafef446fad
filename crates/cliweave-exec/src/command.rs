//! Command line construction for each supported tool.
//!
//! The prompt never appears in the argument vector; it is written to the
//! child's stdin. Codex is the one tool that needs a `-` positional to read
//! the prompt from stdin.

use std::path::PathBuf;

use cliweave_core::{ExecutionMode, Tool};

/// How a tool should resume its own session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeResume {
    /// Continue the tool's most recent session.
    Latest,
    /// Continue a specific session.
    Session(String),
}

/// Everything needed to spawn a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub executable: String,
    pub args: Vec<String>,
    /// Whether the prompt is delivered on stdin
    pub uses_stdin: bool,
}

impl BuiltCommand {
    /// Render the command line for diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Inputs to [`build`].
#[derive(Debug, Clone, Default)]
pub struct CommandSpec<'a> {
    pub model: Option<&'a str>,
    pub include_dirs: &'a [PathBuf],
    pub native_resume: Option<&'a NativeResume>,
}

/// Build the invocation for `tool` running `executable`.
pub fn build(
    tool: Tool,
    executable: impl Into<String>,
    mode: ExecutionMode,
    spec: &CommandSpec<'_>,
) -> BuiltCommand {
    let args = match tool {
        Tool::Gemini => gemini_args(mode, spec),
        Tool::Qwen => qwen_args(mode, spec),
        Tool::Codex => codex_args(mode, spec),
        Tool::Claude => claude_args(mode, spec),
    };

    BuiltCommand {
        executable: executable.into(),
        args,
        uses_stdin: true,
    }
}

fn push_model(args: &mut Vec<String>, flag: &str, model: Option<&str>) {
    if let Some(model) = model.filter(|m| !m.is_empty()) {
        args.push(flag.to_string());
        args.push(model.to_string());
    }
}

fn joined_dirs(dirs: &[PathBuf]) -> Option<String> {
    if dirs.is_empty() {
        return None;
    }
    Some(
        dirs.iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn gemini_args(mode: ExecutionMode, spec: &CommandSpec<'_>) -> Vec<String> {
    let mut args = Vec::new();
    push_model(&mut args, "-m", spec.model);
    match mode {
        ExecutionMode::Analysis => {}
        ExecutionMode::Write => args.extend(["--approval-mode".into(), "auto_edit".into()]),
        ExecutionMode::Auto => args.extend(["--approval-mode".into(), "yolo".into()]),
    }
    if let Some(dirs) = joined_dirs(spec.include_dirs) {
        args.push("--include-directories".into());
        args.push(dirs);
    }
    match spec.native_resume {
        Some(NativeResume::Latest) => args.extend(["-r".into(), "latest".into()]),
        Some(NativeResume::Session(id)) => args.extend(["-r".into(), id.clone()]),
        None => {}
    }
    args
}

fn qwen_args(mode: ExecutionMode, spec: &CommandSpec<'_>) -> Vec<String> {
    let mut args = Vec::new();
    push_model(&mut args, "-m", spec.model);
    match mode {
        ExecutionMode::Analysis => {}
        ExecutionMode::Write => args.extend(["--approval-mode".into(), "auto-edit".into()]),
        ExecutionMode::Auto => args.extend(["--approval-mode".into(), "yolo".into()]),
    }
    if let Some(dirs) = joined_dirs(spec.include_dirs) {
        args.push("--include-directories".into());
        args.push(dirs);
    }
    match spec.native_resume {
        Some(NativeResume::Latest) => args.push("--continue".into()),
        Some(NativeResume::Session(id)) => args.extend(["--resume".into(), id.clone()]),
        None => {}
    }
    args
}

fn codex_args(mode: ExecutionMode, spec: &CommandSpec<'_>) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    match mode {
        ExecutionMode::Analysis => args.extend(["--sandbox".into(), "read-only".into()]),
        ExecutionMode::Write => args.push("--full-auto".into()),
        ExecutionMode::Auto => args.push("--dangerously-bypass-approvals-and-sandbox".into()),
    }
    push_model(&mut args, "-m", spec.model);
    for dir in spec.include_dirs {
        args.push("--add-dir".into());
        args.push(dir.to_string_lossy().into_owned());
    }
    match spec.native_resume {
        Some(NativeResume::Latest) => args.extend(["resume".into(), "--last".into()]),
        Some(NativeResume::Session(id)) => args.extend(["resume".into(), id.clone()]),
        None => {}
    }
    // Read the prompt from stdin.
    args.push("-".into());
    args
}

fn claude_args(mode: ExecutionMode, spec: &CommandSpec<'_>) -> Vec<String> {
    let mut args = vec!["-p".to_string()];
    push_model(&mut args, "--model", spec.model);
    match mode {
        ExecutionMode::Analysis => args.extend(["--permission-mode".into(), "plan".into()]),
        ExecutionMode::Write => args.extend(["--permission-mode".into(), "acceptEdits".into()]),
        ExecutionMode::Auto => args.push("--dangerously-skip-permissions".into()),
    }
    for dir in spec.include_dirs {
        args.push("--add-dir".into());
        args.push(dir.to_string_lossy().into_owned());
    }
    match spec.native_resume {
        Some(NativeResume::Latest) => args.push("--continue".into()),
        Some(NativeResume::Session(id)) => args.extend(["--resume".into(), id.clone()]),
        None => {}
    }
    args
}
