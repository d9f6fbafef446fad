//! Child process supervision.
//!
//! One [`ProcessSupervisor::run`] call owns one child process from spawn to
//! exit: it writes the prompt to stdin, streams stdout/stderr through a
//! channel to the event handler while accumulating them, enforces the
//! timeout, and reacts to an external interrupt.
//!
//! Termination is graceful first (SIGTERM on Unix), then forced after a short
//! grace period.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use cliweave_core::{Tool, TurnStatus};

use crate::command::BuiltCommand;
use crate::error::ExecError;
use crate::events::{ExecutionEventHandler, OutputChunk, OutputStream};

/// Stderr phrases that mark a non-zero exit as a real failure.
pub const FATAL_MARKERS: &[&str] = &["authentication failed", "rate limit exceeded", "fatal"];

/// Time between the graceful terminate signal and the forced kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// How long to wait for buffered output after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_BUFFER_SIZE: usize = 8192;

/// Classify a finished run.
///
/// A run that outlived its timeout is always `Timeout`. A non-zero exit still
/// counts as success when the tool printed an answer and stderr carries no
/// fatal marker.
pub fn classify(
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
    elapsed: Duration,
    timeout: Option<Duration>,
) -> TurnStatus {
    if timeout.is_some_and(|t| !t.is_zero() && elapsed > t) {
        return TurnStatus::Timeout;
    }
    if exit_code == Some(0) {
        return TurnStatus::Success;
    }
    if !stdout.trim().is_empty() && !has_fatal_marker(stderr) {
        return TurnStatus::Success;
    }
    TurnStatus::Error
}

fn has_fatal_marker(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    FATAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Handle to a tracked run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: u64,
    cancel: CancellationToken,
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Tracks the single "current" run so it can be interrupted from outside.
///
/// Starting a new run replaces the tracked one without touching it; the
/// replaced run keeps going until it exits or times out on its own.
#[derive(Debug, Default)]
pub struct ProcessTracker {
    current: Mutex<Option<RunHandle>>,
    next_id: AtomicU64,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a new run the current one.
    pub fn track(&self) -> RunHandle {
        let handle = RunHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            cancel: CancellationToken::new(),
        };
        if let Some(previous) = self.current.lock().replace(handle.clone()) {
            debug!(run_id = previous.id, "Replacing tracked run");
        }
        handle
    }

    /// Stop tracking `handle` if it is still the current run.
    pub fn untrack(&self, handle: &RunHandle) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.id == handle.id) {
            *current = None;
        }
    }

    /// Interrupt the current run. Returns `false` when nothing is tracked.
    pub fn interrupt(&self) -> bool {
        match self.current.lock().take() {
            Some(handle) => {
                debug!(run_id = handle.id, "Interrupting tracked run");
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.current.lock().is_some()
    }
}

/// What to run.
#[derive(Debug, Clone)]
pub struct ProcessRequest<'a> {
    pub tool: Tool,
    pub command: &'a BuiltCommand,
    /// Text written to stdin when the command reads it
    pub stdin: Option<&'a str>,
    pub working_dir: Option<&'a Path>,
    /// `None` (or zero) disables the internal timeout
    pub timeout: Option<Duration>,
}

/// Everything observed about one finished run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    pub interrupted: bool,
    pub status: TurnStatus,
}

enum Exit {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Interrupted,
}

/// Spawns and supervises tool processes.
pub struct ProcessSupervisor {
    tracker: Arc<ProcessTracker>,
    kill_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(tracker: Arc<ProcessTracker>) -> Self {
        Self {
            tracker,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn tracker(&self) -> &Arc<ProcessTracker> {
        &self.tracker
    }

    /// Run a command to completion.
    ///
    /// Only a spawn failure is an error; every other outcome is reported in
    /// the returned [`ProcessOutcome`].
    pub async fn run(
        &self,
        request: &ProcessRequest<'_>,
        handler: &dyn ExecutionEventHandler,
    ) -> Result<ProcessOutcome, ExecError> {
        let command = request.command;
        let timeout = request.timeout.filter(|t| !t.is_zero());
        let stdin_text = request.stdin.filter(|_| command.uses_stdin);

        debug!(
            tool = %request.tool,
            executable = %command.executable,
            args = ?command.args,
            timeout_ms = timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
            "Spawning tool process"
        );

        let mut cmd = Command::new(&command.executable);
        cmd.args(&command.args)
            .stdin(if stdin_text.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecError::SpawnFailed {
            command: command.display(),
            source,
        })?;

        let run = self.tracker.track();
        handler.on_spawn(request.tool, command, child.id());

        let (tx, mut rx) = mpsc::channel::<OutputChunk>(64);
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let writer = match (child.stdin.take(), stdin_text) {
            (Some(mut pipe), Some(text)) => {
                let text = text.to_string();
                Some(tokio::spawn(async move {
                    let result = async {
                        pipe.write_all(text.as_bytes()).await?;
                        pipe.flush().await?;
                        pipe.shutdown().await
                    }
                    .await;
                    match result {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                            debug!("Tool closed stdin before reading the whole prompt");
                        }
                        Err(e) => warn!(error = %e, "Failed to write prompt to stdin"),
                    }
                }))
            }
            _ => None,
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut streams_open = true;

        let deadline = tokio::time::sleep_until(
            timeout
                .map(|t| tokio::time::Instant::from_std(start) + t)
                .unwrap_or_else(tokio::time::Instant::now),
        );
        tokio::pin!(deadline);

        let exit = loop {
            tokio::select! {
                chunk = rx.recv(), if streams_open => match chunk {
                    Some(chunk) => accumulate(&chunk, &mut stdout, &mut stderr, handler),
                    None => streams_open = false,
                },
                status = child.wait() => break Exit::Exited(status),
                _ = &mut deadline, if timeout.is_some() => break Exit::TimedOut,
                _ = run.cancel.cancelled() => break Exit::Interrupted,
            }
        };
        // Measured at exit; termination and pipe draining are excluded.
        let duration = start.elapsed();

        let (status, timed_out, interrupted) = match exit {
            Exit::Exited(status) => (status, false, false),
            Exit::TimedOut => {
                warn!(tool = %request.tool, "Tool process timed out, terminating");
                (terminate(&mut child, self.kill_grace).await, true, false)
            }
            Exit::Interrupted => {
                debug!(tool = %request.tool, "Tool process interrupted, terminating");
                (terminate(&mut child, self.kill_grace).await, false, true)
            }
        };
        self.tracker.untrack(&run);

        // Collect output still buffered in the pipes.
        while streams_open {
            match tokio::time::timeout(DRAIN_GRACE, rx.recv()).await {
                Ok(Some(chunk)) => accumulate(&chunk, &mut stdout, &mut stderr, handler),
                Ok(None) => streams_open = false,
                Err(_) => {
                    debug!("Output pipes still open after exit, detaching");
                    break;
                }
            }
        }
        for reader in readers {
            reader.abort();
        }
        if let Some(writer) = writer {
            writer.abort();
        }

        let exit_code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(error = %e, "Failed to wait for tool process");
                None
            }
        };

        let status = if timed_out {
            TurnStatus::Timeout
        } else if interrupted {
            TurnStatus::Error
        } else {
            classify(exit_code, &stdout, &stderr, duration, timeout)
        };

        debug!(
            tool = %request.tool,
            status = %status,
            exit_code = ?exit_code,
            duration_ms = duration.as_millis() as u64,
            "Tool process finished"
        );
        handler.on_complete(status, duration, exit_code);

        Ok(ProcessOutcome {
            exit_code,
            stdout,
            stderr,
            duration,
            timed_out,
            interrupted,
            status,
        })
    }
}

fn accumulate(
    chunk: &OutputChunk,
    stdout: &mut String,
    stderr: &mut String,
    handler: &dyn ExecutionEventHandler,
) {
    match chunk.stream {
        OutputStream::Stdout => stdout.push_str(&chunk.data),
        OutputStream::Stderr => stderr.push_str(&chunk.data),
    }
    handler.on_output(chunk);
}

/// Send SIGTERM, then kill if the process outlives `grace`.
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            debug!(pid = pid, "Sending SIGTERM to tool process");
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);

            tokio::select! {
                status = child.wait() => return status,
                _ = tokio::time::sleep(grace) => {
                    warn!(pid = pid, "Tool process did not exit after SIGTERM, killing");
                }
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Kill failed");
    }
    child.wait().await
}

fn spawn_reader<R>(mut reader: R, stream: OutputStream, tx: mpsc::Sender<OutputChunk>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut pending: Vec<u8> = Vec::new();
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(stream = %stream, error = %e, "Read failed");
                    break;
                }
            };
            pending.extend_from_slice(&buf[..n]);
            let data = decode_utf8_prefix(&mut pending);
            if !data.is_empty() && tx.send(OutputChunk { stream, data }).await.is_err() {
                return;
            }
        }
        if !pending.is_empty() {
            let data = String::from_utf8_lossy(&pending).into_owned();
            let _ = tx.send(OutputChunk { stream, data }).await;
        }
    })
}

/// Take the longest decodable prefix of `pending`, leaving an incomplete
/// trailing character for the next read. Invalid bytes become U+FFFD.
fn decode_utf8_prefix(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}
