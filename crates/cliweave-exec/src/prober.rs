//! Tool availability probing.
//!
//! Answers "can this executable be launched?" with a short-lived cache.
//! Only positive answers are cached, so a tool installed after a failed probe
//! is picked up on the very next call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::process::Command;
use tracing::debug;

use cliweave_core::config::{ProberConfig, ToolsConfig};
use cliweave_core::{Tool, ToolAvailability};

use crate::error::ExecError;

/// Resolves an executable name to a path.
#[async_trait]
pub trait ExecutableLocator: Send + Sync {
    /// Return the resolved path, `None` when the executable does not exist.
    async fn locate(&self, name: &str) -> Result<Option<PathBuf>, ExecError>;
}

/// Locator backed by the platform's `which` / `where` command.
pub struct SystemLocator {
    timeout: Duration,
}

impl SystemLocator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemLocator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ExecutableLocator for SystemLocator {
    async fn locate(&self, name: &str) -> Result<Option<PathBuf>, ExecError> {
        // A path is checked directly instead of searched for.
        if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
            let path = Path::new(name);
            return Ok(path.is_file().then(|| path.to_path_buf()));
        }

        let lookup = if cfg!(windows) { "where" } else { "which" };
        let output = Command::new(lookup)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ExecError::ProbeTimeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Ok(None);
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from))
    }
}

struct CacheEntry {
    availability: ToolAvailability,
    checked_at: Instant,
}

/// Cached availability checks for tool executables.
pub struct ToolProber {
    locator: Arc<dyn ExecutableLocator>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl ToolProber {
    /// Create a prober using the system locator.
    pub fn new(config: &ProberConfig) -> Self {
        Self::with_locator(
            Arc::new(SystemLocator::new(Duration::from_secs(
                config.probe_timeout_secs,
            ))),
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// Create a prober with a custom locator.
    pub fn with_locator(locator: Arc<dyn ExecutableLocator>, ttl: Duration) -> Self {
        Self {
            locator,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Check whether `name` can be launched.
    pub async fn probe(&self, name: &str) -> ToolAvailability {
        if let Some(entry) = self.cache.read().get(name) {
            if entry.checked_at.elapsed() < self.ttl {
                return entry.availability.clone();
            }
        }

        let availability = match self.locator.locate(name).await {
            Ok(Some(path)) => ToolAvailability::found(path),
            Ok(None) => ToolAvailability::missing(),
            Err(e) => {
                debug!(executable = name, error = %e, "Probe failed");
                ToolAvailability::missing()
            }
        };

        if availability.available {
            self.cache.write().insert(
                name.to_string(),
                CacheEntry {
                    availability: availability.clone(),
                    checked_at: Instant::now(),
                },
            );
        } else {
            self.cache.write().remove(name);
        }

        availability
    }

    /// Check the configured executable for `tool`.
    pub async fn probe_tool(&self, tool: Tool, tools: &ToolsConfig) -> ToolAvailability {
        self.probe(&tools.get(tool).executable_for(tool)).await
    }

    /// Forget the cached answer for one executable.
    pub fn invalidate(&self, name: &str) {
        self.cache.write().remove(name);
    }

    /// Forget every cached answer.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLocator {
        calls: AtomicUsize,
        known: Vec<&'static str>,
    }

    #[async_trait]
    impl ExecutableLocator for CountingLocator {
        async fn locate(&self, name: &str) -> Result<Option<PathBuf>, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .known
                .contains(&name)
                .then(|| PathBuf::from(format!("/usr/bin/{}", name))))
        }
    }

    fn prober(known: Vec<&'static str>, ttl: Duration) -> (ToolProber, Arc<CountingLocator>) {
        let locator = Arc::new(CountingLocator {
            calls: AtomicUsize::new(0),
            known,
        });
        (ToolProber::with_locator(locator.clone(), ttl), locator)
    }

    #[tokio::test]
    async fn test_missing_executable_is_never_cached() {
        let (prober, locator) = prober(vec![], Duration::from_secs(300));

        assert!(!prober.probe("does-not-exist").await.available);
        assert!(!prober.probe("does-not-exist").await.available);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_found_executable_is_cached() {
        let (prober, locator) = prober(vec!["gemini"], Duration::from_secs(300));

        let first = prober.probe("gemini").await;
        let second = prober.probe("gemini").await;
        assert!(first.available);
        assert_eq!(first, second);
        assert_eq!(first.path, Some(PathBuf::from("/usr/bin/gemini")));
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_rechecked() {
        let (prober, locator) = prober(vec!["codex"], Duration::from_millis(0));

        prober.probe("codex").await;
        prober.probe("codex").await;
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recheck() {
        let (prober, locator) = prober(vec!["qwen"], Duration::from_secs(300));

        prober.probe("qwen").await;
        prober.invalidate("qwen");
        prober.probe("qwen").await;
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_tool_uses_configured_executable() {
        let (prober, _locator) = prober(vec!["claude-beta"], Duration::from_secs(300));
        let mut tools = ToolsConfig::default();

        assert!(!prober.probe_tool(Tool::Claude, &tools).await.available);

        tools.claude.executable = Some("claude-beta".into());
        let found = prober.probe_tool(Tool::Claude, &tools).await;
        assert_eq!(found.path, Some(PathBuf::from("/usr/bin/claude-beta")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_locator_finds_sh() {
        let locator = SystemLocator::default();
        let found = locator.locate("sh").await.unwrap();
        assert!(found.is_some());

        let missing = locator
            .locate("cliweave-surely-not-installed-binary")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_system_locator_checks_paths_directly() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("tool");
        std::fs::write(&file, "").unwrap();

        let locator = SystemLocator::default();
        let found = locator.locate(&file.to_string_lossy()).await.unwrap();
        assert_eq!(found, Some(file));

        let missing = dir.path().join("absent");
        assert!(locator
            .locate(&missing.to_string_lossy())
            .await
            .unwrap()
            .is_none());
    }
}
