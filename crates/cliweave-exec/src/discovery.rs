//! Discovery of the session files each tool writes for itself.
//!
//! After a run, the newest session artifact written by the tool is located so
//! a later run can resume it natively. Discovery is best-effort: any failure
//! simply yields no session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use cliweave_core::Tool;

/// Slack allowed between the recorded start time and file modification times.
const MTIME_TOLERANCE: Duration = Duration::from_secs(2);

/// Characters of the prompt used to recognize the right session file.
const PROMPT_PROBE_CHARS: usize = 80;

const UUID_PATTERN: &str =
    r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

/// A tool-side session found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    /// Identifier accepted by the tool's resume flag
    pub session_id: String,
    pub path: Option<PathBuf>,
    pub project_hash: Option<String>,
}

/// Locates the native session a run produced.
#[async_trait]
pub trait NativeSessionDiscovery: Send + Sync {
    async fn discover(
        &self,
        tool: Tool,
        started_at: DateTime<Utc>,
        working_dir: &Path,
        prompt: Option<&str>,
    ) -> Option<DiscoveredSession>;
}

/// Discovery that never finds anything.
pub struct NoSessionDiscovery;

#[async_trait]
impl NativeSessionDiscovery for NoSessionDiscovery {
    async fn discover(
        &self,
        _tool: Tool,
        _started_at: DateTime<Utc>,
        _working_dir: &Path,
        _prompt: Option<&str>,
    ) -> Option<DiscoveredSession> {
        None
    }
}

/// Scans the session directories the tools keep under the home directory.
#[derive(Debug, Clone)]
pub struct FsSessionDiscovery {
    home: PathBuf,
}

impl FsSessionDiscovery {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Use the current user's home directory.
    pub fn from_home_dir() -> Option<Self> {
        dirs::home_dir().map(Self::new)
    }

    /// Glob pattern and project hash for `tool`'s session files.
    fn layout(&self, tool: Tool, working_dir: &Path) -> (String, Option<String>) {
        let home = self.home.to_string_lossy();
        match tool {
            Tool::Claude => {
                let slug = claude_project_slug(working_dir);
                let pattern = format!("{}/.claude/projects/{}/*.jsonl", home, slug);
                (pattern, Some(slug))
            }
            Tool::Gemini | Tool::Qwen => {
                let hash = project_hash(working_dir);
                let dir = if tool == Tool::Gemini { ".gemini" } else { ".qwen" };
                let pattern = format!("{}/{}/tmp/{}/chats/*.json", home, dir, hash);
                (pattern, Some(hash))
            }
            Tool::Codex => (
                format!("{}/.codex/sessions/*/*/*/rollout-*.jsonl", home),
                None,
            ),
        }
    }

    fn scan(
        &self,
        tool: Tool,
        started_at: DateTime<Utc>,
        working_dir: &Path,
        prompt: Option<&str>,
    ) -> Option<DiscoveredSession> {
        let (pattern, project_hash) = self.layout(tool, working_dir);
        let threshold = started_at - chrono::Duration::from_std(MTIME_TOLERANCE).ok()?;

        let mut candidates: Vec<(DateTime<Utc>, PathBuf)> = glob::glob(&pattern)
            .ok()?
            .filter_map(Result::ok)
            .filter_map(|path| {
                let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
                let modified = DateTime::<Utc>::from(modified);
                (modified >= threshold).then_some((modified, path))
            })
            .collect();

        if candidates.is_empty() {
            debug!(tool = %tool, pattern = %pattern, "No native session files found");
            return None;
        }

        // Newest first.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let probe = prompt
            .map(|p| p.trim().chars().take(PROMPT_PROBE_CHARS).collect::<String>())
            .filter(|p| !p.is_empty());
        let chosen = probe
            .and_then(|probe| {
                candidates.iter().find(|(_, path)| {
                    std::fs::read_to_string(path)
                        .map(|content| {
                            content.contains(&probe) || content.contains(&json_escaped(&probe))
                        })
                        .unwrap_or(false)
                })
            })
            .unwrap_or(&candidates[0]);
        let path = chosen.1.clone();

        let session_id = session_id_for(tool, &path)?;
        debug!(
            tool = %tool,
            session_id = %session_id,
            path = %path.display(),
            "Discovered native session"
        );

        Some(DiscoveredSession {
            session_id,
            path: Some(path),
            project_hash,
        })
    }
}

#[async_trait]
impl NativeSessionDiscovery for FsSessionDiscovery {
    async fn discover(
        &self,
        tool: Tool,
        started_at: DateTime<Utc>,
        working_dir: &Path,
        prompt: Option<&str>,
    ) -> Option<DiscoveredSession> {
        let this = self.clone();
        let working_dir = working_dir.to_path_buf();
        let prompt = prompt.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            this.scan(tool, started_at, &working_dir, prompt.as_deref())
        })
        .await
        .ok()
        .flatten()
    }
}

/// Hex SHA-256 of the working directory, as the Gemini-family tools use it.
pub fn project_hash(working_dir: &Path) -> String {
    let digest = Sha256::digest(working_dir.to_string_lossy().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Directory name Claude uses for a project: every non-alphanumeric becomes `-`.
pub fn claude_project_slug(working_dir: &Path) -> String {
    working_dir
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn json_escaped(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_default();
    quoted.trim_matches('"').to_string()
}

fn session_id_for(tool: Tool, path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    match tool {
        Tool::Claude => Some(stem),
        Tool::Codex => Regex::new(UUID_PATTERN)
            .ok()?
            .find(&stem)
            .map(|m| m.as_str().to_string()),
        Tool::Gemini | Tool::Qwen => {
            let from_content = std::fs::read_to_string(path)
                .ok()
                .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
                .and_then(|value| value.get("sessionId")?.as_str().map(str::to_string));
            Some(from_content.unwrap_or(stem))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn earlier() -> DateTime<Utc> {
        Utc::now() - chrono::Duration::seconds(30)
    }

    #[test]
    fn test_project_hash_is_hex_sha256() {
        let hash = project_hash(Path::new("/work/app"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, project_hash(Path::new("/work/app")));
        assert_ne!(hash, project_hash(Path::new("/work/other")));
    }

    #[test]
    fn test_claude_slug() {
        assert_eq!(
            claude_project_slug(Path::new("/home/me/my.app")),
            "-home-me-my-app"
        );
    }

    #[tokio::test]
    async fn test_discovers_claude_session() {
        let home = TempDir::new().unwrap();
        let cwd = Path::new("/work/app");
        let file = home
            .path()
            .join(".claude/projects/-work-app/3f2a9c1e-1111-2222-3333-444455556666.jsonl");
        write(&file, "{\"type\":\"user\",\"message\":\"list files\"}\n");

        let discovery = FsSessionDiscovery::new(home.path());
        let found = discovery
            .discover(Tool::Claude, earlier(), cwd, Some("list files"))
            .await
            .unwrap();
        assert_eq!(found.session_id, "3f2a9c1e-1111-2222-3333-444455556666");
        assert_eq!(found.path, Some(file));
        assert_eq!(found.project_hash.as_deref(), Some("-work-app"));
    }

    #[tokio::test]
    async fn test_discovers_gemini_session_id_from_content() {
        let home = TempDir::new().unwrap();
        let cwd = Path::new("/work/app");
        let file = home
            .path()
            .join(".gemini/tmp")
            .join(project_hash(cwd))
            .join("chats/session-2025-01-01T10-00-abcd.json");
        write(&file, r#"{"sessionId": "gem-session-42", "messages": []}"#);

        let found = FsSessionDiscovery::new(home.path())
            .discover(Tool::Gemini, earlier(), cwd, None)
            .await
            .unwrap();
        assert_eq!(found.session_id, "gem-session-42");
    }

    #[tokio::test]
    async fn test_discovers_codex_rollout_uuid() {
        let home = TempDir::new().unwrap();
        let file = home.path().join(
            ".codex/sessions/2025/01/01/rollout-2025-01-01T10-00-00-0199aaaa-bbbb-cccc-dddd-eeeeffff0000.jsonl",
        );
        write(&file, "{}\n");

        let found = FsSessionDiscovery::new(home.path())
            .discover(Tool::Codex, earlier(), Path::new("/anywhere"), None)
            .await
            .unwrap();
        assert_eq!(found.session_id, "0199aaaa-bbbb-cccc-dddd-eeeeffff0000");
        assert!(found.project_hash.is_none());
    }

    #[tokio::test]
    async fn test_prefers_file_containing_prompt() {
        let home = TempDir::new().unwrap();
        let cwd = Path::new("/work/app");
        let dir = home.path().join(".claude/projects/-work-app");
        write(&dir.join("matching.jsonl"), "{\"content\":\"explain \\\"main\\\"\"}\n");
        write(&dir.join("other.jsonl"), "{\"content\":\"unrelated\"}\n");

        let found = FsSessionDiscovery::new(home.path())
            .discover(Tool::Claude, earlier(), cwd, Some("explain \"main\""))
            .await
            .unwrap();
        assert_eq!(found.session_id, "matching");
    }

    #[tokio::test]
    async fn test_old_files_are_ignored() {
        let home = TempDir::new().unwrap();
        let cwd = Path::new("/work/app");
        write(
            &home.path().join(".claude/projects/-work-app/old.jsonl"),
            "{}\n",
        );

        let later = Utc::now() + chrono::Duration::seconds(60);
        let found = FsSessionDiscovery::new(home.path())
            .discover(Tool::Claude, later, cwd, None)
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_finds_nothing() {
        let home = TempDir::new().unwrap();
        let found = FsSessionDiscovery::new(home.path())
            .discover(Tool::Qwen, earlier(), Path::new("/work/app"), None)
            .await;
        assert!(found.is_none());
    }
}
