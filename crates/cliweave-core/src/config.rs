//! Configuration system for cliweave.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
use crate::tool::{ExecutionMode, Tool};

/// Main configuration struct for cliweave.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process execution settings
    pub execution: ExecutionConfig,
    /// Conversation resume settings
    pub resume: ResumeConfig,
    /// Tool availability probing
    pub prober: ProberConfig,
    /// History storage location
    pub storage: StorageConfig,
    /// Per-tool settings
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout per invocation in milliseconds, 0 disables it
    pub default_timeout_ms: u64,
    /// Mode used when none is given
    pub default_mode: ExecutionMode,
    /// Keep full output on each turn
    pub cache_output: bool,
    /// Bytes of stdout kept on each turn
    pub stdout_preview_bytes: usize,
    /// Bytes of stderr kept on each turn
    pub stderr_preview_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 0,
            default_mode: ExecutionMode::Analysis,
            cache_output: false,
            stdout_preview_bytes: 10_240,
            stderr_preview_bytes: 2_048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// Prompt concatenation format: plain, yaml, json
    pub format: String,
    /// Byte ceiling for each prior response in a concatenated prompt
    pub max_turn_output_bytes: usize,
    /// Number of prior turns injected for hybrid resume
    pub hybrid_context_turns: usize,
    /// Never use a tool's own resume support
    pub disable_native: bool,
    /// Optional instruction placed before injected history
    pub context_preamble: Option<String>,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            format: "plain".to_string(),
            max_turn_output_bytes: 8_192,
            hybrid_context_turns: 5,
            disable_native: false,
            context_preamble: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProberConfig {
    /// How long a positive probe stays cached
    pub cache_ttl_secs: u64,
    /// Hard limit on one locate query
    pub probe_timeout_secs: u64,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            probe_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the history directory
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub gemini: ToolConfig,
    pub qwen: ToolConfig,
    pub codex: ToolConfig,
    pub claude: ToolConfig,
}

impl ToolsConfig {
    /// Settings for one tool.
    pub fn get(&self, tool: Tool) -> &ToolConfig {
        match tool {
            Tool::Gemini => &self.gemini,
            Tool::Qwen => &self.qwen,
            Tool::Codex => &self.codex,
            Tool::Claude => &self.claude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Whether the tool may be invoked
    pub enabled: bool,
    /// Model used when a request names none
    pub default_model: Option<String>,
    /// Executable name or path (defaults to the tool name)
    pub executable: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_model: None,
            executable: None,
        }
    }
}

impl ToolConfig {
    /// Resolve the executable to launch for `tool`.
    pub fn executable_for(&self, tool: Tool) -> String {
        self.executable
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| tool.default_executable().to_string())
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .collect()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Field path (e.g., "resume.format")
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

/// Accepted values for `resume.format`.
pub const PROMPT_FORMATS: [&str; 3] = ["plain", "yaml", "json"];

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// The layered provider stack, lowest precedence first.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            // Project config
            .merge(Toml::file(".cliweave/config.toml"))
            // Project local config (gitignored)
            .merge(Toml::file(".cliweave/config.local.toml"))
            .merge(Env::prefixed("CLIWEAVE_").split("__"))
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !PROMPT_FORMATS.contains(&self.resume.format.as_str()) {
            result.add_error(
                "resume.format",
                format!(
                    "Invalid format '{}'. Valid values: {:?}",
                    self.resume.format, PROMPT_FORMATS
                ),
            );
        }

        if self.resume.max_turn_output_bytes == 0 {
            result.add_error(
                "resume.max_turn_output_bytes",
                "max_turn_output_bytes must be greater than 0",
            );
        }

        if self.resume.hybrid_context_turns == 0 {
            result.add_warning(
                "resume.hybrid_context_turns",
                "hybrid resume will inject no prior turns",
            );
        }

        if self.execution.stdout_preview_bytes == 0 {
            result.add_warning(
                "execution.stdout_preview_bytes",
                "stdout previews will be empty; history becomes unreadable",
            );
        }

        if self.prober.probe_timeout_secs == 0 {
            result.add_error(
                "prober.probe_timeout_secs",
                "probe_timeout_secs must be greater than 0",
            );
        }

        for tool in Tool::ALL {
            let tool_config = self.tools.get(tool);
            if let Some(ref exe) = tool_config.executable {
                if exe.trim().is_empty() {
                    result.add_warning(
                        format!("tools.{}.executable", tool),
                        "executable is empty string, the default name will be used",
                    );
                }
            }
        }

        if Tool::ALL.iter().all(|t| !self.tools.get(*t).enabled) {
            result.add_warning("tools", "every tool is disabled");
        }

        result
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("cliweave"))
            .unwrap_or_else(|| PathBuf::from("~/.config/cliweave"))
    }

    /// Get the data directory (for conversation history).
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|p| p.join("cliweave"))
                .unwrap_or_else(|| PathBuf::from("~/.local/share/cliweave"))
        })
    }
}
