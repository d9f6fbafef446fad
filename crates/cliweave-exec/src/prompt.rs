//! Prompt concatenation for tools that cannot resume a session themselves.
//!
//! Prior turns and the new request are serialized into one of three textual
//! encodings. The output is a pure function of its inputs: the same turns,
//! prompt and settings always give byte-identical text.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::Serialize;

use cliweave_core::config::ResumeConfig;
use cliweave_core::conversation::truncate_utf8;
use cliweave_core::{Error, Turn};

const PLAIN_HISTORY_HEADER: &str = "=== CONVERSATION HISTORY ===";
const PLAIN_REQUEST_DELIMITER: &str = "\n=== NEW REQUEST ===\n\n";
const YAML_REQUEST_DELIMITER: &str = "\nnew_request: |-\n";

/// Encoding used for concatenated history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFormat {
    /// Section-delimited text
    #[default]
    Plain,
    /// Indented block text
    Yaml,
    /// Pretty-printed JSON document
    Json,
}

impl PromptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptFormat::Plain => "plain",
            PromptFormat::Yaml => "yaml",
            PromptFormat::Json => "json",
        }
    }
}

impl fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(PromptFormat::Plain),
            "yaml" => Ok(PromptFormat::Yaml),
            "json" => Ok(PromptFormat::Json),
            other => Err(Error::Config(format!(
                "Unknown prompt format '{}'. Valid values: plain, yaml, json",
                other
            ))),
        }
    }
}

/// Serializes history plus a new request into a single prompt.
#[derive(Debug, Clone)]
pub struct PromptConcatenator {
    format: PromptFormat,
    max_turn_output_bytes: usize,
    preamble: Option<String>,
}

impl Default for PromptConcatenator {
    fn default() -> Self {
        Self::new(PromptFormat::Plain)
    }
}

impl PromptConcatenator {
    pub fn new(format: PromptFormat) -> Self {
        Self {
            format,
            max_turn_output_bytes: 8192,
            preamble: None,
        }
    }

    /// Build from the `[resume]` configuration section.
    pub fn from_config(config: &ResumeConfig) -> Result<Self, Error> {
        Ok(Self {
            format: config.format.parse()?,
            max_turn_output_bytes: config.max_turn_output_bytes,
            preamble: config.context_preamble.clone(),
        })
    }

    pub fn with_format(mut self, format: PromptFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_max_turn_output_bytes(mut self, max: usize) -> Self {
        self.max_turn_output_bytes = max;
        self
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn format(&self) -> PromptFormat {
        self.format
    }

    /// Encode `turns` followed by `new_prompt`.
    pub fn concatenate(&self, turns: &[Turn], new_prompt: &str) -> String {
        match self.format {
            PromptFormat::Plain => self.plain(turns, new_prompt),
            PromptFormat::Yaml => self.yaml(turns, new_prompt),
            PromptFormat::Json => self.json(turns, new_prompt),
        }
    }

    fn assistant_text(&self, turn: &Turn) -> String {
        let text = turn.output.text();
        let (kept, cut) = truncate_utf8(text, self.max_turn_output_bytes);
        if cut {
            format!("{}\n... [truncated {} bytes]", kept, text.len() - kept.len())
        } else {
            kept.to_string()
        }
    }

    fn plain(&self, turns: &[Turn], new_prompt: &str) -> String {
        let mut out = String::new();
        if let Some(preamble) = &self.preamble {
            let _ = write!(out, "{}\n\n", preamble);
        }
        out.push_str(PLAIN_HISTORY_HEADER);
        out.push('\n');

        for turn in turns {
            let _ = write!(out, "\n--- Turn {} ---\n", turn.index);
            if let Some(source) = &turn.source_id {
                let _ = writeln!(out, "Source: {}", source);
            }
            let _ = writeln!(out, "Timestamp: {}", timestamp(turn));
            let _ = writeln!(out, "Status: {}", turn.status);
            let _ = writeln!(out, "Duration: {}ms", turn.duration_ms);
            let _ = write!(out, "\nUSER:\n{}\n", turn.prompt);
            let _ = write!(out, "\nASSISTANT:\n{}\n", self.assistant_text(turn));
        }

        out.push_str(PLAIN_REQUEST_DELIMITER);
        out.push_str(new_prompt);
        out.push('\n');
        out
    }

    fn yaml(&self, turns: &[Turn], new_prompt: &str) -> String {
        let mut out = String::new();
        if let Some(preamble) = &self.preamble {
            let _ = writeln!(out, "instructions: |-\n{}", indent_block(preamble, "  "));
        }

        if turns.is_empty() {
            out.push_str("conversation: []\n");
        } else {
            out.push_str("conversation:\n");
        }
        for turn in turns {
            let _ = writeln!(out, "  - turn: {}", turn.index);
            if let Some(source) = &turn.source_id {
                let _ = writeln!(out, "    source: {}", source);
            }
            let _ = writeln!(out, "    timestamp: \"{}\"", timestamp(turn));
            let _ = writeln!(out, "    status: {}", turn.status);
            let _ = writeln!(out, "    duration_ms: {}", turn.duration_ms);
            let _ = writeln!(out, "    user: |-\n{}", indent_block(&turn.prompt, "      "));
            let _ = writeln!(
                out,
                "    assistant: |-\n{}",
                indent_block(&self.assistant_text(turn), "      ")
            );
        }

        // The delimiter's leading newline is the last line break above.
        out.pop();
        out.push_str(YAML_REQUEST_DELIMITER);
        out.push_str(&indent_block(new_prompt, "  "));
        out.push('\n');
        out
    }

    fn json(&self, turns: &[Turn], new_prompt: &str) -> String {
        let doc = JsonDocument {
            instructions: self.preamble.as_deref(),
            history: turns
                .iter()
                .map(|turn| JsonTurn {
                    turn: turn.index,
                    source: turn.source_id.as_deref(),
                    timestamp: timestamp(turn),
                    status: turn.status.as_str(),
                    duration_ms: turn.duration_ms,
                    user: &turn.prompt,
                    assistant: self.assistant_text(turn),
                })
                .collect(),
            new_request: new_prompt,
        };

        // Serializing borrowed strings and integers cannot fail.
        let mut out = serde_json::to_string_pretty(&doc).unwrap_or_default();
        out.push('\n');
        out
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    history: Vec<JsonTurn<'a>>,
    new_request: &'a str,
}

#[derive(Serialize)]
struct JsonTurn<'a> {
    turn: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    timestamp: String,
    status: &'static str,
    duration_ms: u64,
    user: &'a str,
    assistant: String,
}

fn timestamp(turn: &Turn) -> String {
    turn.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Indent every non-empty line of `text`, preserving empty lines as-is.
fn indent_block(text: &str, indent: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recover the new request from concatenated text.
///
/// Returns `None` when the text does not carry a request section in `format`.
pub fn extract_new_request(text: &str, format: PromptFormat) -> Option<String> {
    match format {
        PromptFormat::Plain => {
            let start = text.rfind(PLAIN_REQUEST_DELIMITER)? + PLAIN_REQUEST_DELIMITER.len();
            let rest = &text[start..];
            Some(rest.strip_suffix('\n').unwrap_or(rest).to_string())
        }
        PromptFormat::Yaml => {
            let start = text.rfind(YAML_REQUEST_DELIMITER)? + YAML_REQUEST_DELIMITER.len();
            let rest = &text[start..];
            let body = rest.strip_suffix('\n').unwrap_or(rest);
            Some(
                body.split('\n')
                    .map(|line| line.strip_prefix("  ").unwrap_or(line))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        PromptFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(text).ok()?;
            value.get("new_request")?.as_str().map(str::to_string)
        }
    }
}
