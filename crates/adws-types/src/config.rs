//! Global configuration types.
//!
//! Deserialized from `{data_dir}/config.toml`; every field has a default so a
//! missing or partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Top-level ADWS configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// Agent CLI settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Issue tracker CLI settings.
    #[serde(default)]
    pub beads: BeadsConfig,
    /// Lint/test tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Settings for the Claude Code CLI invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Command name or path (default "claude").
    #[serde(default = "default_agent_command")]
    pub command: String,
    /// Model override passed as `--model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-invocation timeout in seconds.
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            model: None,
            timeout_secs: default_agent_timeout_secs(),
        }
    }
}

fn default_agent_command() -> String {
    "claude".to_string()
}

fn default_agent_timeout_secs() -> u64 {
    600
}

/// Settings for the Beads issue tracker CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeadsConfig {
    /// Command name or path (default "bd").
    #[serde(default = "default_beads_command")]
    pub command: String,
}

impl Default for BeadsConfig {
    fn default() -> Self {
        Self {
            command: default_beads_command(),
        }
    }
}

fn default_beads_command() -> String {
    "bd".to_string()
}

/// Lint and test commands run during verification steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Lint command line (default "cargo clippy -- -D warnings").
    #[serde(default = "default_lint_command")]
    pub lint_command: String,
    /// Test command line (default "cargo test").
    #[serde(default = "default_test_command")]
    pub test_command: String,
    /// Per-tool timeout in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            lint_command: default_lint_command(),
            test_command: default_test_command(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_lint_command() -> String {
    "cargo clippy -- -D warnings".to_string()
}

fn default_test_command() -> String {
    "cargo test".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    1800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.agent.command, "claude");
        assert_eq!(config.agent.timeout_secs, 600);
        assert_eq!(config.beads.command, "bd");
        assert_eq!(config.tools.test_command, "cargo test");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
[agent]
model = "claude-sonnet-4-20250514"

[tools]
lint_command = "ruff check ."
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.command, "claude");
        assert_eq!(config.agent.model.as_deref(), Some("claude-sonnet-4-20250514"));
        assert_eq!(config.tools.lint_command, "ruff check .");
        assert_eq!(config.tools.test_command, "cargo test");
        assert_eq!(config.beads.command, "bd");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
    }
}
