//! Claude CLI agent runner.
//!
//! Drives the `claude` binary in non-interactive mode: the prompt goes
//! in on stdin, `--output-format json` comes back with the result text
//! and run metadata. No SDK, no streaming; one prompt, one response.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use adws_types::config::AgentConfig;

use crate::process::{CommandError, CommandRunner, CommandSpec};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed `claude -p --output-format json` payload.
///
/// Only the fields the workflows consume; the CLI emits more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The assistant's final text.
    #[serde(default)]
    pub result: String,
    /// Set when the CLI itself reports a failed turn.
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("agent exited with {exit_code:?}: {stderr}")]
    NonZeroExit {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("agent output is not valid JSON: {0}")]
    Unparseable(String),

    #[error("agent reported an error: {0}")]
    TurnFailed(String),
}

// ---------------------------------------------------------------------------
// AgentRunner
// ---------------------------------------------------------------------------

/// Invokes the configured agent CLI for one prompt/response exchange.
#[derive(Clone)]
pub struct AgentRunner {
    runner: Arc<dyn CommandRunner>,
    command: String,
    model: Option<String>,
    timeout: Duration,
}

impl AgentRunner {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &AgentConfig) -> Self {
        Self {
            runner,
            command: config.command.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run one prompt to completion and return the parsed response.
    pub async fn prompt(&self, prompt: &str) -> Result<AgentResponse, AgentError> {
        let mut spec = CommandSpec::new(&self.command)
            .args(["-p", "--output-format", "json"])
            .stdin(prompt)
            .timeout(self.timeout);
        if let Some(model) = &self.model {
            spec = spec.arg("--model").arg(model);
        }

        tracing::info!(prompt_bytes = prompt.len(), "invoking agent");
        let output = self.runner.run(spec).await?;

        if !output.success() {
            return Err(AgentError::NonZeroExit {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let response: AgentResponse = serde_json::from_str(&output.stdout)
            .map_err(|e| AgentError::Unparseable(e.to_string()))?;

        if response.is_error {
            return Err(AgentError::TurnFailed(response.result));
        }

        tracing::info!(
            session_id = response.session_id.as_deref().unwrap_or("-"),
            cost_usd = response.total_cost_usd.unwrap_or(0.0),
            "agent turn completed"
        );
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
