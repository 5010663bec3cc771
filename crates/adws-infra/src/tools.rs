//! Lint and test tool invocation.
//!
//! Runs the configured command lines through `sh -c` and reduces the
//! result to a pass/fail report with the captured output, which the
//! verification steps publish and attach to failures.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use adws_types::config::ToolsConfig;

use crate::process::{CommandError, CommandRunner, CommandSpec};

/// Keep reports bounded; tool output tails are what matter for triage.
const MAX_REPORT_OUTPUT: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one lint or test command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub command: String,
    pub passed: bool,
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr tail.
    pub output: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Command(#[from] CommandError),
}

// ---------------------------------------------------------------------------
// ToolRunner
// ---------------------------------------------------------------------------

/// Executes the configured lint and test command lines.
#[derive(Clone)]
pub struct ToolRunner {
    runner: Arc<dyn CommandRunner>,
    lint_command: String,
    test_command: String,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &ToolsConfig) -> Self {
        Self {
            runner,
            lint_command: config.lint_command.clone(),
            test_command: config.test_command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub async fn run_lints(&self) -> Result<CheckReport, ToolError> {
        self.run_check(&self.lint_command).await
    }

    pub async fn run_tests(&self) -> Result<CheckReport, ToolError> {
        self.run_check(&self.test_command).await
    }

    /// Run an arbitrary command line the way shell-mode steps expect.
    pub async fn run_shell(&self, command_line: &str) -> Result<CheckReport, ToolError> {
        self.run_check(command_line).await
    }

    async fn run_check(&self, command_line: &str) -> Result<CheckReport, ToolError> {
        let spec = CommandSpec::new("sh")
            .args(["-c", command_line])
            .timeout(self.timeout);
        let output = self.runner.run(spec).await?;

        let mut combined = output.stdout;
        if !output.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&output.stderr);
        }

        let report = CheckReport {
            command: command_line.to_string(),
            passed: output.exit_code == Some(0),
            exit_code: output.exit_code,
            output: tail(&combined, MAX_REPORT_OUTPUT),
        };
        tracing::info!(
            command = %report.command,
            passed = report.passed,
            exit_code = ?report.exit_code,
            "check finished"
        );
        Ok(report)
    }
}

/// Last `limit` bytes of `text`, aligned to a character boundary.
fn tail(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::process::TokioCommandRunner;

    fn runner_with(lint: &str, test: &str) -> ToolRunner {
        let config = ToolsConfig {
            lint_command: lint.to_string(),
            test_command: test.to_string(),
            timeout_secs: 30,
        };
        ToolRunner::new(Arc::new(TokioCommandRunner::new()), &config)
    }

    #[tokio::test]
    async fn passing_command_yields_passed_report() {
        let tools = runner_with("echo lint ok", "true");
        let report = tools.run_lints().await.unwrap();

        assert!(report.passed);
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(report.output.trim(), "lint ok");
        assert_eq!(report.command, "echo lint ok");
    }

    #[tokio::test]
    async fn failing_command_captures_stderr() {
        let tools = runner_with("true", "echo 'test blew up' >&2; exit 2");
        let report = tools.run_tests().await.unwrap();

        assert!(!report.passed);
        assert_eq!(report.exit_code, Some(2));
        assert!(report.output.contains("test blew up"));
    }

    #[tokio::test]
    async fn run_shell_executes_arbitrary_command_line() {
        let tools = runner_with("true", "true");
        let report = tools.run_shell("printf '%s-%s' a b").await.unwrap();

        assert!(report.passed);
        assert_eq!(report.output, "a-b");
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let text = "àbcdé".repeat(10);
        let tailed = tail(&text, 7);
        assert!(tailed.len() <= 7);
        assert!(text.ends_with(&tailed));
    }
}
