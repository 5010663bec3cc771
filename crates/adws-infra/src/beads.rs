//! Client for the Beads (`bd`) issue-tracker CLI.
//!
//! Wraps the handful of subcommands the workflows use: `show`, `create`,
//! `close`, and `update-notes`. All JSON parsing is lenient; `bd` adds
//! fields across versions and the workflows only care about a stable
//! core.

use std::sync::Arc;
use std::time::Duration;

use adws_types::config::BeadsConfig;
use adws_types::issue::Issue;

use crate::process::{CommandError, CommandRunner, CommandSpec};

/// Timeout for every `bd` invocation; the tracker is a local tool and
/// should answer quickly.
const BD_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BeadsError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("bd {subcommand} exited with {exit_code:?}: {stderr}")]
    NonZeroExit {
        subcommand: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("bd {subcommand} produced unparseable output: {message}")]
    Unparseable { subcommand: String, message: String },
}

// ---------------------------------------------------------------------------
// BeadsClient
// ---------------------------------------------------------------------------

/// Thin wrapper over the configured `bd` binary.
#[derive(Clone)]
pub struct BeadsClient {
    runner: Arc<dyn CommandRunner>,
    command: String,
}

impl BeadsClient {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &BeadsConfig) -> Self {
        Self {
            runner,
            command: config.command.clone(),
        }
    }

    /// `bd show <id> --json`
    pub async fn show(&self, issue_id: &str) -> Result<Issue, BeadsError> {
        let output = self.invoke("show", [issue_id, "--json"]).await?;
        parse_issue("show", &output)
    }

    /// `bd create <title> [--type t] [--priority n] [-d description] --json`
    pub async fn create(
        &self,
        title: &str,
        issue_type: Option<&str>,
        priority: Option<u8>,
        description: Option<&str>,
    ) -> Result<Issue, BeadsError> {
        let mut args: Vec<String> = vec!["create".into(), title.into()];
        if let Some(t) = issue_type {
            args.push("--type".into());
            args.push(t.into());
        }
        if let Some(p) = priority {
            args.push("--priority".into());
            args.push(p.to_string());
        }
        if let Some(d) = description {
            args.push("-d".into());
            args.push(d.into());
        }
        args.push("--json".into());

        let output = self.invoke_raw("create", args).await?;
        parse_issue("create", &output)
    }

    /// `bd close <id>`
    pub async fn close(&self, issue_id: &str) -> Result<(), BeadsError> {
        self.invoke("close", [issue_id]).await?;
        Ok(())
    }

    /// `bd update-notes <id>` with the notes on stdin, so arbitrary
    /// markdown survives shell-free.
    pub async fn update_notes(&self, issue_id: &str, notes: &str) -> Result<(), BeadsError> {
        let spec = CommandSpec::new(&self.command)
            .args(["update-notes", issue_id, "--stdin"])
            .stdin(notes)
            .timeout(BD_TIMEOUT);
        self.run_checked("update-notes", spec).await?;
        Ok(())
    }

    async fn invoke<'a>(
        &self,
        subcommand: &str,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<String, BeadsError> {
        let mut full: Vec<String> = vec![subcommand.to_string()];
        full.extend(args.into_iter().map(str::to_string));
        self.invoke_raw(subcommand, full).await
    }

    async fn invoke_raw(
        &self,
        subcommand: &str,
        args: Vec<String>,
    ) -> Result<String, BeadsError> {
        let spec = CommandSpec::new(&self.command).args(args).timeout(BD_TIMEOUT);
        self.run_checked(subcommand, spec).await
    }

    async fn run_checked(
        &self,
        subcommand: &str,
        spec: CommandSpec,
    ) -> Result<String, BeadsError> {
        let output = self.runner.run(spec).await?;
        if !output.success() {
            return Err(BeadsError::NonZeroExit {
                subcommand: subcommand.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn parse_issue(subcommand: &str, stdout: &str) -> Result<Issue, BeadsError> {
    serde_json::from_str(stdout).map_err(|e| BeadsError::Unparseable {
        subcommand: subcommand.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
