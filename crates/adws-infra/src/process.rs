//! Subprocess execution behind the `CommandRunner` trait.
//!
//! Every external tool (`bd`, the Claude CLI, lint/test commands) goes
//! through this seam, so clients can be tested against a scripted fake
//! without spawning anything.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::AsyncWriteExt;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One command invocation: program, arguments, optional stdin and cwd,
/// and a hard timeout.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            cwd: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rendered `program arg1 arg2 ...` form for logs and errors.
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors from spawning or supervising a command. A non-zero exit is
/// not an error here; callers inspect `CommandOutput::success`.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("failed to supervise '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

/// The process-spawning seam. Object-safe so step services can hold an
/// `Arc<dyn CommandRunner>`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: CommandSpec) -> BoxFuture<'static, Result<CommandOutput, CommandError>>;
}

/// Production runner backed by `tokio::process::Command`.
///
/// Stdin is piped and closed after the payload is written; stdout and
/// stderr are captured as lossy UTF-8. The timeout covers the whole
/// lifetime of the child.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for TokioCommandRunner {
    fn run(&self, spec: CommandSpec) -> BoxFuture<'static, Result<CommandOutput, CommandError>> {
        Box::pin(async move {
            let command_display = spec.display();
            tracing::debug!(command = %command_display, "spawning command");

            let mut command = tokio::process::Command::new(&spec.program);
            command
                .args(&spec.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(cwd) = &spec.cwd {
                command.current_dir(cwd);
            }

            let mut child = command.spawn().map_err(|source| CommandError::Spawn {
                command: command_display.clone(),
                source,
            })?;

            if let Some(mut stdin) = child.stdin.take() {
                if let Some(payload) = &spec.stdin {
                    stdin.write_all(payload.as_bytes()).await.ok();
                }
                // Dropping stdin closes the pipe and signals EOF.
            }

            let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
                .await
                .map_err(|_| CommandError::Timeout {
                    command: command_display.clone(),
                    timeout_secs: spec.timeout.as_secs(),
                })?
                .map_err(|source| CommandError::Wait {
                    command: command_display.clone(),
                    source,
                })?;

            let result = CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            tracing::debug!(
                command = %command_display,
                exit_code = ?result.exit_code,
                "command finished"
            );
            Ok(result)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
