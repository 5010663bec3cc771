//! The step function suite.
//!
//! Packages every infrastructure client as a named step function for
//! the `adws-core` registry. Handlers read what they need from the
//! context inputs, do their I/O, and return a derived context with
//! their results in the outputs. Errors come back as `PipelineError`
//! values; the executor stamps the owning step's name onto them.

use std::sync::Arc;

use serde_json::{Value, json};

use adws_core::pipeline::context::{FeedbackEntry, WorkflowContext};
use adws_core::pipeline::registry::{SHELL_STEP_FUNCTION, StepRegistry};
use adws_types::config::GlobalConfig;
use adws_types::error::{ErrorKind, PipelineError};

use crate::agent::{AgentError, AgentRunner};
use crate::beads::{BeadsClient, BeadsError};
use crate::process::CommandRunner;
use crate::story::load_story_file;
use crate::tools::{CheckReport, ToolRunner};

// ---------------------------------------------------------------------------
// StepServices
// ---------------------------------------------------------------------------

/// Shared clients behind the step functions.
#[derive(Clone)]
pub struct StepServices {
    pub beads: BeadsClient,
    pub agent: AgentRunner,
    pub tools: ToolRunner,
}

impl StepServices {
    pub fn from_config(runner: Arc<dyn CommandRunner>, config: &GlobalConfig) -> Self {
        Self {
            beads: BeadsClient::new(runner.clone(), &config.beads),
            agent: AgentRunner::new(runner.clone(), &config.agent),
            tools: ToolRunner::new(runner, &config.tools),
        }
    }
}

/// Build the full step registry backed by the given services.
pub fn build_step_registry(services: Arc<StepServices>) -> StepRegistry {
    let mut registry = StepRegistry::new();

    macro_rules! register {
        ($name:expr, $handler:path) => {{
            let svc = services.clone();
            registry.register_fn($name, move |ctx: WorkflowContext| {
                let svc = svc.clone();
                Box::pin(async move { $handler(svc, ctx).await })
            });
        }};
    }

    register!(SHELL_STEP_FUNCTION, run_shell_command);
    register!("agent_prompt", agent_prompt);
    register!("bead_show", bead_show);
    register!("bead_create", bead_create);
    register!("bead_close", bead_close);
    register!("bead_update_notes", bead_update_notes);
    register!("run_lints", run_lints);
    register!("run_tests", run_tests);
    register!("load_story", load_story);
    register!("record_results", record_results);

    registry
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Shell-mode dispatch target: runs the injected `command` input.
async fn run_shell_command(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let command = require_str(&ctx, SHELL_STEP_FUNCTION, "command")?;
    let report = svc
        .tools
        .run_shell(&command)
        .await
        .map_err(|e| execution_error(SHELL_STEP_FUNCTION, e))?;

    check_report_to_outcome(SHELL_STEP_FUNCTION, "command_result", report, ctx)
}

/// One prompt/response exchange with the agent CLI.
///
/// Uses the `prompt` input verbatim when present; otherwise composes a
/// prompt from the accumulated context (issue, story, plan, feedback).
async fn agent_prompt(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let prompt = match ctx.input_str("prompt") {
        Some(p) => p.to_string(),
        None => compose_prompt(&ctx).ok_or_else(|| {
            PipelineError::new(
                "agent_prompt",
                ErrorKind::MissingInput,
                "no 'prompt' input and no context to compose one from",
            )
        })?,
    };

    let response = svc
        .agent
        .prompt(&prompt)
        .await
        .map_err(|e| agent_error("agent_prompt", e))?;

    Ok(ctx.with_output(
        "agent_response",
        json!({
            "result": response.result,
            "session_id": response.session_id,
            "total_cost_usd": response.total_cost_usd,
        }),
    ))
}

/// `bd show`: fetch the issue named by the `issue_id` input.
async fn bead_show(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let issue_id = require_str(&ctx, "bead_show", "issue_id")?;
    let issue = svc
        .beads
        .show(&issue_id)
        .await
        .map_err(|e| beads_error("bead_show", e))?;

    let issue_value =
        serde_json::to_value(&issue).map_err(|e| execution_error("bead_show", e))?;
    Ok(ctx.with_output("issue", issue_value))
}

/// `bd create`: file a new issue from `title` (+ optional type,
/// priority, description inputs).
async fn bead_create(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let title = require_str(&ctx, "bead_create", "title")?;
    let issue_type = ctx.input_str("issue_type").map(str::to_string);
    let priority = ctx
        .input("priority")
        .and_then(Value::as_u64)
        .map(|p| p.min(u8::MAX as u64) as u8);
    let description = ctx.input_str("description").map(str::to_string);

    let issue = svc
        .beads
        .create(
            &title,
            issue_type.as_deref(),
            priority,
            description.as_deref(),
        )
        .await
        .map_err(|e| beads_error("bead_create", e))?;

    let issue_value =
        serde_json::to_value(&issue).map_err(|e| execution_error("bead_create", e))?;
    Ok(ctx
        .with_output("issue", issue_value)
        .with_output("issue_id", json!(issue.id)))
}

/// `bd close`: close the issue named by the `issue_id` input.
async fn bead_close(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let issue_id = require_str(&ctx, "bead_close", "issue_id")?;
    svc.beads
        .close(&issue_id)
        .await
        .map_err(|e| beads_error("bead_close", e))?;
    Ok(ctx.with_output("closed_issue", json!(issue_id)))
}

/// `bd update-notes`: attach the `notes` input (string or JSON) to the
/// issue named by `issue_id`.
async fn bead_update_notes(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let issue_id = require_str(&ctx, "bead_update_notes", "issue_id")?;
    let notes = ctx
        .input("notes")
        .map(value_as_text)
        .ok_or_else(|| missing_input("bead_update_notes", "notes"))?;

    svc.beads
        .update_notes(&issue_id, &notes)
        .await
        .map_err(|e| beads_error("bead_update_notes", e))?;
    Ok(ctx.with_output("notes_recorded", json!(issue_id)))
}

/// Run the configured lint command; a red run fails the step.
async fn run_lints(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let report = svc
        .tools
        .run_lints()
        .await
        .map_err(|e| execution_error("run_lints", e))?;
    check_report_to_outcome("run_lints", "lint_result", report, ctx)
}

/// Run the configured test command; a red run fails the step.
async fn run_tests(
    svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let report = svc
        .tools
        .run_tests()
        .await
        .map_err(|e| execution_error("run_tests", e))?;
    check_report_to_outcome("run_tests", "test_result", report, ctx)
}

/// Load and parse the story file named by the `story_path` input.
async fn load_story(
    _svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let path = require_str(&ctx, "load_story", "story_path")?;
    let story = load_story_file(std::path::Path::new(&path))
        .map_err(|e| execution_error("load_story", e))?;

    let story_value =
        serde_json::to_value(&story).map_err(|e| execution_error("load_story", e))?;
    Ok(ctx.with_output("story", story_value))
}

/// Summarize the run so far into a `run_summary` output and a feedback
/// entry. Intended for always-run wrap-up steps.
async fn record_results(
    _svc: Arc<StepServices>,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let output_keys: Vec<&String> = ctx.outputs().keys().collect();
    let summary = json!({
        "workflow": ctx.workflow_name(),
        "run_id": ctx.run_id().to_string(),
        "outputs": output_keys,
        "feedback_entries": ctx.feedback().len(),
    });
    tracing::info!(
        workflow = %ctx.workflow_name(),
        outputs = ctx.outputs().len(),
        "recording run results"
    );

    let message = format!(
        "run produced {} output(s) and {} feedback entr(ies)",
        ctx.outputs().len(),
        ctx.feedback().len()
    );
    Ok(ctx
        .with_feedback(FeedbackEntry::new("record_results", message))
        .with_output("run_summary", summary))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_str(
    ctx: &WorkflowContext,
    function: &str,
    key: &str,
) -> Result<String, PipelineError> {
    ctx.input_str(key)
        .map(str::to_string)
        .ok_or_else(|| missing_input(function, key))
}

fn missing_input(function: &str, key: &str) -> PipelineError {
    PipelineError::new(
        function,
        ErrorKind::MissingInput,
        format!("required input '{key}' is missing"),
    )
    .with_context("input", key)
}

fn execution_error(function: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::new(function, ErrorKind::ExecutionFailed, err.to_string())
}

fn beads_error(function: &str, err: BeadsError) -> PipelineError {
    let kind = match &err {
        BeadsError::NonZeroExit { .. } => ErrorKind::CommandNonZeroExit,
        BeadsError::Unparseable { .. } => ErrorKind::CommandOutputUnparseable,
        BeadsError::Command(_) => ErrorKind::ExecutionFailed,
    };
    PipelineError::new(function, kind, err.to_string())
}

fn agent_error(function: &str, err: AgentError) -> PipelineError {
    let kind = match &err {
        AgentError::NonZeroExit { .. } => ErrorKind::CommandNonZeroExit,
        AgentError::Unparseable(_) => ErrorKind::CommandOutputUnparseable,
        AgentError::TurnFailed(_) | AgentError::Command(_) => ErrorKind::ExecutionFailed,
    };
    PipelineError::new(function, kind, err.to_string())
}

/// Green report becomes an output; red report fails the step with the
/// output tail attached for triage.
fn check_report_to_outcome(
    function: &str,
    output_key: &str,
    report: CheckReport,
    ctx: WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    if report.passed {
        let value =
            serde_json::to_value(&report).map_err(|e| execution_error(function, e))?;
        return Ok(ctx.with_output(output_key, value));
    }

    Err(PipelineError::new(
        function,
        ErrorKind::CommandNonZeroExit,
        format!("'{}' exited with {:?}", report.command, report.exit_code),
    )
    .with_context("command", report.command)
    .with_context("output", report.output))
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Compose an agent prompt from whatever the run has accumulated.
fn compose_prompt(ctx: &WorkflowContext) -> Option<String> {
    let mut sections = Vec::new();
    // Wired-in issue context wins over the ambient promoted one.
    if let Some(issue) = ctx.input("issue_context").or_else(|| ctx.input("issue")) {
        sections.push(format!("## Issue\n{}", value_as_text(issue)));
    }
    for (key, heading) in [("story", "Story"), ("plan", "Plan")] {
        if let Some(value) = ctx.input(key) {
            sections.push(format!("## {heading}\n{}", value_as_text(value)));
        }
    }
    if !ctx.feedback().is_empty() {
        let notes: Vec<String> = ctx
            .feedback()
            .iter()
            .map(|f| format!("- [{}] {}", f.source, f.message))
            .collect();
        sections.push(format!("## Feedback\n{}", notes.join("\n")));
    }

    if sections.is_empty() {
        return None;
    }
    Some(format!(
        "You are working through a development workflow. Continue based on the context below.\n\n{}",
        sections.join("\n\n")
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
