//! Single-step runner, retry wrapper, and the sequential run loop.
//!
//! Execution is strictly sequential: one step runs to completion (or
//! exhausts its retries) before the next is considered. The only
//! suspension point besides the handlers themselves is the retry delay
//! between attempts of one step. Failures are values; nothing in this
//! module panics across a step boundary.

use std::time::Instant;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use adws_types::error::{ErrorKind, PipelineError};
use adws_types::run::StepStatus;
use adws_types::workflow::{Step, Workflow};

use super::context::WorkflowContext;
use super::dataflow::{DataFlowRegistry, resolve_input_from};
use super::expression::ConditionEvaluator;
use super::registry::{SHELL_STEP_FUNCTION, StepRegistry};

// ---------------------------------------------------------------------------
// Run reporting
// ---------------------------------------------------------------------------

/// Per-step record of what the run loop did with one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step_name: String,
    pub status: StepStatus,
    /// Attempts actually made (0 when the step never executed).
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    fn skipped(step_name: &str) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Skipped,
            attempts: 0,
            duration_ms: 0,
            error: None,
        }
    }

    fn completed(step_name: &str, attempts: u32, duration_ms: u64) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Completed,
            attempts,
            duration_ms,
            error: None,
        }
    }

    fn failed(step_name: &str, attempts: u32, duration_ms: u64, error: &PipelineError) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Failed,
            attempts,
            duration_ms,
            error: Some(error.to_string()),
        }
    }
}

/// Full outcome of one `run_workflow` invocation.
#[derive(Debug)]
pub struct RunReport {
    /// Final context on success, or the primary (first) failure.
    pub outcome: Result<WorkflowContext, PipelineError>,
    /// One entry per workflow step, in order.
    pub steps: Vec<StepReport>,
    /// Failures from always-run steps that executed after the primary
    /// failure. Auxiliary only; never returned as the outcome.
    pub always_run_failures: Vec<PipelineError>,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Interprets workflows against a step registry.
///
/// Holds no per-run state; the data-flow registry and context live for
/// exactly one `run_workflow` call.
pub struct WorkflowExecutor<'r> {
    registry: &'r StepRegistry,
    evaluator: ConditionEvaluator,
}

impl<'r> WorkflowExecutor<'r> {
    pub fn new(registry: &'r StepRegistry) -> Self {
        Self {
            registry,
            evaluator: ConditionEvaluator::new(),
        }
    }

    // -- single step ---------------------------------------------------------

    /// Resolve and invoke one step's callable.
    ///
    /// Shell-mode steps dispatch to the reserved `run_shell_command`
    /// function with the literal command injected under the `command`
    /// input key. Handler panics are caught and converted to an
    /// `execution_failed` error; this function never unwinds. Errors
    /// returned by handlers are re-stamped with the step's name so
    /// handlers do not need to know which step invoked them.
    pub async fn run_step(
        &self,
        step: &Step,
        ctx: &WorkflowContext,
    ) -> Result<WorkflowContext, PipelineError> {
        let (function_name, call_ctx) = if step.shell {
            let command = step.command.as_deref().ok_or_else(|| {
                PipelineError::new(
                    &step.name,
                    ErrorKind::InvalidConfiguration,
                    "shell step has no command",
                )
            })?;
            (
                SHELL_STEP_FUNCTION,
                ctx.with_input("command", json!(command)),
            )
        } else {
            let function = step.function.as_deref().ok_or_else(|| {
                PipelineError::new(
                    &step.name,
                    ErrorKind::InvalidConfiguration,
                    "step declares neither a function nor a shell command",
                )
            })?;
            (function, ctx.clone())
        };

        let handler = self.registry.resolve(function_name).ok_or_else(|| {
            PipelineError::new(
                &step.name,
                ErrorKind::UnresolvedFunction,
                format!("no step function '{function_name}' registered"),
            )
            .with_context("function", function_name)
        })?;

        match std::panic::AssertUnwindSafe(handler.call(call_ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(new_ctx)) => Ok(new_ctx),
            Ok(Err(err)) => Err(PipelineError {
                step_name: step.name.clone(),
                ..err
            }),
            Err(payload) => Err(PipelineError::new(
                &step.name,
                ErrorKind::ExecutionFailed,
                format!("step function panicked: {}", panic_message(&*payload)),
            )
            .with_context("function", function_name)),
        }
    }

    /// `run_step` with the step's attempt-count retry policy applied.
    ///
    /// Waits `retry_delay_secs` between attempts, returns the first
    /// success immediately, and the last failure once attempts are
    /// exhausted. Every failure kind is retried identically.
    pub async fn run_step_with_retry(
        &self,
        step: &Step,
        ctx: &WorkflowContext,
    ) -> Result<WorkflowContext, PipelineError> {
        self.run_step_with_retry_counted(step, ctx).await.1
    }

    /// Retry loop that also reports how many attempts were made.
    async fn run_step_with_retry_counted(
        &self,
        step: &Step,
        ctx: &WorkflowContext,
    ) -> (u32, Result<WorkflowContext, PipelineError>) {
        let max_attempts = step.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match self.run_step(step, ctx).await {
                Ok(new_ctx) => {
                    tracing::debug!(step = %step.name, attempt, "step succeeded");
                    return (attempt, Ok(new_ctx));
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        step = %step.name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "step attempt failed; retrying"
                    );
                    tokio::time::sleep(step.retry_delay()).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        step = %step.name,
                        attempts = attempt,
                        error = %err,
                        "step failed"
                    );
                    return (
                        attempt,
                        Err(err.with_context("attempts", attempt.to_string())),
                    );
                }
            }
        }
    }

    // -- skip decision -------------------------------------------------------

    /// True when the step's `condition` evaluates to false.
    ///
    /// Steps without a condition never skip. Evaluation errors are
    /// converted to a `condition_evaluation` failure; the caller treats
    /// that as the step failing.
    pub fn should_skip_step(
        &self,
        step: &Step,
        ctx: &WorkflowContext,
    ) -> Result<bool, PipelineError> {
        let Some(condition) = &step.condition else {
            return Ok(false);
        };

        self.evaluator
            .evaluate_condition(condition, ctx)
            .map(|run| !run)
            .map_err(|err| {
                PipelineError::new(&step.name, ErrorKind::ConditionEvaluation, err.to_string())
                    .with_context("condition", condition.clone())
            })
    }

    // -- run loop ------------------------------------------------------------

    /// Run a workflow to its terminal outcome.
    ///
    /// Halt-but-drain policy: after the first failure, only `always_run`
    /// steps still execute (still subject to their own conditions), and
    /// the first failure is what the caller gets back. Failures from
    /// drained always-run steps are attached to the primary error's
    /// context under `always_run_failure.<step>` keys.
    pub async fn run_workflow(
        &self,
        workflow: &Workflow,
        initial: WorkflowContext,
    ) -> Result<WorkflowContext, PipelineError> {
        self.run_workflow_with_report(workflow, initial).await.outcome
    }

    /// `run_workflow` variant that also returns per-step reports for
    /// run logging.
    pub async fn run_workflow_with_report(
        &self,
        workflow: &Workflow,
        initial: WorkflowContext,
    ) -> RunReport {
        tracing::info!(
            workflow = %workflow.name,
            run_id = %initial.run_id(),
            steps = workflow.steps.len(),
            "workflow run started"
        );

        let mut dataflow = DataFlowRegistry::new();
        let mut pipeline_failure: Option<PipelineError> = None;
        let mut always_run_failures: Vec<PipelineError> = Vec::new();
        let mut current_ctx = initial;
        let mut reports: Vec<StepReport> = Vec::with_capacity(workflow.steps.len());

        for step in &workflow.steps {
            if pipeline_failure.is_some() && !step.always_run {
                tracing::debug!(step = %step.name, "skipping: pipeline already failed");
                reports.push(StepReport::skipped(&step.name));
                continue;
            }

            match self.should_skip_step(step, &current_ctx) {
                Ok(true) => {
                    tracing::debug!(step = %step.name, "skipping: condition is false");
                    reports.push(StepReport::skipped(&step.name));
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    reports.push(StepReport::failed(&step.name, 0, 0, &err));
                    record_failure(err, &mut pipeline_failure, &mut always_run_failures);
                    continue;
                }
            }

            let step_ctx = match resolve_input_from(step, &dataflow, &current_ctx) {
                Ok(ctx) => ctx,
                Err(err) => {
                    reports.push(StepReport::failed(&step.name, 0, 0, &err));
                    record_failure(err, &mut pipeline_failure, &mut always_run_failures);
                    continue;
                }
            };

            let started = Instant::now();
            let (attempts, result) = self.run_step_with_retry_counted(step, &step_ctx).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(new_ctx) => {
                    if let Some(output_name) = &step.output {
                        let delta = output_delta(&current_ctx, &new_ctx);
                        dataflow.publish(output_name, Value::Object(delta));
                    }
                    current_ctx = new_ctx.promote_outputs();
                    reports.push(StepReport::completed(&step.name, attempts, duration_ms));
                }
                Err(err) => {
                    reports.push(StepReport::failed(&step.name, attempts, duration_ms, &err));
                    record_failure(err, &mut pipeline_failure, &mut always_run_failures);
                }
            }
        }

        let outcome = match pipeline_failure {
            Some(mut primary) => {
                for secondary in &always_run_failures {
                    primary = primary.with_context(
                        format!("always_run_failure.{}", secondary.step_name),
                        secondary.to_string(),
                    );
                }
                tracing::warn!(
                    workflow = %workflow.name,
                    error = %primary,
                    secondary_failures = always_run_failures.len(),
                    "workflow run failed"
                );
                Err(primary)
            }
            None => {
                tracing::info!(workflow = %workflow.name, "workflow run completed");
                Ok(current_ctx)
            }
        };

        RunReport {
            outcome,
            steps: reports,
            always_run_failures,
        }
    }
}

/// First failure becomes the pipeline's primary; anything after it came
/// from a drained always-run step and is auxiliary.
fn record_failure(
    err: PipelineError,
    primary: &mut Option<PipelineError>,
    secondary: &mut Vec<PipelineError>,
) {
    if primary.is_none() {
        *primary = Some(err);
    } else {
        secondary.push(err);
    }
}

/// Output keys the step added or changed, used as its published value.
fn output_delta(before: &WorkflowContext, after: &WorkflowContext) -> Map<String, Value> {
    let mut delta = Map::new();
    for (key, value) in after.outputs() {
        if before.output(key) != Some(value) {
            delta.insert(key.clone(), value.clone());
        }
    }
    delta
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
