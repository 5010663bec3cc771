//! `adws run` — execute a workflow and record the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, bail};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value, json};

use adws_core::pipeline::context::WorkflowContext;
use adws_core::pipeline::definition::load_workflow_file;
use adws_core::pipeline::executor::{RunReport, WorkflowExecutor};
use adws_types::run::{RunRecord, RunStatus, StepLogEntry, StepStatus};
use adws_types::workflow::Workflow;

use crate::cli::Cli;
use crate::state::AppState;

pub async fn execute(
    state: &AppState,
    cli: &Cli,
    workflow_ref: &str,
    raw_inputs: &[String],
    issue: Option<String>,
    story: Option<PathBuf>,
) -> anyhow::Result<()> {
    let workflow = resolve_workflow(state, workflow_ref)?;
    let mut inputs = parse_inputs(raw_inputs)?;
    if let Some(issue_id) = issue {
        inputs.insert("issue_id".to_string(), Value::String(issue_id));
    }
    if let Some(path) = story {
        inputs.insert(
            "story_path".to_string(),
            Value::String(path.display().to_string()),
        );
    }

    let mut record = RunRecord::started(&workflow.name);
    state
        .runlog
        .save_record(&record)
        .context("failed to write run record")?;

    if !cli.json && !cli.quiet {
        println!(
            "{} {} {}",
            style("Running").green().bold(),
            style(&workflow.name).cyan(),
            style(format!("({})", record.id)).dim()
        );
    }

    let spinner = if cli.json || cli.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_message(format!("running {}", workflow.name));
        Some(pb)
    };

    let initial = WorkflowContext::with_initial_inputs(workflow.name.clone(), record.id, inputs);
    let executor = WorkflowExecutor::new(&state.step_registry);
    let report = executor.run_workflow_with_report(&workflow, initial).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    for step in &report.steps {
        let entry = StepLogEntry {
            run_id: record.id,
            step_name: step.step_name.clone(),
            status: step.status,
            attempts: step.attempts,
            error: step.error.clone(),
            duration_ms: step.duration_ms,
            recorded_at: Utc::now(),
        };
        if let Err(e) = state.runlog.append_step(&entry) {
            tracing::warn!(step = %step.step_name, error = %e, "failed to append step log");
        }
    }

    record.completed_at = Some(Utc::now());
    match &report.outcome {
        Ok(ctx) => {
            record.status = RunStatus::Completed;
            record.context = json!({
                "inputs": ctx.inputs(),
                "outputs": ctx.outputs(),
                "feedback": ctx.feedback(),
            });
        }
        Err(err) => {
            record.status = RunStatus::Failed;
            record.error = Some(err.clone());
        }
    }
    state
        .runlog
        .save_record(&record)
        .context("failed to update run record")?;

    if cli.json {
        print_json_report(&record, &report)?;
    } else if !cli.quiet {
        print_styled_report(&record, &report);
    }

    match report.outcome {
        Ok(_) => Ok(()),
        Err(err) => bail!("workflow '{}' failed: {err}", workflow.name),
    }
}

/// Resolve a workflow reference: a YAML file path, or a registered name.
fn resolve_workflow(state: &AppState, workflow_ref: &str) -> anyhow::Result<Workflow> {
    let path = Path::new(workflow_ref);
    let looks_like_file = path
        .extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml");
    if looks_like_file || path.exists() {
        return load_workflow_file(path)
            .with_context(|| format!("failed to load workflow file '{workflow_ref}'"));
    }

    match state.workflows.get(workflow_ref) {
        Some(workflow) if workflow.dispatchable => Ok(workflow.clone()),
        Some(_) => bail!(
            "workflow '{workflow_ref}' is a composition building block and cannot be run directly"
        ),
        None => {
            let known: Vec<&str> = state
                .workflows
                .dispatchable()
                .iter()
                .map(|w| w.name.as_str())
                .collect();
            bail!(
                "unknown workflow '{workflow_ref}' (known: {})",
                known.join(", ")
            )
        }
    }
}

/// Parse `key=value` pairs; values parse as JSON when possible, else strings.
fn parse_inputs(raw: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut inputs = Map::new();
    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --input '{pair}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid --input '{pair}': empty key");
        }
        let parsed = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        inputs.insert(key.to_string(), parsed);
    }
    Ok(inputs)
}

fn print_json_report(record: &RunRecord, report: &RunReport) -> anyhow::Result<()> {
    let steps: Vec<Value> = report
        .steps
        .iter()
        .map(|s| {
            json!({
                "step": s.step_name,
                "status": s.status,
                "attempts": s.attempts,
                "duration_ms": s.duration_ms,
                "error": s.error,
            })
        })
        .collect();
    let payload = json!({
        "run_id": record.id,
        "workflow": record.workflow_name,
        "status": record.status,
        "steps": steps,
        "error": record.error,
        "always_run_failures": report.always_run_failures,
        "context": record.context,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_styled_report(record: &RunRecord, report: &RunReport) {
    for step in &report.steps {
        let (mark, label) = match step.status {
            StepStatus::Completed => (style("✓").green(), style(step.step_name.as_str())),
            StepStatus::Failed => (style("✗").red(), style(step.step_name.as_str()).red()),
            StepStatus::Skipped => (style("-").dim(), style(step.step_name.as_str()).dim()),
            StepStatus::Running => (style("…").yellow(), style(step.step_name.as_str())),
        };
        let timing = if step.attempts > 1 {
            format!("{}ms, {} attempts", step.duration_ms, step.attempts)
        } else {
            format!("{}ms", step.duration_ms)
        };
        println!("  {mark} {label} {}", style(format!("({timing})")).dim());
        if let Some(error) = &step.error {
            println!("      {}", style(error).red().dim());
        }
    }

    match &report.outcome {
        Ok(_) => println!(
            "\n{} run {} completed",
            style("OK").green().bold(),
            style(record.id).dim()
        ),
        Err(err) => {
            println!(
                "\n{} run {} failed: {err}",
                style("FAILED").red().bold(),
                style(record.id).dim()
            );
            for secondary in &report.always_run_failures {
                println!("  {} {secondary}", style("also:").yellow());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inputs_json_and_string() {
        let raw = vec![
            "issue_id=bd-42".to_string(),
            "count=3".to_string(),
            "flags={\"fast\":true}".to_string(),
        ];
        let inputs = parse_inputs(&raw).unwrap();
        assert_eq!(inputs["issue_id"], Value::String("bd-42".to_string()));
        assert_eq!(inputs["count"], json!(3));
        assert_eq!(inputs["flags"]["fast"], json!(true));
    }

    #[test]
    fn test_parse_inputs_rejects_missing_separator() {
        let err = parse_inputs(&["no-equals".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected key=value"));
    }

    #[test]
    fn test_parse_inputs_rejects_empty_key() {
        assert!(parse_inputs(&["=value".to_string()]).is_err());
    }
}
