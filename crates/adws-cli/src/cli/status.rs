//! `adws status` — inspect recorded runs.

use anyhow::{Context as _, bail};
use comfy_table::{Cell, Color, Table, presets};
use console::style;
use serde_json::json;
use uuid::Uuid;

use adws_types::run::{RunRecord, RunStatus, StepStatus};

use crate::cli::Cli;
use crate::state::AppState;

pub fn execute(
    state: &AppState,
    cli: &Cli,
    run_id: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    match run_id {
        Some(id) => show_run(state, cli, &id),
        None => list_runs(state, cli, limit),
    }
}

fn list_runs(state: &AppState, cli: &Cli, limit: usize) -> anyhow::Result<()> {
    let records = state
        .runlog
        .list_records()
        .context("failed to read run log")?;
    let records: Vec<&RunRecord> = records.iter().take(limit).collect();

    if cli.json {
        let payload: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "run_id": r.id,
                    "workflow": r.workflow_name,
                    "status": r.status,
                    "started_at": r.started_at,
                    "completed_at": r.completed_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", style("No runs recorded yet.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Run").fg(Color::Cyan),
        Cell::new("Workflow").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Started").fg(Color::Cyan),
    ]);
    for record in &records {
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(&record.workflow_name),
            status_cell(record.status),
            Cell::new(record.started_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn show_run(state: &AppState, cli: &Cli, raw_id: &str) -> anyhow::Result<()> {
    let run_id: Uuid = raw_id
        .parse()
        .with_context(|| format!("'{raw_id}' is not a valid run ID"))?;
    let record = match state.runlog.load_record(run_id) {
        Ok(record) => record,
        Err(adws_infra::runlog::RunLogError::NotFound(_)) => bail!("no run found for {run_id}"),
        Err(e) => return Err(e).context("failed to read run record"),
    };
    let steps = state
        .runlog
        .load_steps(run_id)
        .context("failed to read step log")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "record": record,
                "steps": steps,
            }))?
        );
        return Ok(());
    }

    println!(
        "{} {} {}",
        style(&record.workflow_name).cyan().bold(),
        style(record.id).dim(),
        match record.status {
            RunStatus::Completed => style("completed").green(),
            RunStatus::Failed => style("failed").red(),
            RunStatus::Running => style("running").yellow(),
            RunStatus::Pending => style("pending").dim(),
        }
    );
    if let Some(error) = &record.error {
        println!("{} {error}", style("error:").red());
    }

    if steps.is_empty() {
        println!("{}", style("No step log entries.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Step").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Attempts").fg(Color::Cyan),
        Cell::new("Duration").fg(Color::Cyan),
        Cell::new("Error").fg(Color::Cyan),
    ]);
    for entry in &steps {
        let status = match entry.status {
            StepStatus::Completed => Cell::new("completed").fg(Color::Green),
            StepStatus::Failed => Cell::new("failed").fg(Color::Red),
            StepStatus::Skipped => Cell::new("skipped").fg(Color::DarkGrey),
            StepStatus::Running => Cell::new("running").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(&entry.step_name),
            status,
            Cell::new(entry.attempts),
            Cell::new(format!("{}ms", entry.duration_ms)),
            Cell::new(entry.error.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn status_cell(status: RunStatus) -> Cell {
    match status {
        RunStatus::Completed => Cell::new("completed").fg(Color::Green),
        RunStatus::Failed => Cell::new("failed").fg(Color::Red),
        RunStatus::Running => Cell::new("running").fg(Color::Yellow),
        RunStatus::Pending => Cell::new("pending").fg(Color::DarkGrey),
    }
}
