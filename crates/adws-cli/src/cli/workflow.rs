//! `adws list`, `adws show`, `adws validate` — workflow inspection commands.

use std::path::Path;

use anyhow::{Context as _, bail};
use comfy_table::{Cell, Color, Table, presets};
use console::style;
use serde_json::json;

use adws_core::pipeline::definition::load_workflow_file;
use adws_types::workflow::Workflow;

use crate::cli::Cli;
use crate::state::AppState;

pub fn list(state: &AppState, cli: &Cli, all: bool) -> anyhow::Result<()> {
    let workflows: Vec<&Workflow> = if all {
        state.workflows.all().collect()
    } else {
        state.workflows.dispatchable()
    };

    if cli.json {
        let payload: Vec<_> = workflows
            .iter()
            .map(|w| {
                json!({
                    "name": w.name,
                    "description": w.description,
                    "steps": w.steps.len(),
                    "dispatchable": w.dispatchable,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!("{}", style("No workflows registered.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Steps").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
    ]);
    for workflow in &workflows {
        table.add_row(vec![
            Cell::new(&workflow.name),
            Cell::new(workflow.steps.len()),
            Cell::new(workflow.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    if !cli.quiet {
        println!(
            "{}",
            style("Run a workflow with: adws run <name>").dim()
        );
    }
    Ok(())
}

pub fn show(state: &AppState, cli: &Cli, name: &str) -> anyhow::Result<()> {
    let Some(workflow) = state.workflows.get(name) else {
        bail!("unknown workflow '{name}'");
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(workflow)?);
        return Ok(());
    }

    println!("{}", style(&workflow.name).cyan().bold());
    if let Some(description) = &workflow.description {
        println!("{description}");
    }
    if !workflow.dispatchable {
        println!("{}", style("(composition building block)").dim());
    }
    println!();
    println!("{}", step_table(workflow));
    Ok(())
}

pub fn validate(cli: &Cli, file: &Path) -> anyhow::Result<()> {
    let workflow = load_workflow_file(file)
        .with_context(|| format!("workflow file '{}' is invalid", file.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "valid": true,
                "name": workflow.name,
                "steps": workflow.steps.len(),
            }))?
        );
    } else {
        println!(
            "{} {} ({} steps)",
            style("Valid:").green().bold(),
            workflow.name,
            workflow.steps.len()
        );
    }
    Ok(())
}

fn step_table(workflow: &Workflow) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Step").fg(Color::Cyan),
        Cell::new("Function").fg(Color::Cyan),
        Cell::new("Retries").fg(Color::Cyan),
        Cell::new("Flags").fg(Color::Cyan),
    ]);
    for (idx, step) in workflow.steps.iter().enumerate() {
        let function = if step.shell {
            format!("$ {}", step.command.as_deref().unwrap_or(""))
        } else {
            step.function.clone().unwrap_or_default()
        };
        let mut flags = Vec::new();
        if step.always_run {
            flags.push("always_run");
        }
        if step.condition.is_some() {
            flags.push("conditional");
        }
        if step.output.is_some() {
            flags.push("publishes");
        }
        if step.input_from.is_some() {
            flags.push("wired");
        }
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&step.name),
            Cell::new(function),
            Cell::new(step.max_attempts),
            Cell::new(flags.join(", ")),
        ]);
    }
    table
}
