//! CLI command definitions and argument parsing for the `adws` binary.

pub mod run;
pub mod status;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Drive AI developer workflows: plan, implement, review.
#[derive(Parser)]
#[command(name = "adws", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow by name, or from a YAML file.
    Run {
        /// Registered workflow name, or a path to a workflow YAML file.
        workflow: String,

        /// Initial context inputs as key=value pairs (values may be JSON).
        #[arg(short, long, value_name = "KEY=VALUE")]
        input: Vec<String>,

        /// Shorthand for `--input issue_id=<ID>`.
        #[arg(long)]
        issue: Option<String>,

        /// Shorthand for `--input story_path=<PATH>`.
        #[arg(long)]
        story: Option<PathBuf>,
    },

    /// List registered workflows.
    #[command(alias = "ls")]
    List {
        /// Include non-dispatchable building-block workflows.
        #[arg(long)]
        all: bool,
    },

    /// Show the steps of a registered workflow.
    Show {
        /// Workflow name.
        name: String,
    },

    /// Parse and validate a workflow YAML file.
    Validate {
        /// Path to the workflow YAML file.
        file: PathBuf,
    },

    /// Show recent runs, or the step log of one run.
    Status {
        /// Run UUID (omit to list recent runs).
        run_id: Option<String>,

        /// Maximum number of runs to display.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}
