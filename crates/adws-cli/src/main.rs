mod cli;
mod state;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Completions must not touch config or logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "adws", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,adws=debug",
        _ => "trace",
    };

    if cli.otel {
        adws_observe::tracing_setup::init_tracing(true)
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let state = AppState::init().await?;

    let result = match &cli.command {
        Commands::Run {
            workflow,
            input,
            issue,
            story,
        } => cli::run::execute(&state, &cli, workflow, input, issue.clone(), story.clone()).await,
        Commands::List { all } => cli::workflow::list(&state, &cli, *all),
        Commands::Show { name } => cli::workflow::show(&state, &cli, name),
        Commands::Validate { file } => cli::workflow::validate(&cli, file),
        Commands::Status { run_id, limit } => {
            cli::status::execute(&state, &cli, run_id.clone(), *limit)
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    adws_observe::tracing_setup::shutdown_tracing();

    result
}
