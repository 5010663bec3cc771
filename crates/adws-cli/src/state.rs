//! Application state wiring the engine to its infrastructure.
//!
//! `AppState` pins the step registry to the production clients (real
//! subprocess runner, configured `bd`/`claude`/tool commands) and
//! assembles the workflow registry from the built-in workflows plus any
//! YAML definitions discovered under `{data_dir}/workflows/`.

use std::path::PathBuf;
use std::sync::Arc;

use adws_core::pipeline::builtin::register_builtin_workflows;
use adws_core::pipeline::definition::discover_workflows;
use adws_core::pipeline::registry::{StepRegistry, WorkflowRegistry};
use adws_infra::config::{data_dir, load_global_config};
use adws_infra::process::TokioCommandRunner;
use adws_infra::runlog::RunLogStore;
use adws_infra::steps::{StepServices, build_step_registry};
use adws_types::config::GlobalConfig;

/// Shared application state for all CLI commands.
pub struct AppState {
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub step_registry: StepRegistry,
    pub workflows: WorkflowRegistry,
    pub runlog: RunLogStore,
}

impl AppState {
    /// Initialize: resolve the data directory, load config, build the
    /// step and workflow registries.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let runner = Arc::new(TokioCommandRunner::new());
        let services = Arc::new(StepServices::from_config(runner, &config));
        let step_registry = build_step_registry(services);

        let mut workflows = WorkflowRegistry::new();
        register_builtin_workflows(&mut workflows);

        // User workflows override built-ins on name collision.
        let workflows_dir = data_dir.join("workflows");
        for (path, workflow) in discover_workflows(&workflows_dir)? {
            tracing::debug!(?path, workflow = %workflow.name, "registering discovered workflow");
            workflows.register(workflow);
        }

        let runlog = RunLogStore::new(&data_dir);

        Ok(Self {
            config,
            data_dir,
            step_registry,
            workflows,
            runlog,
        })
    }
}
