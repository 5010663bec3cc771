//! Step function and workflow registries.
//!
//! Both registries are plain maps handed to the executor by the caller.
//! Nothing here is global: the CLI builds one `StepRegistry` and one
//! `WorkflowRegistry` at startup and threads them through, which keeps
//! tests free to register fakes without touching process state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use adws_types::error::PipelineError;
use adws_types::workflow::Workflow;

use super::context::WorkflowContext;

/// Reserved function name that shell-mode steps dispatch to.
///
/// The executor injects the step's `command` string into the context
/// inputs under `"command"` before calling this function.
pub const SHELL_STEP_FUNCTION: &str = "run_shell_command";

// ---------------------------------------------------------------------------
// StepHandler
// ---------------------------------------------------------------------------

/// Boxed future returned by every step function.
pub type StepFuture = BoxFuture<'static, Result<WorkflowContext, PipelineError>>;

/// A registered step function.
///
/// Handlers take the context by value and return a derived one; the
/// executor never hands the same context to a handler twice. Implemented
/// for any `Fn(WorkflowContext) -> StepFuture`, so closures register
/// directly via [`StepRegistry::register_fn`].
pub trait StepHandler: Send + Sync {
    fn call(&self, ctx: WorkflowContext) -> StepFuture;
}

impl<F> StepHandler for F
where
    F: Fn(WorkflowContext) -> StepFuture + Send + Sync,
{
    fn call(&self, ctx: WorkflowContext) -> StepFuture {
        self(ctx)
    }
}

// ---------------------------------------------------------------------------
// StepRegistry
// ---------------------------------------------------------------------------

/// Name -> step function map consulted by the executor.
#[derive(Default)]
pub struct StepRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn StepHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(function = %name, "replacing registered step function");
        }
    }

    /// Register a closure as a step function.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(WorkflowContext) -> StepFuture + Send + Sync + 'static,
    {
        self.register(name, Arc::new(f));
    }

    /// Look up a handler by function name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WorkflowRegistry
// ---------------------------------------------------------------------------

/// Name -> workflow map. Iteration order is alphabetical by name.
#[derive(Debug, Default, Clone)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Workflow>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow under its own name, replacing any previous entry.
    pub fn register(&mut self, workflow: Workflow) {
        if self.workflows.contains_key(&workflow.name) {
            tracing::warn!(workflow = %workflow.name, "replacing registered workflow");
        }
        self.workflows.insert(workflow.name.clone(), workflow);
    }

    pub fn get(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// All registered workflows, sorted by name.
    pub fn all(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.values()
    }

    /// Workflows a user may launch directly, sorted by name.
    pub fn dispatchable(&self) -> Vec<&Workflow> {
        self.workflows.values().filter(|w| w.dispatchable).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use adws_types::workflow::Step;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx() -> WorkflowContext {
        WorkflowContext::new("test", Uuid::now_v7())
    }

    // -- StepRegistry --------------------------------------------------------

    #[tokio::test]
    async fn register_and_resolve_closure() {
        let mut registry = StepRegistry::new();
        registry.register_fn("touch", |ctx: WorkflowContext| {
            Box::pin(async move { Ok(ctx.with_output("touched", json!(true))) })
        });

        let handler = registry.resolve("touch").expect("registered");
        let out = handler.call(ctx()).await.unwrap();
        assert_eq!(out.output("touched"), Some(&json!(true)));
    }

    #[test]
    fn resolve_unknown_returns_none() {
        let registry = StepRegistry::new();
        assert!(registry.resolve("ghost").is_none());
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = StepRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register_fn(name, |ctx: WorkflowContext| {
                Box::pin(async move { Ok(ctx) })
            });
        }
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn re_registering_replaces_handler() {
        let mut registry = StepRegistry::new();
        registry.register_fn("f", |ctx: WorkflowContext| {
            Box::pin(async move { Ok(ctx.with_output("v", json!(1))) })
        });
        registry.register_fn("f", |ctx: WorkflowContext| {
            Box::pin(async move { Ok(ctx.with_output("v", json!(2))) })
        });

        let out = registry.resolve("f").unwrap().call(ctx()).await.unwrap();
        assert_eq!(out.output("v"), Some(&json!(2)));
        assert_eq!(registry.len(), 1);
    }

    // -- WorkflowRegistry ----------------------------------------------------

    fn workflow(name: &str, dispatchable: bool) -> Workflow {
        Workflow::new(name, vec![Step::builder("noop").function("noop").build()])
            .with_dispatchable(dispatchable)
    }

    #[test]
    fn dispatchable_filters_and_sorts() {
        let mut registry = WorkflowRegistry::new();
        registry.register(workflow("review", true));
        registry.register(workflow("internal-drain", false));
        registry.register(workflow("plan", true));

        let names: Vec<&str> = registry
            .dispatchable()
            .iter()
            .map(|w| w.name.as_str())
            .collect();
        assert_eq!(names, vec!["plan", "review"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = WorkflowRegistry::new();
        registry.register(workflow("plan", true));
        registry.register(workflow("plan", false));

        assert_eq!(registry.len(), 1);
        assert!(!registry.get("plan").unwrap().dispatchable);
    }
}
