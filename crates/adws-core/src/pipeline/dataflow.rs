//! Published-output registry and `input_from` resolution.
//!
//! Each run owns one `DataFlowRegistry`. When a step with a declared
//! `output` completes, the executor publishes the step's produced values
//! under that name. Later steps pull published values into their input
//! view through their `input_from` map before they execute.

use std::collections::BTreeMap;

use serde_json::Value;

use adws_types::error::{ErrorKind, PipelineError};
use adws_types::workflow::Step;

use super::context::WorkflowContext;

// ---------------------------------------------------------------------------
// DataFlowRegistry
// ---------------------------------------------------------------------------

/// Per-run map of published step outputs, keyed by the step's declared
/// `output` name.
///
/// Publishing under an existing name replaces the previous value (most
/// recent publisher wins) and logs a warning.
#[derive(Debug, Default, Clone)]
pub struct DataFlowRegistry {
    entries: BTreeMap<String, Value>,
}

impl DataFlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value under `name`, replacing any previous entry.
    pub fn publish(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if self.entries.insert(name.clone(), value).is_some() {
            tracing::warn!(output = %name, "data-flow output republished; previous value replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Published names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// input_from resolution
// ---------------------------------------------------------------------------

/// Resolve a step's `input_from` wiring against the registry, producing
/// the context the step will actually run with.
///
/// For every `source_key -> local_key` pair the published value for
/// `source_key` is copied into the inputs under `local_key`. Fails with
/// `missing_data_flow_source` when a source was never published, and with
/// `data_flow_collision` when a local key would overwrite an existing
/// input (or when two pairs target the same local key).
pub fn resolve_input_from(
    step: &Step,
    registry: &DataFlowRegistry,
    ctx: &WorkflowContext,
) -> Result<WorkflowContext, PipelineError> {
    let Some(wiring) = &step.input_from else {
        return Ok(ctx.clone());
    };

    let mut resolved: Vec<(String, Value)> = Vec::with_capacity(wiring.len());
    for (source_key, local_key) in wiring {
        let value = registry.get(source_key).ok_or_else(|| {
            PipelineError::new(
                &step.name,
                ErrorKind::MissingDataFlowSource,
                format!("no published output named '{source_key}'"),
            )
            .with_context("source_key", source_key.clone())
            .with_context("local_key", local_key.clone())
        })?;

        let collides = ctx.input(local_key).is_some()
            || resolved.iter().any(|(k, _)| k == local_key);
        if collides {
            return Err(PipelineError::new(
                &step.name,
                ErrorKind::DataFlowCollision,
                format!("input key '{local_key}' already present; refusing to overwrite"),
            )
            .with_context("source_key", source_key.clone())
            .with_context("local_key", local_key.clone()));
        }

        resolved.push((local_key.clone(), value.clone()));
    }

    Ok(ctx.with_inputs(resolved))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
