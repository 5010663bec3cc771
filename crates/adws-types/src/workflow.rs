//! Workflow domain types for ADWS.
//!
//! Defines the canonical representation for pipelines: `Step` (one configured
//! unit of work) and `Workflow` (an ordered, immutable list of steps plus
//! dispatch metadata). YAML definition files and the combinator API both
//! produce these values; once constructed they are treated as read-only
//! configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single step in a workflow.
///
/// Immutable once constructed: combinators and the executor never mutate a
/// `Step`, they build new ones. Execution resolves `function` through the
/// step registry, unless `shell` is set, in which case `command` is injected
/// into the context and dispatched to the generic shell-execution handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier, used for logging and data-flow keys.
    pub name: String,
    /// Registry name of the handler to invoke (required unless `shell`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Execute even after a prior step has failed (cleanup/teardown steps).
    #[serde(default)]
    pub always_run: bool,
    /// Number of execution attempts before the step counts as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts, in seconds.
    #[serde(default)]
    pub retry_delay_secs: f64,
    /// Shell mode: run `command` instead of a registry function.
    #[serde(default)]
    pub shell: bool,
    /// Literal shell command for shell mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Name under which this step's result is published to the data-flow
    /// registry for later steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Data-flow wiring: {registry source key -> local input key}.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_from: Option<BTreeMap<String, String>>,
    /// JEXL predicate over the current context; false means skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

fn default_max_attempts() -> u32 {
    1
}

impl Step {
    /// Start building a step with the given name.
    pub fn builder(name: impl Into<String>) -> StepBuilder {
        StepBuilder {
            step: Step {
                name: name.into(),
                function: None,
                always_run: false,
                max_attempts: default_max_attempts(),
                retry_delay_secs: 0.0,
                shell: false,
                command: None,
                output: None,
                input_from: None,
                condition: None,
            },
        }
    }

    /// The delay between retry attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs.max(0.0))
    }

    /// A copy of this step with `max_attempts` replaced.
    ///
    /// Used by `with_verification` to parameterize the verify step's retry
    /// budget without touching any other field.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Step {
        Step {
            max_attempts,
            ..self.clone()
        }
    }
}

/// Builder for [`Step`].
#[derive(Debug, Clone)]
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    /// Registry function name to invoke.
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.step.function = Some(function.into());
        self
    }

    /// Mark the step as always-run (executes even after a prior failure).
    pub fn always_run(mut self) -> Self {
        self.step.always_run = true;
        self
    }

    /// Number of attempts before the step counts as failed (>= 1).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.step.max_attempts = max_attempts;
        self
    }

    /// Delay between attempts, in seconds.
    pub fn retry_delay_secs(mut self, secs: f64) -> Self {
        self.step.retry_delay_secs = secs;
        self
    }

    /// Shell mode: run a literal command instead of a registry function.
    pub fn shell_command(mut self, command: impl Into<String>) -> Self {
        self.step.shell = true;
        self.step.command = Some(command.into());
        self
    }

    /// Publish this step's result under `name` in the data-flow registry.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.step.output = Some(name.into());
        self
    }

    /// Pull a published value into this step's inputs before execution.
    pub fn input_from(
        mut self,
        source_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        self.step
            .input_from
            .get_or_insert_with(BTreeMap::new)
            .insert(source_key.into(), local_key.into());
        self
    }

    /// JEXL condition; the step is skipped when it evaluates to false.
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.step.condition = Some(expression.into());
        self
    }

    /// Finish building the step.
    pub fn build(self) -> Step {
        self.step
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// An ordered, immutable list of steps plus dispatch metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name (kebab-case identifier).
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered list of steps.
    pub steps: Vec<Step>,
    /// Whether this workflow may be invoked directly from the command
    /// layer, as opposed to being only a composition building block.
    #[serde(default)]
    pub dispatchable: bool,
}

impl Workflow {
    /// Create a dispatchable workflow from a list of steps.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
            dispatchable: true,
        }
    }

    /// A copy of this workflow with the description set.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A copy of this workflow with `dispatchable` replaced.
    pub fn with_dispatchable(mut self, dispatchable: bool) -> Self {
        self.dispatchable = dispatchable;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let step = Step::builder("compile").function("run_shell_command").build();
        assert_eq!(step.name, "compile");
        assert_eq!(step.max_attempts, 1);
        assert_eq!(step.retry_delay_secs, 0.0);
        assert!(!step.always_run);
        assert!(!step.shell);
        assert!(step.condition.is_none());
    }

    #[test]
    fn test_builder_shell_mode() {
        let step = Step::builder("fmt").shell_command("cargo fmt --check").build();
        assert!(step.shell);
        assert_eq!(step.command.as_deref(), Some("cargo fmt --check"));
        assert!(step.function.is_none());
    }

    #[test]
    fn test_with_max_attempts_replaces_only_that_field() {
        let step = Step::builder("verify")
            .function("run_tests")
            .always_run()
            .max_attempts(5)
            .retry_delay_secs(1.5)
            .output("verify_result")
            .condition("inputs.changed == true")
            .build();

        let replaced = step.with_max_attempts(1);
        assert_eq!(replaced.max_attempts, 1);
        assert_eq!(
            Step {
                max_attempts: 5,
                ..replaced
            },
            step
        );
    }

    #[test]
    fn test_retry_delay_clamps_negative() {
        let mut step = Step::builder("x").function("f").build();
        step.retry_delay_secs = -2.0;
        assert_eq!(step.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn test_step_yaml_roundtrip() {
        let yaml = r#"
name: implement
function: agent_prompt
max_attempts: 3
retry_delay_secs: 0.5
output: implement_result
input_from:
  plan_result: plan
condition: "inputs.issue_id | length > 0"
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(step.name, "implement");
        assert_eq!(step.max_attempts, 3);
        assert_eq!(step.input_from.as_ref().unwrap()["plan_result"], "plan");

        let back = serde_yaml_ng::to_string(&step).unwrap();
        let reparsed: Step = serde_yaml_ng::from_str(&back).unwrap();
        assert_eq!(reparsed, step);
    }

    #[test]
    fn test_workflow_defaults_and_copies() {
        let wf = Workflow::new("plan", vec![Step::builder("a").function("f").build()])
            .with_description("plan an issue");
        assert!(wf.dispatchable);
        assert_eq!(wf.description.as_deref(), Some("plan an issue"));

        let building_block = wf.clone().with_dispatchable(false);
        assert!(!building_block.dispatchable);
        assert_eq!(building_block.steps, wf.steps);
    }
}
