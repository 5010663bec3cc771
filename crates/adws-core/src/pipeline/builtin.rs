//! Stock workflows: plan, implement, review, and the combined sdlc.
//!
//! These are ordinary `Workflow` values built through the combinators;
//! nothing here is special-cased by the executor. Step functions are
//! referenced by name and resolved at run time, so these definitions
//! stay free of any I/O dependency.

use adws_types::workflow::{Step, Workflow};

use super::combinator::{sequence, with_verification};
use super::registry::WorkflowRegistry;

// ---------------------------------------------------------------------------
// Individual workflows
// ---------------------------------------------------------------------------

/// Fetch an issue, draft an implementation plan, and record it on the
/// issue.
pub fn plan_workflow() -> Workflow {
    let steps = vec![
        Step::builder("fetch-issue")
            .function("bead_show")
            .output("issue")
            .build(),
        Step::builder("draft-plan")
            .function("agent_prompt")
            .input_from("issue", "issue_context")
            .max_attempts(2)
            .retry_delay_secs(2.0)
            .output("plan")
            .build(),
        // Only record when the run was seeded with an issue to write to.
        Step::builder("record-plan")
            .function("bead_update_notes")
            .input_from("plan", "notes")
            .condition("inputs.issue_id")
            .build(),
    ];
    Workflow::new("plan", steps).with_description("Draft an implementation plan for an issue")
}

/// Load a story, implement it with verification, and record the results.
pub fn implement_workflow() -> Workflow {
    let intake = Workflow::new(
        "load",
        vec![
            Step::builder("load-story")
                .function("load_story")
                .output("story")
                .build(),
        ],
    );

    let implement_step = Step::builder("implement")
        .function("agent_prompt")
        .max_attempts(2)
        .retry_delay_secs(2.0)
        .build();
    let verify_step = Step::builder("verify-implementation")
        .function("run_tests")
        .output("verify_result")
        .build();
    // Verification gets its own retry budget, independent of how the
    // step above was configured.
    let core = with_verification(&implement_step, &verify_step, 2, None);

    let wrapup = Workflow::new(
        "wrapup",
        vec![
            Step::builder("record-results")
                .function("record_results")
                .always_run()
                .build(),
        ],
    );

    let combined = sequence(&sequence(&intake, &core), &wrapup);
    Workflow::new("implement", combined.steps)
        .with_description("Implement a story and verify it with the test suite")
}

/// Lint, test, and review the current changes, then record the outcome.
pub fn review_workflow() -> Workflow {
    let steps = vec![
        Step::builder("run-lints")
            .function("run_lints")
            .output("lint_result")
            .build(),
        Step::builder("run-tests")
            .function("run_tests")
            .output("test_result")
            .build(),
        Step::builder("review-changes")
            .function("agent_prompt")
            .max_attempts(2)
            .retry_delay_secs(2.0)
            .output("review")
            .build(),
        Step::builder("record-review")
            .function("record_results")
            .always_run()
            .build(),
    ];
    Workflow::new("review", steps).with_description("Lint, test, and review the working tree")
}

/// The full plan -> implement -> review pipeline.
pub fn sdlc_workflow() -> Workflow {
    let combined = sequence(&sequence(&plan_workflow(), &implement_workflow()), &review_workflow());
    Workflow::new("sdlc", combined.steps)
        .with_description("Plan, implement, and review in one pass")
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// All stock workflows, in registration order.
pub fn builtin_workflows() -> Vec<Workflow> {
    vec![
        plan_workflow(),
        implement_workflow(),
        review_workflow(),
        sdlc_workflow(),
    ]
}

/// Register every stock workflow into a registry.
pub fn register_builtin_workflows(registry: &mut WorkflowRegistry) {
    for workflow in builtin_workflows() {
        registry.register(workflow);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::pipeline::definition::validate_workflow;

    #[test]
    fn all_builtins_validate() {
        for workflow in builtin_workflows() {
            validate_workflow(&workflow)
                .unwrap_or_else(|e| panic!("workflow '{}' invalid: {e}", workflow.name));
        }
    }

    #[test]
    fn all_builtins_are_dispatchable() {
        for workflow in builtin_workflows() {
            assert!(workflow.dispatchable, "{} not dispatchable", workflow.name);
        }
    }

    #[test]
    fn sdlc_flattens_all_three_phases() {
        let sdlc = sdlc_workflow();
        let expected: usize = [plan_workflow(), implement_workflow(), review_workflow()]
            .iter()
            .map(|w| w.steps.len())
            .sum();
        assert_eq!(sdlc.steps.len(), expected);

        // Flattening must not produce duplicate step names.
        let names: HashSet<&str> = sdlc.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), sdlc.steps.len());
    }

    #[test]
    fn implement_verification_has_overridden_attempts() {
        let implement = implement_workflow();
        let verify = implement
            .steps
            .iter()
            .find(|s| s.name == "verify-implementation")
            .expect("verification step present");
        assert_eq!(verify.max_attempts, 2);
        assert_eq!(verify.function.as_deref(), Some("run_tests"));
    }

    #[test]
    fn wrapup_steps_are_always_run() {
        for (workflow, step) in [("implement", "record-results"), ("review", "record-review")] {
            let wf = builtin_workflows()
                .into_iter()
                .find(|w| w.name == workflow)
                .unwrap();
            let step = wf.steps.iter().find(|s| s.name == step).unwrap();
            assert!(step.always_run);
        }
    }

    #[test]
    fn registration_covers_every_builtin() {
        let mut registry = WorkflowRegistry::new();
        register_builtin_workflows(&mut registry);

        for name in ["plan", "implement", "review", "sdlc"] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert_eq!(registry.dispatchable().len(), 4);
    }
}
