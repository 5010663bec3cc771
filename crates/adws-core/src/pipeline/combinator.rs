//! Pure workflow builders: `sequence` and `with_verification`.
//!
//! Combinators never execute anything and never mutate their arguments.
//! Steps are immutable, so the built workflows share step values with
//! their sources by plain clone.

use adws_types::workflow::{Step, Workflow};

/// Concatenate two workflows' step lists into one new workflow.
///
/// The result is non-dispatchable: composed workflows are building
/// blocks, re-register with `with_dispatchable(true)` to expose one as
/// a direct entry point. Associative over step order.
pub fn sequence(a: &Workflow, b: &Workflow) -> Workflow {
    let steps = a
        .steps
        .iter()
        .chain(b.steps.iter())
        .cloned()
        .collect::<Vec<Step>>();

    Workflow::new(format!("{}+{}", a.name, b.name), steps).with_dispatchable(false)
}

/// Pair a main step with a verification step in a 2-step workflow.
///
/// The verification step's `max_attempts` is always replaced with
/// `verify_max_attempts`, regardless of how the caller built it; every
/// other property of `verify` passes through unchanged. The override is
/// the point of the combinator: verification retry is tuned here, not at
/// step construction time. Named `output_name` when given, otherwise
/// `"<main>-verified"`. Non-dispatchable.
pub fn with_verification(
    main: &Step,
    verify: &Step,
    verify_max_attempts: u32,
    output_name: Option<&str>,
) -> Workflow {
    let name = output_name
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-verified", main.name));

    let steps = vec![main.clone(), verify.with_max_attempts(verify_max_attempts)];
    Workflow::new(name, steps).with_dispatchable(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> Step {
        Step::builder(name).function("noop").build()
    }

    fn workflow(name: &str, step_names: &[&str]) -> Workflow {
        Workflow::new(name, step_names.iter().map(|n| step(n)).collect())
    }

    fn step_names(w: &Workflow) -> Vec<&str> {
        w.steps.iter().map(|s| s.name.as_str()).collect()
    }

    // -- sequence ------------------------------------------------------------

    #[test]
    fn sequence_concatenates_in_order() {
        let a = workflow("a", &["a1", "a2"]);
        let b = workflow("b", &["b1"]);

        let combined = sequence(&a, &b);
        assert_eq!(step_names(&combined), vec!["a1", "a2", "b1"]);
        assert!(!combined.dispatchable);
    }

    #[test]
    fn sequence_is_associative_over_steps() {
        let a = workflow("a", &["a1"]);
        let b = workflow("b", &["b1", "b2"]);
        let c = workflow("c", &["c1"]);

        let left = sequence(&sequence(&a, &b), &c);
        let right = sequence(&a, &sequence(&b, &c));
        assert_eq!(left.steps, right.steps);
    }

    #[test]
    fn sequence_leaves_sources_untouched() {
        let a = workflow("a", &["a1"]);
        let b = workflow("b", &["b1"]);
        let a_before = a.clone();

        let _ = sequence(&a, &b);
        assert_eq!(a, a_before);
    }

    #[test]
    fn sequence_preserves_step_properties() {
        let a = Workflow::new(
            "a",
            vec![
                Step::builder("retrying")
                    .function("f")
                    .max_attempts(4)
                    .retry_delay_secs(0.5)
                    .output("x")
                    .build(),
            ],
        );
        let b = Workflow::new(
            "b",
            vec![Step::builder("cleanup").function("g").always_run().build()],
        );

        let combined = sequence(&a, &b);
        assert_eq!(combined.steps[0], a.steps[0]);
        assert_eq!(combined.steps[1], b.steps[0]);
    }

    // -- with_verification ---------------------------------------------------

    #[test]
    fn with_verification_overrides_only_max_attempts() {
        let main = step("implement");
        let verify = Step::builder("verify")
            .function("run_tests")
            .max_attempts(7)
            .retry_delay_secs(1.5)
            .always_run()
            .output("verify_result")
            .condition("inputs.run_checks")
            .build();

        let wf = with_verification(&main, &verify, 2, None);
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0], main);

        let expected = verify.with_max_attempts(2);
        assert_eq!(wf.steps[1], expected);
        assert_eq!(wf.steps[1].max_attempts, 2);
        // Everything else passed through.
        assert!(wf.steps[1].always_run);
        assert_eq!(wf.steps[1].retry_delay_secs, 1.5);
        assert_eq!(wf.steps[1].output.as_deref(), Some("verify_result"));
    }

    #[test]
    fn with_verification_default_name_derives_from_main() {
        let wf = with_verification(&step("implement"), &step("verify"), 1, None);
        assert_eq!(wf.name, "implement-verified");
        assert!(!wf.dispatchable);
    }

    #[test]
    fn with_verification_explicit_name_wins() {
        let wf = with_verification(&step("implement"), &step("verify"), 1, Some("impl-check"));
        assert_eq!(wf.name, "impl-check");
    }
}
