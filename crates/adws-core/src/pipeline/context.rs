//! Immutable execution context threaded through a pipeline run.
//!
//! `WorkflowContext` is a value, not a mutable bag: every transformation
//! returns a new context and leaves the original untouched. Step functions
//! receive a context and hand back a derived one, so a failed or retried
//! step can never leave half-written state behind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// FeedbackEntry
// ---------------------------------------------------------------------------

/// A single append-only feedback note (review findings, verification output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Name of the step that recorded the note.
    pub source: String,
    /// Free-form message body.
    pub message: String,
}

impl FeedbackEntry {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowContext
// ---------------------------------------------------------------------------

/// Immutable state snapshot that flows through a workflow run.
///
/// Holds the input view visible to the next step, the accumulated outputs
/// of completed steps, and an append-only feedback log. Fields are private;
/// all mutation goes through copy-on-write builders (`with_input`,
/// `with_output`, `promote_outputs`, `with_feedback`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    feedback: Vec<FeedbackEntry>,
    workflow_name: String,
    run_id: Uuid,
}

impl WorkflowContext {
    /// Create an empty context for a run.
    pub fn new(workflow_name: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            inputs: Map::new(),
            outputs: Map::new(),
            feedback: Vec::new(),
            workflow_name: workflow_name.into(),
            run_id,
        }
    }

    /// Create a context seeded with initial inputs (CLI arguments, issue ID).
    pub fn with_initial_inputs(
        workflow_name: impl Into<String>,
        run_id: Uuid,
        inputs: Map<String, Value>,
    ) -> Self {
        Self {
            inputs,
            outputs: Map::new(),
            feedback: Vec::new(),
            workflow_name: workflow_name.into(),
            run_id,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn input(&self, key: &str) -> Option<&Value> {
        self.inputs.get(key)
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }

    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    pub fn feedback(&self) -> &[FeedbackEntry] {
        &self.feedback
    }

    /// Fetch an input and require it to be a string.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }

    // -- copy-on-write transformations --------------------------------------

    /// New context with one extra (or replaced) input key.
    pub fn with_input(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.inputs.insert(key.into(), value);
        next
    }

    /// New context with all given pairs merged into the inputs.
    pub fn with_inputs<I>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut next = self.clone();
        next.inputs.extend(pairs);
        next
    }

    /// New context with one extra (or replaced) output key.
    pub fn with_output(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.outputs.insert(key.into(), value);
        next
    }

    /// New context with all given pairs merged into the outputs.
    pub fn with_outputs<I>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut next = self.clone();
        next.outputs.extend(pairs);
        next
    }

    /// New context with a feedback note appended.
    pub fn with_feedback(&self, entry: FeedbackEntry) -> Self {
        let mut next = self.clone();
        next.feedback.push(entry);
        next
    }

    /// New context with every output key copied into the input view.
    ///
    /// Applied at step boundaries so a completed step's outputs become
    /// visible as plain inputs to later steps. Outputs are kept as well;
    /// on key overlap the output value wins.
    pub fn promote_outputs(&self) -> Self {
        let mut next = self.clone();
        for (key, value) in &self.outputs {
            next.inputs.insert(key.clone(), value.clone());
        }
        next
    }

    /// Flatten the context into the JSON scope that condition expressions
    /// evaluate against: `{inputs, outputs, feedback, workflow}`.
    pub fn to_expression_scope(&self) -> Value {
        json!({
            "inputs": Value::Object(self.inputs.clone()),
            "outputs": Value::Object(self.outputs.clone()),
            "feedback": self.feedback,
            "workflow": {
                "name": self.workflow_name,
                "run_id": self.run_id.to_string(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> WorkflowContext {
        WorkflowContext::new("test-flow", Uuid::now_v7())
    }

    // -- immutability --------------------------------------------------------

    #[test]
    fn with_input_leaves_original_untouched() {
        let base = ctx();
        let derived = base.with_input("issue_id", json!("bd-42"));

        assert!(base.input("issue_id").is_none());
        assert_eq!(derived.input_str("issue_id"), Some("bd-42"));
    }

    #[test]
    fn with_output_leaves_original_untouched() {
        let base = ctx();
        let derived = base.with_output("plan", json!({"steps": 3}));

        assert!(base.output("plan").is_none());
        assert_eq!(derived.output("plan"), Some(&json!({"steps": 3})));
    }

    #[test]
    fn with_feedback_appends_in_order() {
        let base = ctx()
            .with_feedback(FeedbackEntry::new("review", "first"))
            .with_feedback(FeedbackEntry::new("verify", "second"));

        let messages: Vec<&str> =
            base.feedback().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    // -- promotion -----------------------------------------------------------

    #[test]
    fn promote_outputs_copies_into_inputs() {
        let base = ctx()
            .with_input("kept", json!(1))
            .with_output("produced", json!("x"));
        let promoted = base.promote_outputs();

        assert_eq!(promoted.input("kept"), Some(&json!(1)));
        assert_eq!(promoted.input("produced"), Some(&json!("x")));
        // Outputs stay available too.
        assert_eq!(promoted.output("produced"), Some(&json!("x")));
        // Original context is unchanged.
        assert!(base.input("produced").is_none());
    }

    #[test]
    fn promote_outputs_prefers_output_on_overlap() {
        let base = ctx()
            .with_input("result", json!("stale"))
            .with_output("result", json!("fresh"));

        assert_eq!(base.promote_outputs().input("result"), Some(&json!("fresh")));
    }

    // -- expression scope ----------------------------------------------------

    #[test]
    fn expression_scope_exposes_all_sections() {
        let run_id = Uuid::now_v7();
        let base = WorkflowContext::new("plan", run_id)
            .with_input("issue_id", json!("bd-7"))
            .with_output("plan", json!("ok"))
            .with_feedback(FeedbackEntry::new("verify", "tests passed"));

        let scope = base.to_expression_scope();
        assert_eq!(scope["inputs"]["issue_id"], json!("bd-7"));
        assert_eq!(scope["outputs"]["plan"], json!("ok"));
        assert_eq!(scope["feedback"][0]["source"], json!("verify"));
        assert_eq!(scope["workflow"]["name"], json!("plan"));
        assert_eq!(scope["workflow"]["run_id"], json!(run_id.to_string()));
    }
}
