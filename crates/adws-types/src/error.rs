//! Pipeline error values.
//!
//! Failures in ADWS are values, not panics: step handlers and the executor
//! return `PipelineError` through `Result`, and the workflow executor
//! propagates the first (root-cause) failure to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Flat error taxonomy carried by every [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The step's `function` name is not present in the step registry.
    UnresolvedFunction,
    /// The step handler returned an error or panicked.
    ExecutionFailed,
    /// The step's `condition` expression failed to evaluate.
    ConditionEvaluation,
    /// `input_from` referenced a source key that was never published.
    MissingDataFlowSource,
    /// `input_from` would silently overwrite an existing input key.
    DataFlowCollision,
    /// A handler required an input key that is absent from the context.
    MissingInput,
    /// A step or configuration value is structurally invalid.
    InvalidConfiguration,
    /// An external command exited with a non-zero status.
    CommandNonZeroExit,
    /// An external command produced output that could not be parsed.
    CommandOutputUnparseable,
}

impl ErrorKind {
    /// The snake_case tag for this kind, matching its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnresolvedFunction => "unresolved_function",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::ConditionEvaluation => "condition_evaluation",
            ErrorKind::MissingDataFlowSource => "missing_data_flow_source",
            ErrorKind::DataFlowCollision => "data_flow_collision",
            ErrorKind::MissingInput => "missing_input",
            ErrorKind::InvalidConfiguration => "invalid_configuration",
            ErrorKind::CommandNonZeroExit => "command_non_zero_exit",
            ErrorKind::CommandOutputUnparseable => "command_output_unparseable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// A step-level failure, returned as a value and never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("step '{step_name}' failed ({kind}): {message}")]
pub struct PipelineError {
    /// Name of the step that failed.
    pub step_name: String,
    /// Error taxonomy tag.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Auxiliary key/value diagnostics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl PipelineError {
    /// Create an error for a step.
    pub fn new(
        step_name: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// A copy of this error with one more context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
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
    fn test_display_includes_step_kind_and_message() {
        let err = PipelineError::new("lint", ErrorKind::CommandNonZeroExit, "exit status 1");
        let msg = err.to_string();
        assert!(msg.contains("lint"), "got: {msg}");
        assert!(msg.contains("command_non_zero_exit"), "got: {msg}");
        assert!(msg.contains("exit status 1"), "got: {msg}");
    }

    #[test]
    fn test_kind_serde_tags_are_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MissingDataFlowSource).unwrap();
        assert_eq!(json, "\"missing_data_flow_source\"");
        let parsed: ErrorKind = serde_json::from_str("\"data_flow_collision\"").unwrap();
        assert_eq!(parsed, ErrorKind::DataFlowCollision);
    }

    #[test]
    fn test_kind_as_str_matches_serde() {
        for kind in [
            ErrorKind::UnresolvedFunction,
            ErrorKind::ExecutionFailed,
            ErrorKind::ConditionEvaluation,
            ErrorKind::MissingDataFlowSource,
            ErrorKind::DataFlowCollision,
            ErrorKind::MissingInput,
            ErrorKind::InvalidConfiguration,
            ErrorKind::CommandNonZeroExit,
            ErrorKind::CommandOutputUnparseable,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_with_context_accumulates() {
        let err = PipelineError::new("cleanup", ErrorKind::ExecutionFailed, "boom")
            .with_context("always_run_failure.report", "report step also failed")
            .with_context("attempt", "2");
        assert_eq!(err.context.len(), 2);
        assert_eq!(err.context["attempt"], "2");

        let json = serde_json::to_string(&err).unwrap();
        let parsed: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }
}
