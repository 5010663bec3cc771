//! Workflow definition parsing, validation, and filesystem operations.
//!
//! Converts between YAML files and the canonical `Workflow` value,
//! validates structural constraints (name format, unique step names,
//! sane retry settings), and provides discovery for workflow files on
//! disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use adws_types::workflow::{Step, Workflow};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or validating workflow definitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML string into a validated `Workflow`.
///
/// Runs `validate_workflow` after deserialization, so the returned value
/// is guaranteed to be structurally valid.
pub fn parse_workflow_yaml(yaml: &str) -> Result<Workflow, WorkflowError> {
    let workflow: Workflow =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Serialize a `Workflow` to a YAML string.
pub fn serialize_workflow_yaml(workflow: &Workflow) -> Result<String, WorkflowError> {
    serde_yaml_ng::to_string(workflow).map_err(|e| WorkflowError::ParseError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `Workflow`.
///
/// Checks:
/// - Name is non-empty and contains only alphanumeric characters and hyphens
/// - At least one step exists
/// - All step names are unique
/// - Every step declares a function or a shell command (not both)
/// - `max_attempts` >= 1
/// - `retry_delay_secs` is finite and non-negative
/// - `input_from` local keys are unique within a step
pub fn validate_workflow(workflow: &Workflow) -> Result<(), WorkflowError> {
    if workflow.name.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow name must not be empty".to_string(),
        ));
    }
    if !workflow.name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(WorkflowError::ValidationError(format!(
            "workflow name '{}' contains invalid characters (only alphanumeric and hyphens allowed)",
            workflow.name
        )));
    }

    if workflow.steps.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow must have at least one step".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    for step in &workflow.steps {
        if !seen_names.insert(step.name.as_str()) {
            return Err(WorkflowError::ValidationError(format!(
                "duplicate step name: '{}'",
                step.name
            )));
        }
        validate_step(step)?;
    }

    Ok(())
}

fn validate_step(step: &Step) -> Result<(), WorkflowError> {
    if step.name.is_empty() {
        return Err(WorkflowError::ValidationError(
            "step name must not be empty".to_string(),
        ));
    }

    match (step.shell, &step.function, &step.command) {
        (true, _, None) => {
            return Err(WorkflowError::ValidationError(format!(
                "shell step '{}' has no command",
                step.name
            )));
        }
        (true, Some(_), _) => {
            return Err(WorkflowError::ValidationError(format!(
                "shell step '{}' must not also declare a function",
                step.name
            )));
        }
        (false, None, _) => {
            return Err(WorkflowError::ValidationError(format!(
                "step '{}' declares neither a function nor a shell command",
                step.name
            )));
        }
        _ => {}
    }

    if step.max_attempts < 1 {
        return Err(WorkflowError::ValidationError(format!(
            "step '{}': max_attempts must be >= 1",
            step.name
        )));
    }

    if !step.retry_delay_secs.is_finite() || step.retry_delay_secs < 0.0 {
        return Err(WorkflowError::ValidationError(format!(
            "step '{}': retry_delay_secs must be finite and non-negative",
            step.name
        )));
    }

    if let Some(wiring) = &step.input_from {
        let mut locals = HashSet::new();
        for local_key in wiring.values() {
            if !locals.insert(local_key.as_str()) {
                return Err(WorkflowError::ValidationError(format!(
                    "step '{}': input_from targets local key '{}' more than once",
                    step.name, local_key
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load a workflow from a YAML file.
pub fn load_workflow_file(path: &Path) -> Result<Workflow, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_yaml(&content)
}

/// Save a workflow to a YAML file.
///
/// Creates parent directories if they don't exist.
pub fn save_workflow_file(path: &Path, workflow: &Workflow) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serialize_workflow_yaml(workflow)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Discover all workflow YAML files under `base_dir`.
///
/// Scans for `.yaml` and `.yml` files recursively. Files that fail to
/// parse or validate are logged and skipped, not returned as errors.
pub fn discover_workflows(base_dir: &Path) -> Result<Vec<(PathBuf, Workflow)>, WorkflowError> {
    let mut results = Vec::new();
    if !base_dir.exists() {
        return Ok(results);
    }
    discover_recursive(base_dir, &mut results)?;
    Ok(results)
}

fn discover_recursive(
    dir: &Path,
    results: &mut Vec<(PathBuf, Workflow)>,
) -> Result<(), WorkflowError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            discover_recursive(&path, results)?;
        } else if let Some(ext) = path.extension() {
            if ext == "yaml" || ext == "yml" {
                match load_workflow_file(&path) {
                    Ok(workflow) => results.push((path, workflow)),
                    Err(_) => {
                        tracing::warn!(?path, "skipping unparseable workflow file");
                    }
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use adws_types::workflow::Step;

    const VALID_YAML: &str = r#"
name: triage
description: Triage an incoming issue
dispatchable: true
steps:
  - name: fetch-issue
    function: bead_show
    output: issue
  - name: classify
    function: agent_prompt
    input_from:
      issue: issue
    max_attempts: 2
    retry_delay_secs: 1.5
  - name: record
    function: bead_update_notes
    always_run: true
"#;

    fn valid_workflow() -> Workflow {
        parse_workflow_yaml(VALID_YAML).unwrap()
    }

    // -- parsing -------------------------------------------------------------

    #[test]
    fn parse_valid_yaml() {
        let workflow = valid_workflow();
        assert_eq!(workflow.name, "triage");
        assert_eq!(workflow.steps.len(), 3);
        assert!(workflow.dispatchable);
        assert_eq!(workflow.steps[1].max_attempts, 2);
        assert!(workflow.steps[2].always_run);
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        let err = parse_workflow_yaml("name: [unclosed").unwrap_err();
        assert!(matches!(err, WorkflowError::ParseError(_)));
    }

    #[test]
    fn yaml_roundtrip_preserves_workflow() {
        let workflow = valid_workflow();
        let yaml = serialize_workflow_yaml(&workflow).unwrap();
        let reparsed = parse_workflow_yaml(&yaml).unwrap();
        assert_eq!(workflow, reparsed);
    }

    // -- validation ----------------------------------------------------------

    fn single_step_workflow(step: Step) -> Workflow {
        Workflow::new("single", vec![step])
    }

    #[test]
    fn rejects_empty_name() {
        let wf = Workflow::new("", vec![Step::builder("s").function("f").build()]);
        assert!(matches!(
            validate_workflow(&wf),
            Err(WorkflowError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_invalid_name_characters() {
        let wf = Workflow::new("has space", vec![Step::builder("s").function("f").build()]);
        assert!(validate_workflow(&wf).is_err());
    }

    #[test]
    fn rejects_empty_steps() {
        let wf = Workflow::new("empty", vec![]);
        assert!(validate_workflow(&wf).is_err());
    }

    #[test]
    fn rejects_duplicate_step_names() {
        let wf = Workflow::new(
            "dupes",
            vec![
                Step::builder("same").function("f").build(),
                Step::builder("same").function("g").build(),
            ],
        );
        let err = validate_workflow(&wf).unwrap_err();
        assert!(err.to_string().contains("duplicate step name"));
    }

    #[test]
    fn rejects_step_without_function_or_command() {
        let step: Step = serde_yaml_ng::from_str("name: bare").unwrap();
        assert!(validate_workflow(&single_step_workflow(step)).is_err());
    }

    #[test]
    fn rejects_shell_step_with_function() {
        let step: Step = serde_yaml_ng::from_str(
            "name: both\nshell: true\ncommand: ls\nfunction: run_lints",
        )
        .unwrap();
        assert!(validate_workflow(&single_step_workflow(step)).is_err());
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let step: Step =
            serde_yaml_ng::from_str("name: s\nfunction: f\nmax_attempts: 0").unwrap();
        assert!(validate_workflow(&single_step_workflow(step)).is_err());
    }

    #[test]
    fn rejects_negative_retry_delay() {
        let step: Step =
            serde_yaml_ng::from_str("name: s\nfunction: f\nretry_delay_secs: -1.0").unwrap();
        assert!(validate_workflow(&single_step_workflow(step)).is_err());
    }

    #[test]
    fn rejects_duplicate_input_from_local_keys() {
        let step: Step = serde_yaml_ng::from_str(
            "name: s\nfunction: f\ninput_from:\n  a: same\n  b: same",
        )
        .unwrap();
        let err = validate_workflow(&single_step_workflow(step)).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    // -- filesystem ----------------------------------------------------------

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("triage.yaml");
        let workflow = valid_workflow();

        save_workflow_file(&path, &workflow).unwrap();
        let loaded = load_workflow_file(&path).unwrap();
        assert_eq!(workflow, loaded);
    }

    #[test]
    fn discover_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.yaml"), VALID_YAML).unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "steps: {broken").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

        let found = discover_workflows(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.name, "triage");
    }

    #[test]
    fn discover_missing_dir_is_empty() {
        let found = discover_workflows(Path::new("/nonexistent/adws-workflows")).unwrap();
        assert!(found.is_empty());
    }
}
