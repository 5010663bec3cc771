//! JEXL expression evaluator for step `condition` clauses.
//!
//! Wraps `jexl_eval::Evaluator` with a small set of pre-registered
//! transforms. Context data is always passed as a JSON scope object,
//! never interpolated into the expression string.

use serde_json::{Value, json};

use super::context::WorkflowContext;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during condition evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression evaluation failed: {0}")]
    EvalFailed(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),
}

// ---------------------------------------------------------------------------
// ConditionEvaluator
// ---------------------------------------------------------------------------

/// JEXL evaluator with standard transforms registered.
///
/// Conditions see the scope produced by
/// [`WorkflowContext::to_expression_scope`], e.g.
/// `inputs.issue_id|length > 0` or `outputs.lint_result.passed`.
pub struct ConditionEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        let evaluator = jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.trim()))
            })
            .with_transform("contains", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let search = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.contains(search)))
            })
            .with_transform("startsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let prefix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.starts_with(prefix)))
            })
            .with_transform("endsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let suffix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.ends_with(suffix)))
            })
            .with_transform("not", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                Ok(json!(!Self::value_to_bool(&val)))
            })
            .with_transform("length", |args: &[Value]| {
                let len = match args.first() {
                    Some(Value::String(s)) => s.len(),
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            });

        Self { evaluator }
    }

    /// Evaluate an expression to a boolean against an arbitrary JSON scope.
    ///
    /// Results are coerced to boolean with JavaScript-like truthiness.
    pub fn evaluate_bool(
        &self,
        expression: &str,
        scope: &Value,
    ) -> Result<bool, ExpressionError> {
        if !scope.is_object() {
            return Err(ExpressionError::InvalidScope(
                "scope must be a JSON object".to_string(),
            ));
        }

        let result = self
            .evaluator
            .eval_in_context(expression, scope)
            .map_err(|e| ExpressionError::EvalFailed(e.to_string()))?;

        Ok(Self::value_to_bool(&result))
    }

    /// Evaluate an expression against a workflow context.
    pub fn evaluate_condition(
        &self,
        expression: &str,
        ctx: &WorkflowContext,
    ) -> Result<bool, ExpressionError> {
        self.evaluate_bool(expression, &ctx.to_expression_scope())
    }

    fn value_to_bool(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn evaluator() -> ConditionEvaluator {
        ConditionEvaluator::new()
    }

    // -------------------------------------------------------------------
    // Scope access
    // -------------------------------------------------------------------

    #[test]
    fn input_comparison() {
        let scope = json!({ "inputs": { "issue_id": "bd-42" } });
        assert!(evaluator()
            .evaluate_bool("inputs.issue_id == 'bd-42'", &scope)
            .unwrap());
    }

    #[test]
    fn nested_output_access() {
        let scope = json!({ "outputs": { "lint_result": { "passed": true } } });
        assert!(evaluator()
            .evaluate_bool("outputs.lint_result.passed", &scope)
            .unwrap());
    }

    #[test]
    fn missing_key_is_falsy_not_error() {
        let scope = json!({ "inputs": {} });
        assert!(!evaluator().evaluate_bool("inputs.nothing", &scope).unwrap());
    }

    #[test]
    fn scope_must_be_object() {
        assert!(evaluator().evaluate_bool("true", &json!("flat")).is_err());
    }

    #[test]
    fn syntax_error_surfaces_as_eval_failed() {
        let scope = json!({ "inputs": {} });
        let err = evaluator().evaluate_bool("inputs.(", &scope).unwrap_err();
        assert!(matches!(err, ExpressionError::EvalFailed(_)));
    }

    // -------------------------------------------------------------------
    // Transforms
    // -------------------------------------------------------------------

    #[test]
    fn transform_chain_trim_lower() {
        let scope = json!({ "inputs": { "branch": "  MAIN  " } });
        assert!(evaluator()
            .evaluate_bool("inputs.branch|trim|lower == 'main'", &scope)
            .unwrap());
    }

    #[test]
    fn transform_contains() {
        let scope = json!({ "inputs": { "title": "fix login timeout" } });
        let eval = evaluator();
        assert!(eval
            .evaluate_bool("inputs.title|contains('timeout')", &scope)
            .unwrap());
        assert!(!eval
            .evaluate_bool("inputs.title|contains('signup')", &scope)
            .unwrap());
    }

    #[test]
    fn transform_starts_and_ends_with() {
        let scope = json!({ "inputs": { "path": "stories/auth.md" } });
        let eval = evaluator();
        assert!(eval
            .evaluate_bool("inputs.path|startsWith('stories/')", &scope)
            .unwrap());
        assert!(eval
            .evaluate_bool("inputs.path|endsWith('.md')", &scope)
            .unwrap());
    }

    #[test]
    fn transform_length_on_feedback() {
        let scope = json!({ "feedback": [{ "source": "verify", "message": "ok" }] });
        assert!(evaluator()
            .evaluate_bool("feedback|length > 0", &scope)
            .unwrap());
    }

    #[test]
    fn transform_not() {
        let scope = json!({ "inputs": { "skip_review": false } });
        assert!(evaluator()
            .evaluate_bool("(inputs.skip_review)|not", &scope)
            .unwrap());
    }

    // -------------------------------------------------------------------
    // Truthiness coercion
    // -------------------------------------------------------------------

    #[test]
    fn truthiness_rules() {
        let eval = evaluator();
        let scope = json!({
            "inputs": { "empty": "", "name": "x", "zero": 0.0, "n": 2.0 }
        });
        assert!(!eval.evaluate_bool("inputs.empty", &scope).unwrap());
        assert!(eval.evaluate_bool("inputs.name", &scope).unwrap());
        assert!(!eval.evaluate_bool("inputs.zero", &scope).unwrap());
        assert!(eval.evaluate_bool("inputs.n", &scope).unwrap());
    }

    // -------------------------------------------------------------------
    // WorkflowContext integration
    // -------------------------------------------------------------------

    #[test]
    fn evaluate_condition_sees_context_scope() {
        let ctx = WorkflowContext::new("review", Uuid::now_v7())
            .with_input("issue_id", json!("bd-9"))
            .with_output("plan", json!("done"));
        let eval = evaluator();

        assert!(eval
            .evaluate_condition("inputs.issue_id == 'bd-9'", &ctx)
            .unwrap());
        assert!(eval
            .evaluate_condition("outputs.plan == 'done'", &ctx)
            .unwrap());
        assert!(eval
            .evaluate_condition("workflow.name == 'review'", &ctx)
            .unwrap());
    }
}
