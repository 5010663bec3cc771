//! Run audit records.
//!
//! A `RunRecord` captures one execution of a workflow; `StepLogEntry` captures
//! one attempt-set of a step within that run. Both serialize to JSON for the
//! filesystem run log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status of an individual step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
    Skipped,
}

/// A single execution instance of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// UUIDv7 run ID (time-sortable).
    pub id: Uuid,
    /// Name of the executed workflow.
    pub workflow_name: String,
    /// Current run status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished (None while running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// The primary (root-cause) failure, if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,
    /// Final context snapshot (inputs/outputs/feedback) as JSON.
    pub context: serde_json::Value,
}

impl RunRecord {
    /// Create a fresh running record for a workflow.
    pub fn started(workflow_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_name: workflow_name.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            context: serde_json::json!({}),
        }
    }
}

/// Execution log for one step within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// Parent run ID.
    pub run_id: Uuid,
    /// Step name matching `Step.name`.
    pub step_name: String,
    /// Terminal step status.
    pub status: StepStatus,
    /// Number of attempts consumed (0 for skipped steps).
    pub attempts: u32,
    /// Error message if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}
