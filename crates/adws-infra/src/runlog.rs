//! Filesystem run logs.
//!
//! Each run writes two artifacts under `{data_dir}/runs/`:
//! `{run_id}.json` holds the `RunRecord` snapshot (rewritten as the run
//! progresses), and `{run_id}.steps.jsonl` accumulates one
//! `StepLogEntry` per line. UUIDv7 run IDs keep directory listings in
//! start order.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use adws_types::run::{RunRecord, StepLogEntry};

#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    #[error("run log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run log serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("run {0} not found")]
    NotFound(Uuid),
}

/// Store for run records and per-step log lines.
#[derive(Debug, Clone)]
pub struct RunLogStore {
    runs_dir: PathBuf,
}

impl RunLogStore {
    /// Store rooted at `{data_dir}/runs`. The directory is created on
    /// first write, not here.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            runs_dir: data_dir.join("runs"),
        }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Write (or rewrite) a run's record snapshot.
    pub fn save_record(&self, record: &RunRecord) -> Result<(), RunLogError> {
        std::fs::create_dir_all(&self.runs_dir)?;
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(self.record_path(record.id), json)?;
        Ok(())
    }

    /// Append one step entry to the run's JSONL log.
    pub fn append_step(&self, entry: &StepLogEntry) -> Result<(), RunLogError> {
        std::fs::create_dir_all(&self.runs_dir)?;
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.steps_path(entry.run_id))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Load one run record by ID.
    pub fn load_record(&self, run_id: Uuid) -> Result<RunRecord, RunLogError> {
        let path = self.record_path(run_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunLogError::NotFound(run_id));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Load a run's step entries, in append order. Missing file means
    /// the run never reached a step, not an error.
    pub fn load_steps(&self, run_id: Uuid) -> Result<Vec<StepLogEntry>, RunLogError> {
        let path = self.steps_path(run_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }

    /// All stored run records, newest first.
    pub fn list_records(&self) -> Result<Vec<RunRecord>, RunLogError> {
        if !self.runs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.runs_dir)? {
            let path = entry?.path();
            // Step logs end in .jsonl and are excluded by extension.
            if path.extension().is_some_and(|ext| ext == "json") {
                match std::fs::read_to_string(&path)
                    .map_err(RunLogError::from)
                    .and_then(|c| serde_json::from_str::<RunRecord>(&c).map_err(Into::into))
                {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        tracing::warn!(?path, %err, "skipping unreadable run record");
                    }
                }
            }
        }

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    fn record_path(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir.join(format!("{run_id}.json"))
    }

    fn steps_path(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir.join(format!("{run_id}.steps.jsonl"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use adws_types::run::{RunStatus, StepStatus};
    use chrono::Utc;

    fn store() -> (tempfile::TempDir, RunLogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RunLogStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn save_and_load_record() {
        let (_dir, store) = store();
        let mut record = RunRecord::started("plan");
        store.save_record(&record).unwrap();

        record.status = RunStatus::Completed;
        record.completed_at = Some(Utc::now());
        store.save_record(&record).unwrap();

        let loaded = store.load_record(record.id).unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.workflow_name, "plan");
    }

    #[test]
    fn load_missing_record_is_not_found() {
        let (_dir, store) = store();
        let err = store.load_record(Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, RunLogError::NotFound(_)));
    }

    #[test]
    fn append_and_load_steps_in_order() {
        let (_dir, store) = store();
        let run_id = Uuid::now_v7();

        for (name, status) in [
            ("fetch-issue", StepStatus::Completed),
            ("draft-plan", StepStatus::Failed),
        ] {
            store
                .append_step(&StepLogEntry {
                    run_id,
                    step_name: name.to_string(),
                    status,
                    attempts: 1,
                    error: None,
                    duration_ms: 5,
                    recorded_at: Utc::now(),
                })
                .unwrap();
        }

        let steps = store.load_steps(run_id).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_name, "fetch-issue");
        assert_eq!(steps[1].status, StepStatus::Failed);
    }

    #[test]
    fn load_steps_for_unknown_run_is_empty() {
        let (_dir, store) = store();
        assert!(store.load_steps(Uuid::now_v7()).unwrap().is_empty());
    }

    #[test]
    fn list_records_newest_first() {
        let (_dir, store) = store();
        let first = RunRecord::started("plan");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = RunRecord::started("review");
        store.save_record(&first).unwrap();
        store.save_record(&second).unwrap();

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].workflow_name, "review");
        assert_eq!(records[1].workflow_name, "plan");
    }
}
