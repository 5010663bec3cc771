//! Issue-tracker record types.
//!
//! Mirrors the JSON shape emitted by the Beads (`bd`) CLI. Fields default
//! liberally since `bd` output varies across versions; the client only
//! depends on `id`, `title`, and `status`.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
}

impl Default for IssueStatus {
    fn default() -> Self {
        IssueStatus::Open
    }
}

/// A tracked issue as reported by `bd show --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker-assigned ID (e.g. "bd-42").
    pub id: String,
    /// One-line title.
    pub title: String,
    /// Current status.
    #[serde(default)]
    pub status: IssueStatus,
    /// Issue type tag (e.g. "bug", "feature", "task").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    /// Priority, 0 (highest) through 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Longer description body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accumulated working notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Label strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}
