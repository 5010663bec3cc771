//! BMAD story file types.
//!
//! A story file is YAML frontmatter delimited by `---` followed by a markdown
//! body with `## Acceptance Criteria` and `## Tasks` sections. The parsing
//! itself lives in `adws-infra`; these are the deserialization targets.

use serde::{Deserialize, Serialize};

/// Workflow status of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryStatus {
    Draft,
    Approved,
    InProgress,
    Review,
    Done,
}

impl Default for StoryStatus {
    fn default() -> Self {
        StoryStatus::Draft
    }
}

/// YAML frontmatter of a story file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryManifest {
    /// Story identifier (e.g. "1.3" or "auth-login").
    pub id: String,
    /// One-line story title.
    pub title: String,
    /// Parent epic, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
    /// Current workflow status.
    #[serde(default)]
    pub status: StoryStatus,
}

/// One checklist item from the story's `## Tasks` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryTask {
    /// Task text.
    pub description: String,
    /// Whether the checkbox was ticked (`[x]`).
    pub done: bool,
}

/// A fully parsed story file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Parsed frontmatter.
    pub manifest: StoryManifest,
    /// Markdown body (everything after the frontmatter).
    pub body: String,
    /// Items from the `## Acceptance Criteria` section.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Items from the `## Tasks` section.
    #[serde(default)]
    pub tasks: Vec<StoryTask>,
}
