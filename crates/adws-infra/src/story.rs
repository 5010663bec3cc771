//! Story file loading and parsing.
//!
//! Stories are markdown files with YAML frontmatter followed by a free
//! body. Two sections get structured extraction: `## Acceptance
//! Criteria` (bullet list) and `## Tasks` (checkbox list). Everything
//! else stays in the body verbatim.

use std::path::Path;

use adws_types::story::{Story, StoryManifest, StoryTask};

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("I/O error reading story: {0}")]
    Io(#[from] std::io::Error),

    #[error("story has no YAML frontmatter (expected leading '---' block)")]
    MissingFrontmatter,

    #[error("invalid story frontmatter: {0}")]
    InvalidFrontmatter(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and parse a story file from disk.
pub fn load_story_file(path: &Path) -> Result<Story, StoryError> {
    let content = std::fs::read_to_string(path)?;
    parse_story(&content)
}

/// Parse story content: frontmatter, body, and the structured sections.
pub fn parse_story(content: &str) -> Result<Story, StoryError> {
    let (frontmatter, body) = split_frontmatter(content)?;
    let manifest: StoryManifest = serde_yaml_ng::from_str(frontmatter)
        .map_err(|e| StoryError::InvalidFrontmatter(e.to_string()))?;

    Ok(Story {
        manifest,
        acceptance_criteria: extract_bullets(body, "## Acceptance Criteria"),
        tasks: extract_tasks(body, "## Tasks"),
        body: body.trim().to_string(),
    })
}

/// Split a document into its `---`-delimited YAML frontmatter and body.
fn split_frontmatter(content: &str) -> Result<(&str, &str), StoryError> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
        .ok_or(StoryError::MissingFrontmatter)?;

    let end = rest.find("\n---").ok_or(StoryError::MissingFrontmatter)?;
    let frontmatter = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['-']).trim_start_matches(['\r', '\n']);
    Ok((frontmatter, body))
}

// ---------------------------------------------------------------------------
// Section extraction
// ---------------------------------------------------------------------------

/// Lines of the section starting at `heading`, up to the next `##`.
fn section_lines<'a>(body: &'a str, heading: &str) -> Vec<&'a str> {
    let mut lines = Vec::new();
    let mut in_section = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(heading) {
            in_section = true;
            continue;
        }
        if in_section && trimmed.starts_with("##") {
            break;
        }
        if in_section {
            lines.push(trimmed);
        }
    }
    lines
}

fn extract_bullets(body: &str, heading: &str) -> Vec<String> {
    section_lines(body, heading)
        .into_iter()
        .filter_map(|line| {
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .map(|item| item.trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}

fn extract_tasks(body: &str, heading: &str) -> Vec<StoryTask> {
    section_lines(body, heading)
        .into_iter()
        .filter_map(|line| {
            let item = line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))?;
            let (done, rest) = if let Some(rest) = item.strip_prefix("[x]") {
                (true, rest)
            } else if let Some(rest) = item.strip_prefix("[X]") {
                (true, rest)
            } else if let Some(rest) = item.strip_prefix("[ ]") {
                (false, rest)
            } else {
                return None;
            };
            let description = rest.trim().to_string();
            if description.is_empty() {
                return None;
            }
            Some(StoryTask { description, done })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use adws_types::story::StoryStatus;

    const STORY: &str = r#"---
id: story-auth-01
title: Session timeout handling
epic: auth
status: in-progress
---

Users are logged out silently when the session expires.

## Acceptance Criteria

- Expired sessions redirect to the login page
- A banner explains why the user was logged out
* Re-login returns to the original page

## Tasks

- [x] Add session expiry detection
- [ ] Implement redirect with return URL
- [ ] Add the explanation banner

## Notes

Out of scope: remember-me.
"#;

    #[test]
    fn parses_frontmatter_and_sections() {
        let story = parse_story(STORY).unwrap();

        assert_eq!(story.manifest.id, "story-auth-01");
        assert_eq!(story.manifest.title, "Session timeout handling");
        assert_eq!(story.manifest.epic.as_deref(), Some("auth"));
        assert_eq!(story.manifest.status, StoryStatus::InProgress);

        assert_eq!(story.acceptance_criteria.len(), 3);
        assert_eq!(
            story.acceptance_criteria[0],
            "Expired sessions redirect to the login page"
        );

        assert_eq!(story.tasks.len(), 3);
        assert!(story.tasks[0].done);
        assert!(!story.tasks[1].done);
        assert_eq!(story.tasks[1].description, "Implement redirect with return URL");

        assert!(story.body.contains("Out of scope"));
    }

    #[test]
    fn missing_frontmatter_is_an_error() {
        let err = parse_story("# Just markdown\n\nno frontmatter").unwrap_err();
        assert!(matches!(err, StoryError::MissingFrontmatter));
    }

    #[test]
    fn malformed_frontmatter_is_an_error() {
        let err = parse_story("---\nid: [broken\n---\nbody").unwrap_err();
        assert!(matches!(err, StoryError::InvalidFrontmatter(_)));
    }

    #[test]
    fn sections_are_optional() {
        let story = parse_story("---\nid: s1\ntitle: Bare\n---\nJust a body.").unwrap();
        assert!(story.acceptance_criteria.is_empty());
        assert!(story.tasks.is_empty());
        assert_eq!(story.body, "Just a body.");
    }

    #[test]
    fn load_story_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.md");
        std::fs::write(&path, STORY).unwrap();

        let story = load_story_file(&path).unwrap();
        assert_eq!(story.manifest.id, "story-auth-01");
    }

    #[test]
    fn load_story_file_missing_is_io_error() {
        let err = load_story_file(Path::new("/nonexistent/story.md")).unwrap_err();
        assert!(matches!(err, StoryError::Io(_)));
    }
}
