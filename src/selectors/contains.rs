use crate::error::SelectError;
use crate::project::Project;

use super::{Candidate, FileSelector};

/// Selects files whose text contains a literal string.
///
/// Directories have no content and are never selected, unless
/// `skip_directories` is set, in which case they pass through unexamined.
#[derive(Debug, Clone)]
pub struct ContainsSelector {
    text: Option<String>,
    case_sensitive: bool,
    ignore_whitespace: bool,
    skip_directories: bool,
}

impl Default for ContainsSelector {
    fn default() -> Self {
        Self {
            text: None,
            case_sensitive: true,
            ignore_whitespace: false,
            skip_directories: false,
        }
    }
}

impl ContainsSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn set_case_sensitive(&mut self, yes: bool) {
        self.case_sensitive = yes;
    }

    /// Strip all whitespace from both the text and the content first.
    pub fn set_ignore_whitespace(&mut self, yes: bool) {
        self.ignore_whitespace = yes;
    }

    pub fn set_skip_directories(&mut self, yes: bool) {
        self.skip_directories = yes;
    }

    fn normalize(&self, s: &str) -> String {
        let s: String = if self.ignore_whitespace {
            s.chars().filter(|c| !c.is_whitespace()).collect()
        } else {
            s.to_string()
        };
        if self.case_sensitive {
            s
        } else {
            s.to_lowercase()
        }
    }
}

impl FileSelector for ContainsSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let text = self
            .text
            .as_deref()
            .ok_or_else(|| SelectError::Validation("The text attribute is required".into()))?;

        if candidate.resource.is_directory() {
            return Ok(self.skip_directories);
        }
        if !candidate.resource.exists {
            return Ok(false);
        }

        let needle = self.normalize(text);
        if needle.is_empty() {
            return Ok(true);
        }
        let content = candidate.resource.read_content()?;
        let haystack = self.normalize(&String::from_utf8_lossy(&content));
        Ok(haystack.contains(&needle))
    }
}
