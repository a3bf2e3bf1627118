use crate::error::SelectError;
use crate::pattern;
use crate::project::Project;

use super::{Candidate, FileSelector};

/// Selects entries whose relative name matches a glob.
#[derive(Debug, Clone)]
pub struct FilenameSelector {
    name: Option<String>,
    case_sensitive: bool,
    negate: bool,
}

impl Default for FilenameSelector {
    fn default() -> Self {
        Self {
            name: None,
            case_sensitive: true,
            negate: false,
        }
    }
}

impl FilenameSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, pattern: impl Into<String>) {
        self.name = Some(pattern.into());
    }

    pub fn set_case_sensitive(&mut self, yes: bool) {
        self.case_sensitive = yes;
    }

    /// Select the names that do not match instead.
    pub fn set_negate(&mut self, yes: bool) {
        self.negate = yes;
    }
}

impl FileSelector for FilenameSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| SelectError::Validation("The name attribute is required".into()))?;
        Ok(pattern::matches(name, candidate.name, self.case_sensitive) != self.negate)
    }
}
