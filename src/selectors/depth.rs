use crate::error::SelectError;
use crate::project::Project;

use super::{depth_of, Candidate, FileSelector};

/// Selects entries whose directory depth lies in `[min, max]`.
#[derive(Debug, Clone, Default)]
pub struct DepthSelector {
    min: Option<usize>,
    max: Option<usize>,
}

impl DepthSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_min(&mut self, min: usize) {
        self.min = Some(min);
    }

    pub fn set_max(&mut self, max: usize) {
        self.max = Some(max);
    }

    fn validate(&self) -> Result<(), SelectError> {
        match (self.min, self.max) {
            (None, None) => Err(SelectError::Validation(
                "You must set at least one of the min or the max levels.".into(),
            )),
            (Some(min), Some(max)) if max < min => Err(SelectError::Validation(
                "The maximum depth is lower than the minimum.".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl FileSelector for DepthSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        self.validate()?;
        let depth = depth_of(candidate.name);
        Ok(self.min.map_or(true, |min| depth >= min) && self.max.map_or(true, |max| depth <= max))
    }
}
