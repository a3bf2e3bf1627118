use std::str::FromStr;

use crate::error::SelectError;
use crate::project::Project;

use super::{illegal_value, Candidate, FileSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Dir,
}

impl FromStr for FileType {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "dir" => Ok(Self::Dir),
            _ => Err(illegal_value(s)),
        }
    }
}

/// Selects only files or only directories.
#[derive(Debug, Clone, Default)]
pub struct TypeSelector {
    file_type: Option<FileType>,
}

impl TypeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(&mut self, file_type: &str) -> Result<(), SelectError> {
        self.file_type = Some(file_type.parse()?);
        Ok(())
    }
}

impl FileSelector for TypeSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let wanted = self
            .file_type
            .ok_or_else(|| SelectError::Validation("The type attribute is required".into()))?;
        Ok(candidate.resource.is_directory() == (wanted == FileType::Dir))
    }
}
