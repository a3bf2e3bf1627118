use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SelectError;
use crate::mapper::{FileNameMapper, Mapper};
use crate::project::Project;
use crate::resource::Resource;

use super::{default_granularity_millis, illegal_value, Candidate, FileSelector};

/// Target directory plus an optional mapper; shared by the present and
/// depend selectors.
#[derive(Debug, Clone, Default)]
struct Mapping {
    target_dir: Option<PathBuf>,
    mappers: Vec<Mapper>,
}

impl Mapping {
    /// The target counterpart of `candidate`, `None` when the mapper has no
    /// mapping for it.
    fn target(&self, project: &Project, candidate: &Candidate<'_>) -> Result<Option<Resource>, SelectError> {
        let target_dir = self.target_dir.as_ref().ok_or_else(|| {
            SelectError::Validation("The targetdir attribute is required.".into())
        })?;
        if self.mappers.len() > 1 {
            return Err(SelectError::Validation(
                "Cannot define more than one mapper".into(),
            ));
        }
        let mapper = self.mappers.first().unwrap_or(&Mapper::Identity);
        let target_dir = project.resolve_file(target_dir);

        let Some(names) = mapper.map_file_name(candidate.name) else {
            return Ok(None);
        };
        match names.as_slice() {
            [one] => Ok(Some(Resource::from_path(
                Some(&target_dir),
                one,
                target_dir.join(one),
            ))),
            _ => Err(SelectError::Validation(format!(
                "Invalid destination file results for {} with filename {}",
                target_dir.display(),
                candidate.name
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// Select when the counterpart exists.
    #[default]
    Both,
    /// Select when the counterpart is missing.
    SrcOnly,
}

impl FromStr for Presence {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(Self::Both),
            "srconly" => Ok(Self::SrcOnly),
            _ => Err(illegal_value(s)),
        }
    }
}

/// Selects by existence of a mapped counterpart under a target directory.
#[derive(Debug, Clone, Default)]
pub struct PresentSelector {
    mapping: Mapping,
    present: Presence,
}

impl PresentSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target_dir(&mut self, dir: impl Into<PathBuf>) {
        self.mapping.target_dir = Some(dir.into());
    }

    pub fn add_mapper(&mut self, mapper: Mapper) {
        self.mapping.mappers.push(mapper);
    }

    pub fn set_present(&mut self, present: &str) -> Result<(), SelectError> {
        self.present = present.parse()?;
        Ok(())
    }
}

impl FileSelector for PresentSelector {
    fn is_selected(&self, project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let Some(target) = self.mapping.target(project, candidate)? else {
            return Ok(false);
        };
        Ok(match self.present {
            Presence::Both => target.exists,
            Presence::SrcOnly => !target.exists,
        })
    }
}

/// Selects candidates whose mapped target is missing or older than the
/// candidate, i.e. targets that need rebuilding.
#[derive(Debug, Clone)]
pub struct DependSelector {
    mapping: Mapping,
    granularity: i64,
}

impl Default for DependSelector {
    fn default() -> Self {
        Self {
            mapping: Mapping::default(),
            granularity: default_granularity_millis(),
        }
    }
}

impl DependSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target_dir(&mut self, dir: impl Into<PathBuf>) {
        self.mapping.target_dir = Some(dir.into());
    }

    pub fn add_mapper(&mut self, mapper: Mapper) {
        self.mapping.mappers.push(mapper);
    }

    pub fn set_granularity(&mut self, millis: i64) {
        self.granularity = millis;
    }
}

impl FileSelector for DependSelector {
    fn is_selected(&self, project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let Some(target) = self.mapping.target(project, candidate)? else {
            return Ok(false);
        };
        let source = candidate.resource;
        if !source.exists {
            return Ok(false);
        }
        if !target.exists {
            return Ok(true);
        }
        Ok(source.last_modified_millis() - self.granularity > target.last_modified_millis())
    }
}
