use std::path::PathBuf;

use crate::collection::ResourceCollection;
use crate::error::SelectError;
use crate::pattern_set::split_patterns;
use crate::project::{Element, Project};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};
use crate::resource::Resource;

#[derive(Debug, Clone, Default)]
struct FileListState {
    dir: Option<PathBuf>,
    files: Vec<String>,
}

/// A base directory plus literal file names, in declaration order.
///
/// Unlike a file set nothing is scanned and names need not exist.
#[derive(Debug, Clone, Default)]
pub struct FileList {
    def: Definition<FileListState>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(id: &str) -> Self {
        Self {
            def: Definition::Reference(Reference::new(id)),
        }
    }

    pub fn set_refid(&mut self, id: &str) -> Result<(), SelectError> {
        self.def.set_refid(id)
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), SelectError> {
        self.def.attrs_mut()?.dir = Some(dir.into());
        Ok(())
    }

    /// Add every name of a comma- or space-separated list.
    pub fn set_files(&mut self, list: &str) -> Result<(), SelectError> {
        self.def
            .attrs_mut()?
            .files
            .extend(split_patterns(list).map(str::to_string));
        Ok(())
    }

    pub fn add_file(&mut self, name: impl Into<String>) -> Result<(), SelectError> {
        self.def.children_mut()?.files.push(name.into());
        Ok(())
    }

    /// The resolved base directory and names.
    pub fn files(&self, project: &Project) -> Result<(PathBuf, Vec<String>), SelectError> {
        with_resolved(self, project, &mut RefStack::new(), |list, _| list.checked(project))
    }

    fn checked(&self, project: &Project) -> Result<(PathBuf, Vec<String>), SelectError> {
        let state = self.def.direct().cloned().unwrap_or_default();
        let dir = state
            .dir
            .ok_or_else(|| SelectError::Config("No directory specified for filelist.".into()))?;
        if state.files.is_empty() {
            return Err(SelectError::Config("No files specified for filelist.".into()));
        }
        Ok((project.resolve_file(dir), state.files))
    }
}

impl ResourceCollection for FileList {
    fn collect_resources(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Vec<Resource>, SelectError> {
        with_resolved(self, project, stack, |list, _| {
            let (dir, files) = list.checked(project)?;
            Ok(files
                .iter()
                .map(|name| Resource::from_path(Some(&dir), name, dir.join(name)))
                .collect())
        })
    }

    fn filesystem_only(&self, _project: &Project, _stack: &mut RefStack) -> Result<bool, SelectError> {
        Ok(true)
    }
}

impl Referenceable for FileList {
    const TYPE_NAME: &'static str = "filelist";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::FileList(l) => Some(l),
            _ => None,
        }
    }
}
