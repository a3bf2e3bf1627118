use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cache::{next_generation, CollectionId};
use crate::collection::ResourceCollection;
use crate::error::SelectError;
use crate::pattern_set::{NameEntry, PatternSet, Patterns};
use crate::project::{Element, Project};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};
use crate::resource::Resource;
use crate::scanner::{DirectoryScanner, ScanResult};
use crate::selectors::Selector;

/// Whether a set yields the files or the directories of its scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Files,
    Dirs,
}

impl SetKind {
    fn element_name(self) -> &'static str {
        match self {
            Self::Files => "fileset",
            Self::Dirs => "dirset",
        }
    }
}

#[derive(Debug, Clone)]
struct FileSetState {
    dir: Option<PathBuf>,
    file: Option<PathBuf>,
    patterns: PatternSet,
    pattern_sets: Vec<PatternSet>,
    selectors: Vec<Selector>,
    default_excludes: bool,
    case_sensitive: bool,
    follow_symlinks: bool,
    error_on_missing_dir: bool,
}

impl Default for FileSetState {
    fn default() -> Self {
        Self {
            dir: None,
            file: None,
            patterns: PatternSet::new(),
            pattern_sets: Vec::new(),
            selectors: Vec::new(),
            default_excludes: true,
            case_sensitive: true,
            follow_symlinks: true,
            error_on_missing_dir: true,
        }
    }
}

fn dir_and_file() -> SelectError {
    SelectError::Config("Cannot set both dir and file attributes".into())
}

/// A directory tree filtered by patterns and selectors.
///
/// The same type backs both file sets and dir sets; [`SetKind`] decides
/// which half of the scan is returned. Scans are cached in the evaluating
/// [`Project`] and every setter invalidates the cached scan.
#[derive(Debug)]
pub struct FileSet {
    kind: SetKind,
    id: CollectionId,
    generation: u64,
    def: Definition<FileSetState>,
}

impl Clone for FileSet {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            id: CollectionId::next(),
            generation: self.generation,
            def: self.def.clone(),
        }
    }
}

impl Default for FileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSet {
    pub fn new() -> Self {
        Self::with_kind(SetKind::Files)
    }

    pub fn dirset() -> Self {
        Self::with_kind(SetKind::Dirs)
    }

    pub fn with_kind(kind: SetKind) -> Self {
        Self {
            kind,
            id: CollectionId::next(),
            generation: next_generation(),
            def: Definition::default(),
        }
    }

    /// A set of `kind` standing for the one registered under `id`.
    pub fn reference(kind: SetKind, id: &str) -> Self {
        Self {
            def: Definition::Reference(Reference::new(id)),
            ..Self::with_kind(kind)
        }
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    pub fn is_reference(&self) -> bool {
        self.def.reference().is_some()
    }

    fn touch(&mut self) {
        self.generation = next_generation();
    }

    fn attrs(&mut self) -> Result<&mut FileSetState, SelectError> {
        self.touch();
        self.def.attrs_mut()
    }

    fn children(&mut self) -> Result<&mut FileSetState, SelectError> {
        self.touch();
        self.def.children_mut()
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub fn set_refid(&mut self, id: &str) -> Result<(), SelectError> {
        self.touch();
        self.def.set_refid(id)
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), SelectError> {
        let state = self.attrs()?;
        if state.file.is_some() {
            return Err(dir_and_file());
        }
        state.dir = Some(dir.into());
        Ok(())
    }

    /// Single-file shorthand: the parent becomes the base directory and
    /// the file name the only include.
    pub fn set_file(&mut self, file: impl Into<PathBuf>) -> Result<(), SelectError> {
        let state = self.attrs()?;
        if state.dir.is_some() {
            return Err(dir_and_file());
        }
        state.file = Some(file.into());
        Ok(())
    }

    pub fn set_includes(&mut self, list: &str) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_includes(list)
    }

    pub fn set_excludes(&mut self, list: &str) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_excludes(list)
    }

    pub fn set_includes_file(&mut self, file: impl Into<String>) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_includes_file(file)
    }

    pub fn set_excludes_file(&mut self, file: impl Into<String>) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_excludes_file(file)
    }

    pub fn set_default_excludes(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.default_excludes = yes;
        Ok(())
    }

    pub fn set_case_sensitive(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.case_sensitive = yes;
        Ok(())
    }

    pub fn set_follow_symlinks(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.follow_symlinks = yes;
        Ok(())
    }

    pub fn set_error_on_missing_dir(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.error_on_missing_dir = yes;
        Ok(())
    }

    // ── Nested elements ───────────────────────────────────────────────────

    pub fn add_include(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.children()?.patterns.add_include(entry)
    }

    pub fn add_exclude(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.children()?.patterns.add_exclude(entry)
    }

    pub fn add_pattern_set(&mut self, set: PatternSet) -> Result<(), SelectError> {
        self.children()?.pattern_sets.push(set);
        Ok(())
    }

    pub fn add_selector(&mut self, selector: impl Into<Selector>) -> Result<(), SelectError> {
        self.children()?.selectors.push(selector.into());
        Ok(())
    }

    // ── Evaluation ────────────────────────────────────────────────────────

    /// The base directory after following references.
    pub fn dir(&self, project: &Project) -> Result<PathBuf, SelectError> {
        with_resolved(self, project, &mut RefStack::new(), |set, _| {
            let state = set.state()?;
            Ok(set.base_and_patterns(state, project)?.0)
        })
    }

    /// Scan the tree, reusing the project's cached scan when nothing has
    /// changed.
    pub fn scan(&self, project: &Project) -> Result<Rc<ScanResult>, SelectError> {
        self.scan_with(project, &mut RefStack::new())
    }

    pub(crate) fn scan_with(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Rc<ScanResult>, SelectError> {
        with_resolved(self, project, stack, |set, stack| {
            project.cached_directory_scan(set.id, set.generation, || {
                set.scanner(project, stack)?.scan_with(project, stack)
            })
        })
    }

    fn state(&self) -> Result<&FileSetState, SelectError> {
        self.def.direct().ok_or_else(|| {
            SelectError::Config(format!("{} is still a reference", self.kind.element_name()))
        })
    }

    /// Base directory plus the single include implied by `file`, if any.
    fn base_and_patterns(
        &self,
        state: &FileSetState,
        project: &Project,
    ) -> Result<(PathBuf, Option<String>), SelectError> {
        if let Some(file) = &state.file {
            let file = project.resolve_file(file);
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    SelectError::Config(format!("{} has no file name", file.display()))
                })?;
            let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
            return Ok((parent, Some(name)));
        }
        match &state.dir {
            Some(dir) => Ok((project.resolve_file(dir), None)),
            None => Err(SelectError::Config(format!(
                "No directory specified for {}.",
                self.kind.element_name()
            ))),
        }
    }

    fn scanner(&self, project: &Project, stack: &mut RefStack) -> Result<DirectoryScanner, SelectError> {
        let state = self.state()?;
        let (dir, file_include) = self.base_and_patterns(state, project)?;

        let mut patterns: Patterns = state.patterns.patterns(project, stack)?;
        for set in &state.pattern_sets {
            patterns.merge(set.patterns(project, stack)?);
        }
        patterns.includes.extend(file_include);

        Ok(DirectoryScanner::new(dir)
            .includes(patterns.includes)
            .excludes(patterns.excludes)
            .default_excludes(state.default_excludes)
            .case_sensitive(state.case_sensitive)
            .follow_symlinks(state.follow_symlinks)
            .error_on_missing_dir(state.error_on_missing_dir)
            .selectors(state.selectors.iter().cloned()))
    }
}

impl ResourceCollection for FileSet {
    fn collect_resources(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Vec<Resource>, SelectError> {
        let scan = self.scan_with(project, stack)?;
        Ok(match self.kind {
            SetKind::Files => scan.included_files.clone(),
            SetKind::Dirs => scan.included_dirs.clone(),
        })
    }

    fn filesystem_only(&self, _project: &Project, _stack: &mut RefStack) -> Result<bool, SelectError> {
        Ok(true)
    }
}

impl Referenceable for FileSet {
    const TYPE_NAME: &'static str = "fileset";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::FileSet(s) | Element::DirSet(s) => Some(s),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        self.kind.element_name()
    }

    fn accepts(&self, target: &Self) -> bool {
        self.kind == target.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_and_file_are_exclusive() {
        let mut fs = FileSet::new();
        fs.set_dir("src").unwrap();
        assert_eq!(
            fs.set_file("src/lib.rs").unwrap_err().to_string(),
            "Cannot set both dir and file attributes"
        );
    }

    #[test]
    fn refid_after_attribute_fails_eagerly() {
        let mut fs = FileSet::new();
        fs.set_includes("**/*.rs").unwrap();
        assert!(fs.set_refid("other").is_err());

        let mut fs = FileSet::reference(SetKind::Files, "other");
        assert!(fs.set_dir("src").is_err());
        assert!(fs.add_selector(Selector::reference("x")).is_err());
    }

    #[test]
    fn setters_change_generation_and_clones_get_new_ids() {
        let mut fs = FileSet::new();
        let before = fs.generation;
        fs.set_dir("src").unwrap();
        assert_ne!(before, fs.generation);

        let copy = fs.clone();
        assert_ne!(copy.id, fs.id);
    }

    #[test]
    fn missing_dir_is_reported_by_kind() {
        let project = Project::new("/nonexistent");
        let err = FileSet::dirset().scan(&project).unwrap_err();
        assert_eq!(err.to_string(), "No directory specified for dirset.");
    }
}
