use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::archive::{ArchiveScan, ArchiveSet};
use crate::cache::{CachedValue, CollectionId, ScanCache};
use crate::error::SelectError;
use crate::fileset::{FileSet, SetKind};
use crate::filelist::FileList;
use crate::path::SearchPath;
use crate::pattern_set::PatternSet;
use crate::reference::Referenceable;
use crate::scanner::ScanResult;
use crate::selectors::{SelectorContainer, SelectorRegistry};

/// Property naming the class path ordering policy.
pub const BUILD_SYSCLASSPATH: &str = "build.sysclasspath";

/// Anything that can be registered under an id and referenced elsewhere.
#[derive(Debug, Clone)]
pub enum Element {
    PatternSet(PatternSet),
    FileSet(FileSet),
    DirSet(FileSet),
    FileList(FileList),
    ArchiveSet(ArchiveSet),
    Path(SearchPath),
    Selector(SelectorContainer),
}

impl Element {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PatternSet(_) => "patternset",
            Self::FileSet(_) => "fileset",
            Self::DirSet(_) => "dirset",
            Self::FileList(_) => "filelist",
            Self::ArchiveSet(_) => "zipfileset",
            Self::Path(_) => "path",
            Self::Selector(_) => "selector",
        }
    }
}

impl From<PatternSet> for Element {
    fn from(value: PatternSet) -> Self {
        Self::PatternSet(value)
    }
}

impl From<FileSet> for Element {
    fn from(value: FileSet) -> Self {
        match value.kind() {
            SetKind::Files => Self::FileSet(value),
            SetKind::Dirs => Self::DirSet(value),
        }
    }
}

impl From<FileList> for Element {
    fn from(value: FileList) -> Self {
        Self::FileList(value)
    }
}

impl From<ArchiveSet> for Element {
    fn from(value: ArchiveSet) -> Self {
        Self::ArchiveSet(value)
    }
}

impl From<SearchPath> for Element {
    fn from(value: SearchPath) -> Self {
        Self::Path(value)
    }
}

impl From<SelectorContainer> for Element {
    fn from(value: SelectorContainer) -> Self {
        Self::Selector(value)
    }
}

/// The evaluation scope: base directory, properties, the reference
/// registry, the custom selector registry and the scan cache.
///
/// Scan results are cached per project. The same collection evaluated in
/// two projects is scanned once in each.
#[derive(Debug)]
pub struct Project {
    basedir: PathBuf,
    properties: BTreeMap<String, String>,
    references: HashMap<String, Element>,
    selectors: SelectorRegistry,
    generation: u64,
    scans: RefCell<ScanCache>,
}

impl Project {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            properties: BTreeMap::new(),
            references: HashMap::new(),
            selectors: SelectorRegistry::with_builtins(),
            generation: 0,
            scans: RefCell::new(ScanCache::default()),
        }
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    /// Resolve `name` against the project base directory unless absolute.
    pub fn resolve_file(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.basedir.join(name)
        }
    }

    // ── Properties ────────────────────────────────────────────────────────

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
        self.generation += 1;
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Replace `${name}` with the property value; unknown names are kept.
    pub fn replace_properties(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.property(name) {
                        Some(v) => out.push_str(v),
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    // ── References ────────────────────────────────────────────────────────

    /// Register `element` under `id`, replacing any previous element.
    pub fn add_reference(&mut self, id: impl Into<String>, element: impl Into<Element>) {
        self.references.insert(id.into(), element.into());
        self.generation += 1;
    }

    pub fn reference(&self, id: &str) -> Option<&Element> {
        self.references.get(id)
    }

    /// Mutable access to a registered element. Invalidates cached scans
    /// that may depend on it.
    pub fn reference_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.generation += 1;
        self.references.get_mut(id)
    }

    pub fn has_reference(&self, id: &str) -> bool {
        self.references.contains_key(id)
    }

    /// Look up `id` and check that it denotes a `T`.
    pub fn lookup<T: Referenceable>(&self, id: &str) -> Result<&T, SelectError> {
        let element = self
            .references
            .get(id)
            .ok_or_else(|| SelectError::UnknownReference(id.to_string()))?;
        T::from_element(element).ok_or_else(|| SelectError::WrongReferenceType {
            id: id.to_string(),
            expected: T::TYPE_NAME,
        })
    }

    /// Registry generation; bumped by every registry or property change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Custom selectors ──────────────────────────────────────────────────

    pub fn selector_registry(&self) -> &SelectorRegistry {
        &self.selectors
    }

    pub fn selector_registry_mut(&mut self) -> &mut SelectorRegistry {
        &mut self.selectors
    }

    // ── Scan cache ────────────────────────────────────────────────────────

    /// Drop every cached scan.
    pub fn clear_scan_cache(&self) {
        self.scans.borrow_mut().clear();
    }

    pub fn cached_scan_count(&self) -> usize {
        self.scans.borrow().len()
    }

    pub(crate) fn cached_directory_scan<F>(
        &self,
        id: CollectionId,
        generation: u64,
        compute: F,
    ) -> Result<Rc<ScanResult>, SelectError>
    where
        F: FnOnce() -> Result<ScanResult, SelectError>,
    {
        let hit = self.scans.borrow().get(id, generation, self.generation);
        if let Some(CachedValue::Directory(scan)) = hit {
            return Ok(scan);
        }
        let scan = Rc::new(compute()?);
        self.scans.borrow_mut().put(
            id,
            generation,
            self.generation,
            CachedValue::Directory(Rc::clone(&scan)),
        );
        Ok(scan)
    }

    pub(crate) fn cached_archive_scan<F>(
        &self,
        id: CollectionId,
        generation: u64,
        compute: F,
    ) -> Result<Rc<ArchiveScan>, SelectError>
    where
        F: FnOnce() -> Result<ArchiveScan, SelectError>,
    {
        let hit = self.scans.borrow().get(id, generation, self.generation);
        if let Some(CachedValue::Archive(scan)) = hit {
            return Ok(scan);
        }
        let scan = Rc::new(compute()?);
        self.scans.borrow_mut().put(
            id,
            generation,
            self.generation,
            CachedValue::Archive(Rc::clone(&scan)),
        );
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_expansion() {
        let mut p = Project::new("/tmp");
        p.set_property("src", "main");
        assert_eq!(p.replace_properties("${src}/**/*.rs"), "main/**/*.rs");
        assert_eq!(p.replace_properties("${missing}/x"), "${missing}/x");
        assert_eq!(p.replace_properties("a${b"), "a${b");
    }

    #[test]
    fn registry_changes_bump_generation() {
        let mut p = Project::new("/tmp");
        let g = p.generation();
        p.add_reference("ps", PatternSet::new());
        assert!(p.generation() > g);
    }

    #[test]
    fn lookup_reports_missing_and_mistyped() {
        let mut p = Project::new("/tmp");
        p.add_reference("ps", PatternSet::new());
        let err = p.lookup::<SearchPath>("ps").unwrap_err();
        assert_eq!(err.to_string(), "ps doesn't denote a path");
        let err = p.lookup::<SearchPath>("nope").unwrap_err();
        assert_eq!(err.to_string(), "Reference nope not found.");
    }
}
