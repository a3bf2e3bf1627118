//! Ordered, class-path-like resource sequences.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::archive::ArchiveSet;
use crate::collection::ResourceCollection;
use crate::error::SelectError;
use crate::filelist::FileList;
use crate::fileset::FileSet;
use crate::project::{Element, Project, BUILD_SYSCLASSPATH};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};
use crate::resource::Resource;

/// How a user path and a platform path are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClasspathOrder {
    /// Platform entries, then user entries.
    First,
    /// User entries, then platform entries.
    #[default]
    Last,
    /// Platform entries only.
    Only,
    /// User entries only.
    Ignore,
}

impl FromStr for ClasspathOrder {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "only" => Ok(Self::Only),
            "ignore" => Ok(Self::Ignore),
            _ => Err(SelectError::Config(format!(
                "invalid value for {BUILD_SYSCLASSPATH}: {s}"
            ))),
        }
    }
}

impl fmt::Display for ClasspathOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Only => "only",
            Self::Ignore => "ignore",
        })
    }
}

/// One entry of a [`SearchPath`], in declaration order.
#[derive(Debug, Clone)]
pub enum PathElement {
    /// A single file or directory, resolved against the project base.
    Location(PathBuf),
    /// A list of locations separated by `:` or `;`, see [`split_path_list`].
    PathList(String),
    FileSet(FileSet),
    FileList(FileList),
    ArchiveSet(ArchiveSet),
    Path(SearchPath),
}

#[derive(Debug, Clone, Default)]
struct PathState {
    elements: Vec<PathElement>,
    dedup: bool,
}

/// Concatenation of locations and nested collections, kept in declaration
/// order. Duplicates are kept unless de-duplication is switched on.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    def: Definition<PathState>,
}

impl SearchPath {
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

    pub fn is_reference(&self) -> bool {
        self.def.reference().is_some()
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub fn set_location(&mut self, location: impl Into<PathBuf>) -> Result<(), SelectError> {
        self.def
            .attrs_mut()?
            .elements
            .push(PathElement::Location(location.into()));
        Ok(())
    }

    /// A platform-separated list of locations.
    pub fn set_path(&mut self, list: impl Into<String>) -> Result<(), SelectError> {
        self.def
            .attrs_mut()?
            .elements
            .push(PathElement::PathList(list.into()));
        Ok(())
    }

    /// Drop repeated resources, keeping the first occurrence.
    pub fn set_dedup(&mut self, yes: bool) -> Result<(), SelectError> {
        self.def.attrs_mut()?.dedup = yes;
        Ok(())
    }

    // ── Nested elements ───────────────────────────────────────────────────

    pub fn add_element(&mut self, element: PathElement) -> Result<(), SelectError> {
        self.def.children_mut()?.elements.push(element);
        Ok(())
    }

    pub fn add_location(&mut self, location: impl Into<PathBuf>) -> Result<(), SelectError> {
        self.add_element(PathElement::Location(location.into()))
    }

    /// A file set or dir set; which one is decided by the set's kind.
    pub fn add_fileset(&mut self, set: FileSet) -> Result<(), SelectError> {
        self.add_element(PathElement::FileSet(set))
    }

    pub fn add_filelist(&mut self, list: FileList) -> Result<(), SelectError> {
        self.add_element(PathElement::FileList(list))
    }

    pub fn add_archive_set(&mut self, set: ArchiveSet) -> Result<(), SelectError> {
        self.add_element(PathElement::ArchiveSet(set))
    }

    pub fn add_path(&mut self, path: SearchPath) -> Result<(), SelectError> {
        self.add_element(PathElement::Path(path))
    }

    // ── Rendering ─────────────────────────────────────────────────────────

    /// Fail unless every contained resource is backed by a file.
    pub fn assert_filesystem_only(&self, project: &Project) -> Result<(), SelectError> {
        if self.is_filesystem_only(project)? {
            Ok(())
        } else {
            Err(SelectError::NotFilesystemOnly(Self::TYPE_NAME.to_string()))
        }
    }

    /// Absolute path of every resource, in order.
    ///
    /// # Errors
    ///
    /// [`SelectError::NotFilesystemOnly`] when any element is not backed by
    /// files, checked before anything is resolved.
    pub fn list(&self, project: &Project) -> Result<Vec<String>, SelectError> {
        self.assert_filesystem_only(project)?;
        self.resources(project)?
            .iter()
            .map(|r| r.file().map(|p| p.display().to_string()))
            .collect()
    }

    /// The list joined with the platform path separator.
    pub fn to_path_string(&self, project: &Project) -> Result<String, SelectError> {
        let list = self.list(project)?;
        let joined = std::env::join_paths(&list).map_err(|e| SelectError::Config(e.to_string()))?;
        Ok(joined.to_string_lossy().into_owned())
    }

    // ── Composition ───────────────────────────────────────────────────────

    /// Append every entry of `source` that exists on disk.
    ///
    /// With `try_user_dir`, an entry that does not exist relative to the
    /// project is retried relative to the current working directory. An
    /// entry like `lib/*` is kept when its parent directory exists.
    /// Dropped entries are logged.
    pub fn add_existing(
        &mut self,
        source: &SearchPath,
        project: &Project,
        try_user_dir: bool,
    ) -> Result<(), SelectError> {
        let names = source.list(project)?;
        let elements = &mut self.def.children_mut()?.elements;
        for name in names {
            let mut file = project.resolve_file(&name);
            if try_user_dir && !file.exists() {
                if let Ok(cwd) = std::env::current_dir() {
                    file = cwd.join(&name);
                }
            }
            if file.exists() {
                elements.push(PathElement::Location(file));
            } else if is_wildcard_entry(&file) {
                debug!(entry = %file.display(), "adding {} which contains wildcards", file.display());
                elements.push(PathElement::Location(file));
            } else {
                warn!(entry = %file.display(), "dropping {} from path as it doesn't exist", file.display());
            }
        }
        Ok(())
    }

    /// A new path holding only the entries of this one that exist.
    pub fn existing(&self, project: &Project) -> Result<SearchPath, SelectError> {
        let mut out = SearchPath::new();
        out.add_existing(self, project, false)?;
        Ok(out)
    }

    /// Combine this path with a platform path.
    ///
    /// The order comes from the `build.sysclasspath` project property when
    /// set, `default_order` otherwise. An unrecognised property value is
    /// logged and treated as `last`. Only existing entries are kept on
    /// either side.
    pub fn concat_platform_path(
        &self,
        platform: &SearchPath,
        default_order: ClasspathOrder,
        project: &Project,
    ) -> Result<SearchPath, SelectError> {
        let order = match project.property(BUILD_SYSCLASSPATH) {
            None => default_order,
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!(value, "invalid value for {}: {}", BUILD_SYSCLASSPATH, value);
                ClasspathOrder::Last
            }),
        };
        debug!(%order, "concatenating platform path");

        let mut result = SearchPath::new();
        match order {
            ClasspathOrder::Only => result.add_existing(platform, project, true)?,
            ClasspathOrder::First => {
                result.add_existing(platform, project, true)?;
                result.add_existing(self, project, false)?;
            }
            ClasspathOrder::Ignore => result.add_existing(self, project, false)?,
            ClasspathOrder::Last => {
                result.add_existing(self, project, false)?;
                result.add_existing(platform, project, true)?;
            }
        }
        Ok(result)
    }

    /// The directly held elements; empty for a reference.
    pub fn elements(&self) -> &[PathElement] {
        self.def.direct().map(|s| s.elements.as_slice()).unwrap_or(&[])
    }
}

fn element_resources(
    element: &PathElement,
    project: &Project,
    stack: &mut RefStack,
) -> Result<Vec<Resource>, SelectError> {
    match element {
        PathElement::Location(location) => Ok(vec![location_resource(project, location)]),
        PathElement::PathList(list) => {
            let expanded = project.replace_properties(list);
            Ok(split_path_list(&expanded)
                .iter()
                .map(|p| location_resource(project, Path::new(p)))
                .collect())
        }
        PathElement::FileSet(set) => set.collect_resources(project, stack),
        PathElement::FileList(list) => list.collect_resources(project, stack),
        PathElement::ArchiveSet(set) => set.collect_resources(project, stack),
        PathElement::Path(path) => path.collect_resources(project, stack),
    }
}

/// A class path wildcard: the file name holds `*` and the parent exists.
fn is_wildcard_entry(file: &Path) -> bool {
    let wildcard_name = file
        .file_name()
        .is_some_and(|n| n.to_string_lossy().contains('*'));
    wildcard_name && file.parent().is_some_and(Path::exists)
}

/// Split a path list on `:` and `;` regardless of platform.
///
/// Both `/` and `\` become the platform separator. On Windows a
/// single-letter entry followed by `:` is a drive prefix and stays joined
/// with the next entry. Empty entries are skipped.
pub fn split_path_list(list: &str) -> Vec<String> {
    let dos_drives = cfg!(windows);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = list.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if dos_drives
                && current.len() == 1
                && current.chars().all(|d| d.is_ascii_alphabetic())
                && matches!(chars.peek(), Some('/' | '\\')) =>
            {
                current.push(':');
            }
            ':' | ';' => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            '/' | '\\' => current.push(MAIN_SEPARATOR),
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn location_resource(project: &Project, location: &Path) -> Resource {
    let file = project.resolve_file(location);
    let name = file.display().to_string();
    Resource::from_path(None, &name, file)
}

impl ResourceCollection for SearchPath {
    fn collect_resources(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Vec<Resource>, SelectError> {
        with_resolved(self, project, stack, |path, stack| {
            let Some(state) = path.def.direct() else {
                return Ok(Vec::new());
            };
            let mut out = Vec::new();
            for element in &state.elements {
                out.extend(element_resources(element, project, stack)?);
            }
            if state.dedup {
                let mut seen = HashSet::new();
                out.retain(|r| seen.insert(r.to_long_string()));
            }
            Ok(out)
        })
    }

    fn filesystem_only(&self, project: &Project, stack: &mut RefStack) -> Result<bool, SelectError> {
        with_resolved(self, project, stack, |path, stack| {
            for element in path.elements() {
                let ok = match element {
                    PathElement::Location(_) | PathElement::PathList(_) => true,
                    PathElement::FileSet(s) => s.filesystem_only(project, stack)?,
                    PathElement::FileList(l) => l.filesystem_only(project, stack)?,
                    PathElement::ArchiveSet(s) => s.filesystem_only(project, stack)?,
                    PathElement::Path(p) => p.filesystem_only(project, stack)?,
                };
                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }
}

impl Referenceable for SearchPath {
    const TYPE_NAME: &'static str = "path";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::Path(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_parses_the_four_policies() {
        assert_eq!("first".parse::<ClasspathOrder>().unwrap(), ClasspathOrder::First);
        assert_eq!("only".parse::<ClasspathOrder>().unwrap(), ClasspathOrder::Only);
        assert!("sometimes".parse::<ClasspathOrder>().is_err());
    }

    #[test]
    fn locations_keep_declaration_order_and_duplicates() {
        let project = Project::new("/base");
        let mut path = SearchPath::new();
        path.set_location("b").unwrap();
        path.set_location("a").unwrap();
        path.set_location("b").unwrap();
        let list = path.list(&project).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list[0].ends_with('b') && list[1].ends_with('a'));

        path.set_dedup(true).unwrap();
        assert_eq!(path.list(&project).unwrap().len(), 2);
    }

    #[test]
    fn path_lists_accept_both_separators() {
        let sep = MAIN_SEPARATOR.to_string();
        let abs = |n: &str| format!("{sep}{n}");
        assert_eq!(split_path_list("\\a;\\b:/c"), vec![abs("a"), abs("b"), abs("c")]);
        assert_eq!(split_path_list("a;;b:"), vec!["a", "b"]);
        assert!(split_path_list("").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn drive_letters_split_on_unix() {
        assert_eq!(split_path_list("c:/test"), vec!["c", "/test"]);
    }

    #[cfg(windows)]
    #[test]
    fn drive_letters_stay_joined_on_windows() {
        assert_eq!(split_path_list("c:\\test;d:/x"), vec!["c:\\test", "d:\\x"]);
    }

    #[test]
    fn reference_rejects_direct_configuration() {
        let mut path = SearchPath::reference("cp");
        assert!(path.set_location("x").is_err());
        assert!(path.add_location("x").is_err());
    }
}
