use std::path::Path;

use crate::error::SelectError;
use crate::project::{Element, Project};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};

/// Patterns excluded from every scan unless default excludes are turned off.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // editor and OS temporary files
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    // CVS
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    // SCCS
    "**/SCCS",
    "**/SCCS/**",
    // Visual SourceSafe
    "**/vssver.scc",
    // Subversion
    "**/.svn",
    "**/.svn/**",
    // Git
    "**/.git",
    "**/.git/**",
    "**/.gitattributes",
    "**/.gitignore",
    "**/.gitmodules",
    // Mercurial
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    "**/.hgsub",
    "**/.hgsubstate",
    "**/.hgtags",
    // Bazaar
    "**/.bzr",
    "**/.bzr/**",
    "**/.bzrignore",
    // Mac
    "**/.DS_Store",
];

pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

/// Split a comma- or whitespace-separated pattern list.
pub fn split_patterns(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

/// One include/exclude pattern (or pattern file), optionally conditional
/// on a project property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    name: String,
    if_property: Option<String>,
    unless_property: Option<String>,
}

impl NameEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_property: None,
            unless_property: None,
        }
    }

    /// Only active when `property` is set.
    pub fn with_if(mut self, property: impl Into<String>) -> Self {
        self.if_property = Some(property.into());
        self
    }

    /// Only active when `property` is not set.
    pub fn with_unless(mut self, property: impl Into<String>) -> Self {
        self.unless_property = Some(property.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self, project: &Project) -> bool {
        let if_ok = self
            .if_property
            .as_deref()
            .map_or(true, |p| project.property(p).is_some());
        let unless_ok = self
            .unless_property
            .as_deref()
            .map_or(true, |p| project.property(p).is_none());
        if_ok && unless_ok
    }
}

/// Resolved include and exclude pattern lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patterns {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl Patterns {
    /// Concatenate `other` onto `self`. Duplicates are kept.
    pub fn merge(&mut self, other: Patterns) {
        self.includes.extend(other.includes);
        self.excludes.extend(other.excludes);
    }
}

#[derive(Debug, Clone, Default)]
struct PatternSetState {
    includes: Vec<NameEntry>,
    excludes: Vec<NameEntry>,
    includes_files: Vec<NameEntry>,
    excludes_files: Vec<NameEntry>,
    nested: Vec<PatternSet>,
}

/// Ordered include/exclude glob lists, optionally fed from pattern files.
///
/// An empty include list means "everything". Excludes always win.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    def: Definition<PatternSetState>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pattern set standing for the one registered under `id`.
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

    /// Add every pattern of a comma- or space-separated list.
    pub fn set_includes(&mut self, list: &str) -> Result<(), SelectError> {
        let state = self.def.attrs_mut()?;
        state
            .includes
            .extend(split_patterns(list).map(NameEntry::new));
        Ok(())
    }

    pub fn set_excludes(&mut self, list: &str) -> Result<(), SelectError> {
        let state = self.def.attrs_mut()?;
        state
            .excludes
            .extend(split_patterns(list).map(NameEntry::new));
        Ok(())
    }

    pub fn set_includes_file(&mut self, file: impl Into<String>) -> Result<(), SelectError> {
        self.def.attrs_mut()?.includes_files.push(NameEntry::new(file));
        Ok(())
    }

    pub fn set_excludes_file(&mut self, file: impl Into<String>) -> Result<(), SelectError> {
        self.def.attrs_mut()?.excludes_files.push(NameEntry::new(file));
        Ok(())
    }

    pub fn add_include(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.def.children_mut()?.includes.push(entry);
        Ok(())
    }

    pub fn add_exclude(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.def.children_mut()?.excludes.push(entry);
        Ok(())
    }

    pub fn add_includes_file(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.def.children_mut()?.includes_files.push(entry);
        Ok(())
    }

    pub fn add_excludes_file(&mut self, entry: NameEntry) -> Result<(), SelectError> {
        self.def.children_mut()?.excludes_files.push(entry);
        Ok(())
    }

    pub fn add_pattern_set(&mut self, nested: PatternSet) -> Result<(), SelectError> {
        self.def.children_mut()?.nested.push(nested);
        Ok(())
    }

    /// Copy `other`'s resolved patterns into this set.
    pub fn append(&mut self, other: &PatternSet, project: &Project) -> Result<(), SelectError> {
        let patterns = other.patterns(project, &mut RefStack::new())?;
        let state = self.def.children_mut()?;
        state
            .includes
            .extend(patterns.includes.into_iter().map(NameEntry::new));
        state
            .excludes
            .extend(patterns.excludes.into_iter().map(NameEntry::new));
        Ok(())
    }

    /// Whether any pattern (direct, file-sourced or nested) is configured.
    pub fn has_patterns(&self, project: &Project, stack: &mut RefStack) -> Result<bool, SelectError> {
        with_resolved(self, project, stack, |set, stack| {
            let Some(state) = set.def.direct() else {
                return Ok(false);
            };
            if !state.includes.is_empty()
                || !state.excludes.is_empty()
                || !state.includes_files.is_empty()
                || !state.excludes_files.is_empty()
            {
                return Ok(true);
            }
            for nested in &state.nested {
                if nested.has_patterns(project, stack)? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    /// Resolve the active include and exclude patterns, reading pattern
    /// files and descending into nested sets.
    ///
    /// # Errors
    ///
    /// [`SelectError::NotFound`] when an active pattern file is missing, and
    /// resolution errors for bad references.
    pub fn patterns(&self, project: &Project, stack: &mut RefStack) -> Result<Patterns, SelectError> {
        with_resolved(self, project, stack, |set, stack| {
            let mut out = Patterns::default();
            let Some(state) = set.def.direct() else {
                return Ok(out);
            };

            out.includes.extend(active_names(&state.includes, project));
            for file in state.includes_files.iter().filter(|e| e.is_active(project)) {
                out.includes
                    .extend(read_pattern_file(&project.resolve_file(file.name()), project)?);
            }
            out.excludes.extend(active_names(&state.excludes, project));
            for file in state.excludes_files.iter().filter(|e| e.is_active(project)) {
                out.excludes
                    .extend(read_pattern_file(&project.resolve_file(file.name()), project)?);
            }
            for nested in &state.nested {
                out.merge(nested.patterns(project, stack)?);
            }
            Ok(out)
        })
    }
}

impl Referenceable for PatternSet {
    const TYPE_NAME: &'static str = "patternset";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::PatternSet(p) => Some(p),
            _ => None,
        }
    }
}

fn active_names<'a>(
    entries: &'a [NameEntry],
    project: &'a Project,
) -> impl Iterator<Item = String> + 'a {
    entries
        .iter()
        .filter(|e| e.is_active(project))
        .map(|e| e.name().to_string())
}

/// One pattern per line; lines are trimmed and blank lines skipped.
/// `${name}` is replaced by the project property of that name.
fn read_pattern_file(path: &Path, project: &Project) -> Result<Vec<String>, SelectError> {
    let text = std::fs::read_to_string(path).map_err(|e| SelectError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| project.replace_properties(l))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_commas_and_spaces() {
        let got: Vec<_> = split_patterns("a/**, *.txt  b,,c").collect();
        assert_eq!(got, ["a/**", "*.txt", "b", "c"]);
    }

    #[test]
    fn merge_keeps_duplicates_and_order() {
        let mut a = Patterns {
            includes: vec!["*.rs".into()],
            excludes: vec![],
        };
        a.merge(Patterns {
            includes: vec!["*.rs".into(), "*.md".into()],
            excludes: vec!["x".into()],
        });
        assert_eq!(a.includes, ["*.rs", "*.rs", "*.md"]);
        assert_eq!(a.excludes, ["x"]);
    }

    #[test]
    fn conditional_entries_follow_properties() {
        let mut project = Project::new(".");
        let entry = NameEntry::new("*.java").with_if("with.java");
        assert!(!entry.is_active(&project));
        project.set_property("with.java", "yes");
        assert!(entry.is_active(&project));
        let entry = NameEntry::new("*.java").with_unless("with.java");
        assert!(!entry.is_active(&project));
    }
}
