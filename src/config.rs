//! Declarative build descriptions.
//!
//! A TOML document names pattern sets, file sets, dir sets, file lists, zip
//! file sets, paths and selector groups. [`BuildDescription::into_project`]
//! builds each element through the same setters the programmatic API uses
//! and registers it under its table key, so configuration errors carry the
//! same messages either way.
//!
//! ```toml
//! [properties]
//! src = "src"
//!
//! [filesets.sources]
//! dir = "${src}"
//! includes = ["**/*.rs"]
//! selectors = [{ kind = "size", value = 4, units = "Ki", when = "less" }]
//!
//! [paths.classpath]
//! elements = [{ location = "lib/a.jar" }, { fileset = "sources" }]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::archive::ArchiveSet;
use crate::error::SelectError;
use crate::filelist::FileList;
use crate::fileset::{FileSet, SetKind};
use crate::mapper::Mapper;
use crate::path::{PathElement, SearchPath};
use crate::pattern_set::{NameEntry, PatternSet};
use crate::project::Project;
use crate::selectors::{
    ContainsSelector, CustomSelector, DateSelector, DependSelector, DepthSelector,
    FilenameSelector, Logic, LogicSelector, ModifiedSelector, PresentSelector, Selector,
    SelectorContainer, SizeSelector, TypeSelector,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDescription {
    /// Project base directory, relative to the directory passed to
    /// [`BuildDescription::into_project`].
    #[serde(default)]
    pub basedir: Option<PathBuf>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub patternsets: BTreeMap<String, PatternSetConfig>,
    #[serde(default)]
    pub filesets: BTreeMap<String, FileSetConfig>,
    #[serde(default)]
    pub dirsets: BTreeMap<String, FileSetConfig>,
    #[serde(default)]
    pub filelists: BTreeMap<String, FileListConfig>,
    #[serde(default)]
    pub zipfilesets: BTreeMap<String, ArchiveSetConfig>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathConfig>,
    #[serde(default)]
    pub selectors: BTreeMap<String, SelectorContainerConfig>,
}

impl BuildDescription {
    pub fn from_toml_str(text: &str) -> Result<Self, SelectError> {
        toml::from_str(text).map_err(|e| SelectError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SelectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SelectError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Build a project rooted at `dir` (or at `basedir` relative to it)
    /// holding every described element.
    ///
    /// Properties are set before anything else so `${name}` expansion in
    /// directory attributes sees them.
    pub fn into_project(self, dir: impl Into<PathBuf>) -> Result<Project, SelectError> {
        let dir = dir.into();
        let basedir = match &self.basedir {
            Some(b) if b.is_absolute() => b.clone(),
            Some(b) => dir.join(b),
            None => dir,
        };
        let mut project = Project::new(basedir);
        for (name, value) in &self.properties {
            project.set_property(name, value);
        }

        for (id, config) in &self.patternsets {
            let set = config.build(&project)?;
            project.add_reference(id, set);
        }
        for (id, config) in &self.filesets {
            let set = config.build(SetKind::Files, &project)?;
            project.add_reference(id, set);
        }
        for (id, config) in &self.dirsets {
            let set = config.build(SetKind::Dirs, &project)?;
            project.add_reference(id, set);
        }
        for (id, config) in &self.filelists {
            let list = config.build(&project)?;
            project.add_reference(id, list);
        }
        for (id, config) in &self.zipfilesets {
            let set = config.build(&project)?;
            project.add_reference(id, set);
        }
        for (id, config) in &self.paths {
            let path = config.build(&project)?;
            project.add_reference(id, path);
        }
        for (id, config) in &self.selectors {
            let container = config.build()?;
            project.add_reference(id, container);
        }
        Ok(project)
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// An include or exclude that may depend on a property.
#[derive(Debug, Clone, Deserialize)]
pub struct NameEntryConfig {
    pub name: String,
    #[serde(default, rename = "if")]
    pub if_property: Option<String>,
    #[serde(default)]
    pub unless: Option<String>,
}

impl NameEntryConfig {
    fn entry(&self) -> NameEntry {
        let mut entry = NameEntry::new(&self.name);
        if let Some(p) = &self.if_property {
            entry = entry.with_if(p);
        }
        if let Some(p) = &self.unless {
            entry = entry.with_unless(p);
        }
        entry
    }
}

/// Pattern attributes shared by pattern sets, file sets and zip file sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternFields {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub includes_file: Option<String>,
    #[serde(default)]
    pub excludes_file: Option<String>,
    #[serde(default)]
    pub include: Vec<NameEntryConfig>,
    #[serde(default)]
    pub exclude: Vec<NameEntryConfig>,
    /// Ids of pattern sets to nest.
    #[serde(default)]
    pub patternsets: Vec<String>,
}

impl PatternFields {
    fn is_empty(&self) -> bool {
        self.includes.is_empty()
            && self.excludes.is_empty()
            && self.includes_file.is_none()
            && self.excludes_file.is_none()
            && self.include.is_empty()
            && self.exclude.is_empty()
            && self.patternsets.is_empty()
    }

    fn apply(&self, set: &mut PatternSet, project: &Project) -> Result<(), SelectError> {
        for list in &self.includes {
            set.set_includes(&project.replace_properties(list))?;
        }
        for list in &self.excludes {
            set.set_excludes(&project.replace_properties(list))?;
        }
        if let Some(file) = &self.includes_file {
            set.set_includes_file(project.replace_properties(file))?;
        }
        if let Some(file) = &self.excludes_file {
            set.set_excludes_file(project.replace_properties(file))?;
        }
        for entry in &self.include {
            set.add_include(entry.entry())?;
        }
        for entry in &self.exclude {
            set.add_exclude(entry.entry())?;
        }
        for id in &self.patternsets {
            set.add_pattern_set(PatternSet::reference(id))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternSetConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(flatten)]
    pub patterns: PatternFields,
}

impl PatternSetConfig {
    fn build(&self, project: &Project) -> Result<PatternSet, SelectError> {
        let mut set = PatternSet::new();
        if let Some(id) = &self.refid {
            set.set_refid(id)?;
        }
        self.patterns.apply(&mut set, project)?;
        Ok(set)
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSetConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(flatten)]
    pub patterns: PatternFields,
    #[serde(default)]
    pub default_excludes: Option<bool>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub follow_symlinks: Option<bool>,
    #[serde(default)]
    pub error_on_missing_dir: Option<bool>,
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
}

impl FileSetConfig {
    fn build(&self, kind: SetKind, project: &Project) -> Result<FileSet, SelectError> {
        let mut set = FileSet::with_kind(kind);
        if let Some(id) = &self.refid {
            set.set_refid(id)?;
        }
        if let Some(dir) = &self.dir {
            set.set_dir(project.replace_properties(dir))?;
        }
        if let Some(file) = &self.file {
            set.set_file(project.replace_properties(file))?;
        }

        if !self.patterns.is_empty() {
            let mut patterns = PatternSet::new();
            self.patterns.apply(&mut patterns, project)?;
            set.add_pattern_set(patterns)?;
        }

        if let Some(yes) = self.default_excludes {
            set.set_default_excludes(yes)?;
        }
        if let Some(yes) = self.case_sensitive {
            set.set_case_sensitive(yes)?;
        }
        if let Some(yes) = self.follow_symlinks {
            set.set_follow_symlinks(yes)?;
        }
        if let Some(yes) = self.error_on_missing_dir {
            set.set_error_on_missing_dir(yes)?;
        }
        for selector in &self.selectors {
            set.add_selector(selector.build()?)?;
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileListConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl FileListConfig {
    fn build(&self, project: &Project) -> Result<FileList, SelectError> {
        let mut list = FileList::new();
        if let Some(id) = &self.refid {
            list.set_refid(id)?;
        }
        if let Some(dir) = &self.dir {
            list.set_dir(project.replace_properties(dir))?;
        }
        for files in &self.files {
            list.set_files(&project.replace_properties(files))?;
        }
        Ok(list)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveSetConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(flatten)]
    pub patterns: PatternFields,
    #[serde(default)]
    pub default_excludes: Option<bool>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
}

impl ArchiveSetConfig {
    fn build(&self, project: &Project) -> Result<ArchiveSet, SelectError> {
        let mut set = ArchiveSet::new();
        if let Some(id) = &self.refid {
            set.set_refid(id)?;
        }
        if let Some(src) = &self.src {
            set.set_src(project.replace_properties(src))?;
        }
        if !self.patterns.is_empty() {
            let mut patterns = PatternSet::new();
            self.patterns.apply(&mut patterns, project)?;
            set.add_pattern_set(patterns)?;
        }
        if let Some(yes) = self.default_excludes {
            set.set_default_excludes(yes)?;
        }
        if let Some(yes) = self.case_sensitive {
            set.set_case_sensitive(yes)?;
        }
        for selector in &self.selectors {
            set.add_selector(selector.build()?)?;
        }
        Ok(set)
    }
}

/// One path element. Collections are referenced by id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathElementConfig {
    Location(String),
    /// A platform-separated list of locations.
    PathList(String),
    FileSet(String),
    DirSet(String),
    FileList(String),
    ZipFileSet(String),
    Path(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub dedup: Option<bool>,
    #[serde(default)]
    pub elements: Vec<PathElementConfig>,
}

impl PathConfig {
    fn build(&self, project: &Project) -> Result<SearchPath, SelectError> {
        let mut path = SearchPath::new();
        if let Some(id) = &self.refid {
            path.set_refid(id)?;
        }
        if let Some(location) = &self.location {
            path.set_location(project.replace_properties(location))?;
        }
        if let Some(list) = &self.path {
            path.set_path(list.clone())?;
        }
        if let Some(yes) = self.dedup {
            path.set_dedup(yes)?;
        }
        for element in &self.elements {
            let element = match element {
                PathElementConfig::Location(l) => {
                    PathElement::Location(project.replace_properties(l).into())
                }
                PathElementConfig::PathList(l) => PathElement::PathList(l.clone()),
                PathElementConfig::FileSet(id) => {
                    PathElement::FileSet(FileSet::reference(SetKind::Files, id))
                }
                PathElementConfig::DirSet(id) => {
                    PathElement::FileSet(FileSet::reference(SetKind::Dirs, id))
                }
                PathElementConfig::FileList(id) => PathElement::FileList(FileList::reference(id)),
                PathElementConfig::ZipFileSet(id) => {
                    PathElement::ArchiveSet(ArchiveSet::reference(id))
                }
                PathElementConfig::Path(id) => PathElement::Path(SearchPath::reference(id)),
            };
            path.add_element(element)?;
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorContainerConfig {
    #[serde(default)]
    pub refid: Option<String>,
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
}

impl SelectorContainerConfig {
    fn build(&self) -> Result<SelectorContainer, SelectError> {
        let mut container = SelectorContainer::new();
        if let Some(id) = &self.refid {
            container.set_refid(id)?;
        }
        for selector in &self.selectors {
            container.add_selector(selector.build()?)?;
        }
        Ok(container)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapperConfig {
    Identity,
    Flatten,
    Glob { from: String, to: String },
    Merge { to: String },
}

impl MapperConfig {
    fn build(&self) -> Mapper {
        match self {
            Self::Identity => Mapper::Identity,
            Self::Flatten => Mapper::Flatten,
            Self::Glob { from, to } => Mapper::glob(from, to),
            Self::Merge { to } => Mapper::merge(to),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    pub value: String,
}

/// One selector, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectorConfig {
    Date {
        #[serde(default)]
        millis: Option<i64>,
        #[serde(default)]
        datetime: Option<String>,
        #[serde(default)]
        pattern: Option<String>,
        #[serde(default)]
        when: Option<String>,
        #[serde(default)]
        granularity: Option<i64>,
        #[serde(default)]
        check_dirs: Option<bool>,
    },
    Size {
        #[serde(default)]
        value: Option<i64>,
        #[serde(default)]
        units: Option<String>,
        #[serde(default)]
        when: Option<String>,
    },
    Depth {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    Contains {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        case_sensitive: Option<bool>,
        #[serde(default)]
        ignore_whitespace: Option<bool>,
        #[serde(default)]
        skip_directories: Option<bool>,
    },
    Type {
        #[serde(default, rename = "type")]
        file_type: Option<String>,
    },
    Filename {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        case_sensitive: Option<bool>,
        #[serde(default)]
        negate: Option<bool>,
    },
    Present {
        #[serde(default)]
        target_dir: Option<PathBuf>,
        #[serde(default)]
        present: Option<String>,
        #[serde(default)]
        mappers: Vec<MapperConfig>,
    },
    Depend {
        #[serde(default)]
        target_dir: Option<PathBuf>,
        #[serde(default)]
        granularity: Option<i64>,
        #[serde(default)]
        mappers: Vec<MapperConfig>,
    },
    Modified {
        #[serde(default)]
        cache: Option<String>,
        #[serde(default)]
        cache_file: Option<PathBuf>,
        #[serde(default)]
        algorithm: Option<String>,
        #[serde(default)]
        digest: Option<String>,
        #[serde(default)]
        checksum: Option<String>,
        #[serde(default)]
        comparator: Option<String>,
        #[serde(default)]
        update: Option<bool>,
        #[serde(default)]
        select_dirs: Option<bool>,
        #[serde(default)]
        delay_update: Option<bool>,
        #[serde(default)]
        params: Vec<ParamConfig>,
    },
    Custom {
        #[serde(default)]
        classname: Option<String>,
        #[serde(default)]
        params: Vec<ParamConfig>,
    },
    And {
        #[serde(default)]
        selectors: Vec<SelectorConfig>,
    },
    Or {
        #[serde(default)]
        selectors: Vec<SelectorConfig>,
    },
    Not {
        #[serde(default)]
        selectors: Vec<SelectorConfig>,
    },
    #[serde(rename = "none")]
    NoneOf {
        #[serde(default)]
        selectors: Vec<SelectorConfig>,
    },
    Majority {
        #[serde(default)]
        selectors: Vec<SelectorConfig>,
        #[serde(default)]
        allow_tie: Option<bool>,
    },
    /// A reference to a named selector group.
    Selector { refid: String },
}

fn logic(op: Logic, children: &[SelectorConfig]) -> Result<LogicSelector, SelectError> {
    let mut selector = LogicSelector::new(op);
    for child in children {
        selector.add_selector(child.build()?);
    }
    Ok(selector)
}

impl SelectorConfig {
    pub fn build(&self) -> Result<Selector, SelectError> {
        let selector = match self {
            Self::Date {
                millis,
                datetime,
                pattern,
                when,
                granularity,
                check_dirs,
            } => {
                let mut s = DateSelector::new();
                if let Some(m) = millis {
                    s.set_millis(*m);
                }
                if let Some(d) = datetime {
                    s.set_datetime(d);
                }
                if let Some(p) = pattern {
                    s.set_pattern(p);
                }
                if let Some(w) = when {
                    s.set_when(w)?;
                }
                if let Some(g) = granularity {
                    s.set_granularity(*g);
                }
                if let Some(c) = check_dirs {
                    s.set_check_dirs(*c);
                }
                s.into()
            }
            Self::Size { value, units, when } => {
                let mut s = SizeSelector::new();
                if let Some(v) = value {
                    s.set_value(*v);
                }
                if let Some(u) = units {
                    s.set_units(u)?;
                }
                if let Some(w) = when {
                    s.set_when(w)?;
                }
                s.into()
            }
            Self::Depth { min, max } => {
                let mut s = DepthSelector::new();
                if let Some(m) = min {
                    s.set_min(*m);
                }
                if let Some(m) = max {
                    s.set_max(*m);
                }
                s.into()
            }
            Self::Contains {
                text,
                case_sensitive,
                ignore_whitespace,
                skip_directories,
            } => {
                let mut s = ContainsSelector::new();
                if let Some(t) = text {
                    s.set_text(t);
                }
                if let Some(c) = case_sensitive {
                    s.set_case_sensitive(*c);
                }
                if let Some(i) = ignore_whitespace {
                    s.set_ignore_whitespace(*i);
                }
                if let Some(d) = skip_directories {
                    s.set_skip_directories(*d);
                }
                s.into()
            }
            Self::Type { file_type } => {
                let mut s = TypeSelector::new();
                if let Some(t) = file_type {
                    s.set_type(t)?;
                }
                s.into()
            }
            Self::Filename {
                name,
                case_sensitive,
                negate,
            } => {
                let mut s = FilenameSelector::new();
                if let Some(n) = name {
                    s.set_name(n);
                }
                if let Some(c) = case_sensitive {
                    s.set_case_sensitive(*c);
                }
                if let Some(n) = negate {
                    s.set_negate(*n);
                }
                s.into()
            }
            Self::Present {
                target_dir,
                present,
                mappers,
            } => {
                let mut s = PresentSelector::new();
                if let Some(d) = target_dir {
                    s.set_target_dir(d);
                }
                if let Some(p) = present {
                    s.set_present(p)?;
                }
                for m in mappers {
                    s.add_mapper(m.build());
                }
                s.into()
            }
            Self::Depend {
                target_dir,
                granularity,
                mappers,
            } => {
                let mut s = DependSelector::new();
                if let Some(d) = target_dir {
                    s.set_target_dir(d);
                }
                if let Some(g) = granularity {
                    s.set_granularity(*g);
                }
                for m in mappers {
                    s.add_mapper(m.build());
                }
                s.into()
            }
            Self::Modified {
                cache,
                cache_file,
                algorithm,
                digest,
                checksum,
                comparator,
                update,
                select_dirs,
                delay_update,
                params,
            } => {
                let mut s = ModifiedSelector::new();
                if let Some(c) = cache {
                    s.set_cache(c)?;
                }
                if let Some(f) = cache_file {
                    s.set_cache_file(f);
                }
                if let Some(a) = algorithm {
                    s.set_algorithm(a)?;
                }
                if let Some(d) = digest {
                    s.set_digest(d)?;
                }
                if let Some(c) = checksum {
                    s.set_checksum(c)?;
                }
                if let Some(c) = comparator {
                    s.set_comparator(c)?;
                }
                if let Some(u) = update {
                    s.set_update(*u);
                }
                if let Some(d) = select_dirs {
                    s.set_select_dirs(*d);
                }
                if let Some(d) = delay_update {
                    s.set_delay_update(*d);
                }
                for p in params {
                    s.add_param(&p.name, &p.value);
                }
                s.into()
            }
            Self::Custom { classname, params } => {
                let mut s = CustomSelector::new();
                if let Some(c) = classname {
                    s.set_classname(c);
                }
                for p in params {
                    s.add_param(&p.name, &p.value);
                }
                s.into()
            }
            Self::And { selectors } => logic(Logic::And, selectors)?.into(),
            Self::Or { selectors } => logic(Logic::Or, selectors)?.into(),
            Self::Not { selectors } => logic(Logic::Not, selectors)?.into(),
            Self::NoneOf { selectors } => logic(Logic::None, selectors)?.into(),
            Self::Majority {
                selectors,
                allow_tie,
            } => {
                let mut s = logic(Logic::Majority, selectors)?;
                if let Some(t) = allow_tie {
                    s.set_allow_tie(*t);
                }
                s.into()
            }
            Self::Selector { refid } => Selector::reference(refid),
        };
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let desc = BuildDescription::from_toml_str(
            r#"
            [properties]
            lib = "lib"

            [patternsets.rust]
            includes = ["**/*.rs"]
            include = [{ name = "**/*.toml", if = "with.toml" }]

            [filesets.src]
            dir = "src"
            patternsets = ["rust"]
            selectors = [
                { kind = "depth", max = 2 },
                { kind = "not", selectors = [{ kind = "filename", name = "**/gen/**" }] },
            ]

            [dirsets.pkgs]
            dir = "src"

            [filelists.jars]
            dir = "${lib}"
            files = ["a.jar", "b.jar"]

            [zipfilesets.bundle]
            src = "bundle.zip"
            excludes = ["META-INF/**"]

            [paths.cp]
            elements = [{ location = "classes" }, { filelist = "jars" }, { path = "more" }]

            [selectors.small]
            selectors = [{ kind = "size", value = 4, units = "Ki", when = "less" }]
            "#,
        )
        .unwrap();

        assert_eq!(desc.filesets["src"].selectors.len(), 2);
        assert_eq!(desc.paths["cp"].elements.len(), 3);

        let project = desc.into_project("/work").unwrap();
        assert!(project.has_reference("rust"));
        assert!(project.has_reference("pkgs"));
        assert_eq!(project.reference("pkgs").unwrap().type_name(), "dirset");
        assert_eq!(project.reference("bundle").unwrap().type_name(), "zipfileset");
    }

    #[test]
    fn modified_selector_algorithms() {
        let desc = BuildDescription::from_toml_str(
            r#"
            [filesets.crc]
            dir = "src"
            selectors = [{ kind = "modified", cache = "memory", algorithm = "checksum", checksum = "adler" }]

            [filesets.stamp]
            dir = "src"
            selectors = [{ kind = "modified", cache = "memory", algorithm = "lastmodified" }]
            "#,
        )
        .unwrap();
        assert!(desc.into_project("/work").is_ok());

        let desc = BuildDescription::from_toml_str(
            r#"
            [filesets.crc]
            dir = "src"
            selectors = [{ kind = "modified", algorithm = "checksum", checksum = "md5" }]
            "#,
        )
        .unwrap();
        assert!(desc.into_project("/work").is_err());
    }

    #[test]
    fn unknown_top_level_key_is_a_parse_error() {
        let err = BuildDescription::from_toml_str("[targets.build]\n").unwrap_err();
        assert!(matches!(err, SelectError::Parse(_)));
    }

    #[test]
    fn refid_with_attributes_keeps_the_setter_message() {
        let desc = BuildDescription::from_toml_str(
            r#"
            [filesets.a]
            refid = "b"
            dir = "src"
            "#,
        )
        .unwrap();
        let err = desc.into_project("/work").unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must not specify more than one attribute when using refid"
        );
    }

    #[test]
    fn invalid_enumerated_value_fails_while_building() {
        let desc = BuildDescription::from_toml_str(
            r#"
            [selectors.s]
            selectors = [{ kind = "size", value = 1, units = "Q" }]
            "#,
        )
        .unwrap();
        assert!(desc.into_project("/work").is_err());
    }
}
