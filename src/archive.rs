//! Zip archives as a resource source.
//!
//! An archive is read once per scan. Every entry is classified as a file or
//! a directory (directory names lose their trailing `/` before matching)
//! and run through the same [`PatternMatcher`] rules a directory scan uses.
//! Entries are resources without a backing file; their content can still
//! be read through [`Resource::read_content`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{debug, trace};

use crate::cache::{next_generation, CollectionId};
use crate::collection::ResourceCollection;
use crate::error::SelectError;
use crate::pattern::PatternMatcher;
use crate::pattern_set::{NameEntry, PatternSet, Patterns, DEFAULT_EXCLUDES};
use crate::project::{Element, Project};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};
use crate::resource::{Resource, ResourceKind};
use crate::selectors::{all_selected, Candidate, Selector};

// ---------------------------------------------------------------------------
// ArchiveScan
// ---------------------------------------------------------------------------

/// Every entry of an archive, and the subset matched by the patterns and
/// selectors, keyed by entry name.
#[derive(Debug, Default)]
pub struct ArchiveScan {
    pub archive: PathBuf,
    pub all_files: BTreeMap<String, Resource>,
    pub all_dirs: BTreeMap<String, Resource>,
    pub matched_files: BTreeMap<String, Resource>,
    pub matched_dirs: BTreeMap<String, Resource>,
}

impl ArchiveScan {
    pub fn included_file_names(&self) -> Vec<&str> {
        self.matched_files.keys().map(String::as_str).collect()
    }

    pub fn included_dir_names(&self) -> Vec<&str> {
        self.matched_dirs.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// ArchiveScanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArchiveScanner {
    archive: PathBuf,
    includes: Vec<String>,
    excludes: Vec<String>,
    default_excludes: bool,
    case_sensitive: bool,
    selectors: Vec<Selector>,
}

impl ArchiveScanner {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            default_excludes: true,
            case_sensitive: true,
            selectors: Vec::new(),
        }
    }

    pub fn includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn default_excludes(mut self, yes: bool) -> Self {
        self.default_excludes = yes;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn selectors(mut self, selectors: impl IntoIterator<Item = Selector>) -> Self {
        self.selectors.extend(selectors);
        self
    }

    /// Read the archive and classify every entry.
    ///
    /// # Errors
    ///
    /// [`SelectError::NotFound`] for a missing archive and
    /// [`SelectError::Archive`] for one that cannot be read as a zip.
    pub fn scan(&self, project: &Project) -> Result<ArchiveScan, SelectError> {
        self.scan_with(project, &mut RefStack::new())
    }

    pub(crate) fn scan_with(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<ArchiveScan, SelectError> {
        let archive = self.archive.as_path();
        let includes = if self.includes.is_empty() {
            PatternMatcher::new(["**"], self.case_sensitive)?
        } else {
            PatternMatcher::new(&self.includes, self.case_sensitive)?
        };
        let excludes = PatternMatcher::new(&self.excludes, self.case_sensitive)?;
        let defaults = if self.default_excludes {
            Some(PatternMatcher::new(DEFAULT_EXCLUDES, false)?)
        } else {
            None
        };

        let mut scan = ArchiveScan {
            archive: archive.to_path_buf(),
            ..ArchiveScan::default()
        };
        for resource in read_entries(archive)? {
            let name = resource.name.clone();
            let is_dir = resource.is_directory();

            let matched = includes.is_match(&name)
                && !excludes.is_match(&name)
                && !defaults.as_ref().is_some_and(|d| d.is_match(&name))
                && all_selected(
                    &self.selectors,
                    project,
                    stack,
                    &Candidate {
                        basedir: archive,
                        name: &name,
                        resource: &resource,
                    },
                )?;
            trace!(entry = %name, matched, "archive entry");

            let (all, hits) = if is_dir {
                (&mut scan.all_dirs, &mut scan.matched_dirs)
            } else {
                (&mut scan.all_files, &mut scan.matched_files)
            };
            if matched {
                hits.insert(name.clone(), resource.clone());
            }
            all.insert(name, resource);
        }

        for selector in &self.selectors {
            selector.scan_finished(project, stack);
        }

        debug!(
            archive = %archive.display(),
            files = scan.matched_files.len(),
            dirs = scan.matched_dirs.len(),
            entries = scan.all_files.len() + scan.all_dirs.len(),
            "archive scan finished"
        );
        Ok(scan)
    }
}

fn archive_error(path: &Path, e: impl std::fmt::Display) -> SelectError {
    SelectError::Archive {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// One resource per archive entry, in archive order.
fn read_entries(archive: &Path) -> Result<Vec<Resource>, SelectError> {
    let file = File::open(archive).map_err(|e| SelectError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(archive, e))?;

    let mut entries = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i).map_err(|e| archive_error(archive, e))?;
        let is_dir = entry.is_dir();
        let name = entry.name().replace('\\', "/");
        let name = name.trim_end_matches('/');
        if name.is_empty() {
            continue;
        }
        let kind = if is_dir {
            ResourceKind::Dir
        } else {
            ResourceKind::File
        };
        let size = (!is_dir).then(|| entry.size());
        let modified = entry.last_modified().and_then(zip_time);
        entries.push(Resource::archive_entry(archive, name, kind, size, modified));
    }
    Ok(entries)
}

/// Zip timestamps carry no zone; they are read as UTC.
fn zip_time(t: zip::DateTime) -> Option<SystemTime> {
    let naive = NaiveDate::from_ymd_opt(i32::from(t.year()), u32::from(t.month()), u32::from(t.day()))?
        .and_hms_opt(u32::from(t.hour()), u32::from(t.minute()), u32::from(t.second()))?;
    Some(SystemTime::from(Utc.from_utc_datetime(&naive)))
}

// ---------------------------------------------------------------------------
// ArchiveSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ArchiveSetState {
    src: Option<PathBuf>,
    patterns: PatternSet,
    pattern_sets: Vec<PatternSet>,
    selectors: Vec<Selector>,
    default_excludes: bool,
    case_sensitive: bool,
}

impl Default for ArchiveSetState {
    fn default() -> Self {
        Self {
            src: None,
            patterns: PatternSet::new(),
            pattern_sets: Vec::new(),
            selectors: Vec::new(),
            default_excludes: true,
            case_sensitive: true,
        }
    }
}

/// The entries of one zip archive, filtered like a file set
/// (`zipfileset`). Yields the matched file entries; none of them is
/// filesystem-backed.
#[derive(Debug)]
pub struct ArchiveSet {
    id: CollectionId,
    generation: u64,
    def: Definition<ArchiveSetState>,
}

impl Clone for ArchiveSet {
    fn clone(&self) -> Self {
        Self {
            id: CollectionId::next(),
            generation: self.generation,
            def: self.def.clone(),
        }
    }
}

impl Default for ArchiveSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSet {
    pub fn new() -> Self {
        Self {
            id: CollectionId::next(),
            generation: next_generation(),
            def: Definition::default(),
        }
    }

    pub fn reference(id: &str) -> Self {
        Self {
            def: Definition::Reference(Reference::new(id)),
            ..Self::new()
        }
    }

    fn attrs(&mut self) -> Result<&mut ArchiveSetState, SelectError> {
        self.generation = next_generation();
        self.def.attrs_mut()
    }

    fn children(&mut self) -> Result<&mut ArchiveSetState, SelectError> {
        self.generation = next_generation();
        self.def.children_mut()
    }

    pub fn set_refid(&mut self, id: &str) -> Result<(), SelectError> {
        self.generation = next_generation();
        self.def.set_refid(id)
    }

    pub fn set_src(&mut self, archive: impl Into<PathBuf>) -> Result<(), SelectError> {
        self.attrs()?.src = Some(archive.into());
        Ok(())
    }

    pub fn set_includes(&mut self, list: &str) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_includes(list)
    }

    pub fn set_excludes(&mut self, list: &str) -> Result<(), SelectError> {
        self.attrs()?.patterns.set_excludes(list)
    }

    pub fn set_default_excludes(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.default_excludes = yes;
        Ok(())
    }

    pub fn set_case_sensitive(&mut self, yes: bool) -> Result<(), SelectError> {
        self.attrs()?.case_sensitive = yes;
        Ok(())
    }

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

    /// Read the archive, reusing the project's cached scan when nothing has
    /// changed.
    pub fn scan(&self, project: &Project) -> Result<Rc<ArchiveScan>, SelectError> {
        self.scan_with(project, &mut RefStack::new())
    }

    pub(crate) fn scan_with(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Rc<ArchiveScan>, SelectError> {
        with_resolved(self, project, stack, |set, stack| {
            project.cached_archive_scan(set.id, set.generation, || {
                set.scanner(project, stack)?.scan_with(project, stack)
            })
        })
    }

    fn scanner(&self, project: &Project, stack: &mut RefStack) -> Result<ArchiveScanner, SelectError> {
        let state = self.def.direct().cloned().unwrap_or_default();
        let src = state.src.ok_or_else(|| {
            SelectError::Config("The src attribute is required for zipfileset.".into())
        })?;

        let mut patterns: Patterns = state.patterns.patterns(project, stack)?;
        for set in &state.pattern_sets {
            patterns.merge(set.patterns(project, stack)?);
        }

        Ok(ArchiveScanner::new(project.resolve_file(src))
            .includes(patterns.includes)
            .excludes(patterns.excludes)
            .default_excludes(state.default_excludes)
            .case_sensitive(state.case_sensitive)
            .selectors(state.selectors))
    }
}

impl ResourceCollection for ArchiveSet {
    fn collect_resources(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Vec<Resource>, SelectError> {
        let scan = self.scan_with(project, stack)?;
        Ok(scan.matched_files.values().cloned().collect())
    }

    fn filesystem_only(&self, _project: &Project, _stack: &mut RefStack) -> Result<bool, SelectError> {
        Ok(false)
    }
}

impl Referenceable for ArchiveSet {
    const TYPE_NAME: &'static str = "zipfileset";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::ArchiveSet(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_times_are_utc() {
        let t = zip::DateTime::from_date_and_time(2020, 1, 2, 3, 4, 6).unwrap();
        let st = zip_time(t).unwrap();
        let secs = st.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(secs, 1_577_934_246);
    }

    #[test]
    fn missing_src_is_a_configuration_error() {
        let project = Project::new("/nonexistent");
        let err = ArchiveSet::new().scan(&project).unwrap_err();
        assert_eq!(err.to_string(), "The src attribute is required for zipfileset.");
    }
}
