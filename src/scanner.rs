use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ignore::{DirEntry, WalkBuilder};
use tracing::{debug, trace, warn};

use crate::error::SelectError;
use crate::pattern::PatternMatcher;
use crate::pattern_set::DEFAULT_EXCLUDES;
use crate::project::Project;
use crate::reference::RefStack;
use crate::resource::Resource;
use crate::selectors::{all_selected, Candidate, Selector};

// ---------------------------------------------------------------------------
// ScanResult
// ---------------------------------------------------------------------------

/// The output of a completed directory scan.
///
/// Every entry below the base directory lands in exactly one of the
/// included, not-included, excluded or deselected lists. Names are relative
/// to `basedir`, `/` separated, sorted in walk order; the base directory
/// itself has the empty name.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// The directory that was scanned.
    pub basedir: PathBuf,

    /// Files matched by an include, no exclude, and every selector.
    pub included_files: Vec<Resource>,

    /// Directories matched by an include, no exclude, and every selector.
    pub included_dirs: Vec<Resource>,

    pub not_included_files: Vec<String>,
    pub not_included_dirs: Vec<String>,

    pub excluded_files: Vec<String>,
    pub excluded_dirs: Vec<String>,

    /// Matched by the patterns but rejected by a selector.
    pub deselected_files: Vec<String>,
    pub deselected_dirs: Vec<String>,

    /// Symbolic links that were not followed because following is off.
    pub not_followed_symlinks: Vec<String>,

    /// Recoverable errors met during the walk (permission denied, loops).
    pub errors: Vec<SelectError>,

    /// Scan performance statistics.
    pub stats: ScanStats,
}

impl ScanResult {
    fn empty(basedir: &Path) -> Self {
        Self {
            basedir: basedir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn included_file_names(&self) -> Vec<&str> {
        self.included_files.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn included_dir_names(&self) -> Vec<&str> {
        self.included_dirs.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Performance statistics for a completed scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    /// Total number of files encountered (matched or not).
    pub files: usize,

    /// Total number of directories encountered, the base directory included.
    pub dirs: usize,

    /// Wall-clock time from scan start to completion.
    pub duration: Duration,

    /// Total entries scanned per second, clamped to 0 on zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    pub(crate) fn compute(files: usize, dirs: usize, duration: Duration) -> Self {
        let total = files + dirs;
        let eps = if duration.as_secs_f64() > 0.0 {
            (total as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        Self {
            files,
            dirs,
            duration,
            entries_per_sec: eps,
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryScanner
// ---------------------------------------------------------------------------

/// Walks one directory tree and classifies every entry against include and
/// exclude patterns and a list of selectors.
///
/// An empty include list includes everything. Excludes always win over
/// includes. The built-in default excludes are added unless disabled, and
/// are matched case-insensitively whatever `case_sensitive` says.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    basedir: PathBuf,
    includes: Vec<String>,
    excludes: Vec<String>,
    default_excludes: bool,
    case_sensitive: bool,
    follow_symlinks: bool,
    error_on_missing_dir: bool,
    selectors: Vec<Selector>,
}

impl DirectoryScanner {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            default_excludes: true,
            case_sensitive: true,
            follow_symlinks: true,
            error_on_missing_dir: true,
            selectors: Vec::new(),
        }
    }

    // ── Patterns ──────────────────────────────────────────────────────────

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

    /// Add the built-in default excludes (on by default).
    pub fn default_excludes(mut self, yes: bool) -> Self {
        self.default_excludes = yes;
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Descend into symlinked directories (on by default).
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    /// Fail when the base directory is missing (on by default). When off,
    /// a missing base directory scans as empty.
    pub fn error_on_missing_dir(mut self, yes: bool) -> Self {
        self.error_on_missing_dir = yes;
        self
    }

    pub fn selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn selectors(mut self, selectors: impl IntoIterator<Item = Selector>) -> Self {
        self.selectors.extend(selectors);
        self
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Walk the tree and classify every entry.
    ///
    /// # Errors
    ///
    /// [`SelectError::NotFound`] for a missing base directory (unless
    /// `error_on_missing_dir` is off), [`SelectError::Config`] for a base
    /// path that is not a directory or an uncompilable pattern, and any
    /// error raised by a selector. Walk errors are collected into
    /// [`ScanResult::errors`] instead.
    pub fn scan(&self, project: &Project) -> Result<ScanResult, SelectError> {
        self.scan_with(project, &mut RefStack::new())
    }

    pub(crate) fn scan_with(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<ScanResult, SelectError> {
        let basedir = self.basedir.as_path();
        if !basedir.exists() {
            if self.error_on_missing_dir {
                return Err(SelectError::NotFound(basedir.to_path_buf()));
            }
            debug!(basedir = %basedir.display(), "base directory missing, nothing to scan");
            return Ok(ScanResult::empty(basedir));
        }
        if !basedir.is_dir() {
            return Err(SelectError::Config(format!(
                "{} is not a directory.",
                basedir.display()
            )));
        }

        let matchers = Arc::new(Matchers::new(self)?);
        let pruned = Arc::new(Mutex::new(Vec::<String>::new()));

        let mut builder = WalkBuilder::new(basedir);
        builder
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name(|a, b| a.cmp(b));
        {
            let root = basedir.to_path_buf();
            let matchers = Arc::clone(&matchers);
            let pruned = Arc::clone(&pruned);
            builder.filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let name = relative_name(&root, entry.path());
                if matchers.excludes_subtree(&name) {
                    if let Ok(mut p) = pruned.lock() {
                        p.push(name);
                    }
                    return false;
                }
                true
            });
        }

        let start = Instant::now();
        let mut result = ScanResult::empty(basedir);
        let mut files = 0usize;
        let mut dirs = 0usize;

        for res in builder.build() {
            let entry = match res {
                Ok(e) => e,
                Err(e) => {
                    let err = map_ignore_error(e);
                    warn!(error = %err, "skipping unreadable entry");
                    result.errors.push(err);
                    continue;
                }
            };
            let Some(ft) = entry.file_type() else {
                continue;
            };
            let name = relative_name(basedir, entry.path());

            if ft.is_symlink() && !self.follow_symlinks {
                if entry.path().is_dir() {
                    dirs += 1;
                    result.excluded_dirs.push(name.clone());
                } else {
                    files += 1;
                    result.excluded_files.push(name.clone());
                }
                trace!(name = %name, "symlink not followed");
                result.not_followed_symlinks.push(name);
                continue;
            }

            let is_dir = ft.is_dir() || (ft.is_symlink() && entry.path().is_dir());
            if is_dir {
                dirs += 1;
            } else {
                files += 1;
            }
            self.classify(project, stack, &matchers, &entry, name, is_dir, &mut result)?;
        }

        let pruned = match Arc::try_unwrap(pruned) {
            Ok(m) => m.into_inner().unwrap_or_default(),
            Err(shared) => shared.lock().map(|p| p.clone()).unwrap_or_default(),
        };
        for name in pruned {
            dirs += 1;
            trace!(name = %name, "excluded subtree pruned");
            if matchers.includes.is_match(&name) {
                result.excluded_dirs.push(name);
            } else {
                result.not_included_dirs.push(name);
            }
        }

        for selector in &self.selectors {
            selector.scan_finished(project, stack);
        }

        result.stats = ScanStats::compute(files, dirs, start.elapsed());
        debug!(
            basedir = %basedir.display(),
            files = result.included_files.len(),
            dirs = result.included_dirs.len(),
            excluded = result.excluded_files.len() + result.excluded_dirs.len(),
            deselected = result.deselected_files.len() + result.deselected_dirs.len(),
            elapsed_ms = result.stats.duration.as_millis() as u64,
            "directory scan finished"
        );
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn classify(
        &self,
        project: &Project,
        stack: &mut RefStack,
        matchers: &Matchers,
        entry: &DirEntry,
        name: String,
        is_dir: bool,
        result: &mut ScanResult,
    ) -> Result<(), SelectError> {
        if !matchers.includes.is_match(&name) {
            trace!(name = %name, "not included");
            push_name(result, is_dir, Bucket::NotIncluded, name);
            return Ok(());
        }
        if matchers.is_excluded(&name) {
            trace!(name = %name, "excluded");
            push_name(result, is_dir, Bucket::Excluded, name);
            return Ok(());
        }

        let path = entry.path().to_path_buf();
        let resource = match entry.metadata() {
            Ok(meta) => Resource::from_metadata(Some(&self.basedir), &name, path, &meta),
            Err(_) => Resource::from_path(Some(&self.basedir), &name, path),
        };
        let candidate = Candidate {
            basedir: &self.basedir,
            name: &name,
            resource: &resource,
        };
        if !all_selected(&self.selectors, project, stack, &candidate)? {
            trace!(name = %name, "deselected");
            push_name(result, is_dir, Bucket::Deselected, name);
            return Ok(());
        }

        trace!(name = %name, "included");
        if is_dir {
            result.included_dirs.push(resource);
        } else {
            result.included_files.push(resource);
        }
        Ok(())
    }
}

enum Bucket {
    NotIncluded,
    Excluded,
    Deselected,
}

fn push_name(result: &mut ScanResult, is_dir: bool, bucket: Bucket, name: String) {
    let list = match (bucket, is_dir) {
        (Bucket::NotIncluded, false) => &mut result.not_included_files,
        (Bucket::NotIncluded, true) => &mut result.not_included_dirs,
        (Bucket::Excluded, false) => &mut result.excluded_files,
        (Bucket::Excluded, true) => &mut result.excluded_dirs,
        (Bucket::Deselected, false) => &mut result.deselected_files,
        (Bucket::Deselected, true) => &mut result.deselected_dirs,
    };
    list.push(name);
}

/// Compiled pattern state shared with the walker's entry filter.
#[derive(Debug)]
struct Matchers {
    includes: PatternMatcher,
    excludes: PatternMatcher,
    defaults: Option<PatternMatcher>,
}

impl Matchers {
    fn new(scanner: &DirectoryScanner) -> Result<Self, SelectError> {
        let includes = if scanner.includes.is_empty() {
            PatternMatcher::new(["**"], scanner.case_sensitive)?
        } else {
            PatternMatcher::new(&scanner.includes, scanner.case_sensitive)?
        };
        let excludes = PatternMatcher::new(&scanner.excludes, scanner.case_sensitive)?;
        let defaults = if scanner.default_excludes {
            Some(PatternMatcher::new(DEFAULT_EXCLUDES, false)?)
        } else {
            None
        };
        Ok(Self {
            includes,
            excludes,
            defaults,
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.is_match(name) || self.defaults.as_ref().is_some_and(|d| d.is_match(name))
    }

    fn excludes_subtree(&self, dir: &str) -> bool {
        self.excludes.matches_subtree(dir)
            || self.defaults.as_ref().is_some_and(|d| d.matches_subtree(dir))
    }
}

/// `/`-separated name of `path` relative to `root`; empty for the root.
fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut name = String::new();
    for component in rel.components() {
        if let Component::Normal(seg) = component {
            if !name.is_empty() {
                name.push('/');
            }
            name.push_str(&seg.to_string_lossy());
        }
    }
    name
}

// ---------------------------------------------------------------------------
// Map ignore::Error to SelectError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> SelectError {
    match e {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => SelectError::io(path, io_err),
            ignore::Error::Loop { child, .. } => SelectError::SymlinkLoop(child),
            other => SelectError::Io {
                path,
                source: std::io::Error::other(other.to_string()),
            },
        },
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::Loop { child, .. } => SelectError::SymlinkLoop(child),
        ignore::Error::Io(io_err) => SelectError::io(PathBuf::new(), io_err),
        other => SelectError::Io {
            path: PathBuf::new(),
            source: std::io::Error::other(other.to_string()),
        },
    }
}
