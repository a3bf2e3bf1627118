use std::path::PathBuf;

use crate::error::SelectError;
use crate::pattern_set::split_patterns;
use crate::project::Project;
use crate::scanner::{DirectoryScanner, ScanResult};
use crate::selectors::Selector;

// ---------------------------------------------------------------------------
// ScanBuilder
// ---------------------------------------------------------------------------

/// One-shot directory scan without a build description.
///
/// Created via [`pathsel::scan()`](crate::scan). Configure with chained
/// builder methods, then call [`run()`](ScanBuilder::run) to execute. Each
/// run scans afresh; use a [`FileSet`](crate::FileSet) in a [`Project`]
/// for cached, referenceable scans.
///
/// # Example
///
/// ```rust,no_run
/// let result = pathsel::scan("src")
///     .includes("**/*.rs")
///     .exclude("**/generated/**")
///     .run()?;
///
/// for file in &result.included_files {
///     println!("{}", file.name);
/// }
/// # Ok::<(), pathsel::SelectError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    dir: PathBuf,
    scanner: DirectoryScanner,
}

impl ScanBuilder {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            scanner: DirectoryScanner::new(&dir),
            dir,
        }
    }

    // ── Patterns ──────────────────────────────────────────────────────────

    /// Add one include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.scanner = self.scanner.includes([pattern.into()]);
        self
    }

    /// Add one exclude pattern. Excludes win over includes.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.scanner = self.scanner.excludes([pattern.into()]);
        self
    }

    /// Add every pattern of a comma- or space-separated list.
    pub fn includes(mut self, list: &str) -> Self {
        self.scanner = self.scanner.includes(split_patterns(list));
        self
    }

    pub fn excludes(mut self, list: &str) -> Self {
        self.scanner = self.scanner.excludes(split_patterns(list));
        self
    }

    /// Apply the built-in default excludes. On by default.
    pub fn default_excludes(mut self, yes: bool) -> Self {
        self.scanner = self.scanner.default_excludes(yes);
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.scanner = self.scanner.case_sensitive(yes);
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.scanner = self.scanner.follow_symlinks(yes);
        self
    }

    /// Fail when the directory is missing. On by default; when off a
    /// missing directory scans as empty.
    pub fn error_on_missing_dir(mut self, yes: bool) -> Self {
        self.scanner = self.scanner.error_on_missing_dir(yes);
        self
    }

    /// Add a selector; every selector must accept an entry.
    pub fn selector(mut self, selector: impl Into<Selector>) -> Self {
        self.scanner = self.scanner.selector(selector);
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Walk the directory and classify every entry.
    ///
    /// Selectors are evaluated in a throwaway [`Project`] rooted at the
    /// scanned directory, so relative paths in selector attributes (target
    /// directories, cache files) resolve against it.
    ///
    /// # Errors
    ///
    /// See [`DirectoryScanner::scan`].
    pub fn run(self) -> Result<ScanResult, SelectError> {
        let project = Project::new(self.dir);
        self.scanner.scan(&project)
    }
}
