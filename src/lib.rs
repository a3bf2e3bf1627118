//! # pathsel
//!
//! Resource selection for build tools: decide exactly which files,
//! directories and archive entries a build step should touch.
//!
//! pathsel owns the pattern matcher, the selector language, the resource
//! collections (file sets, dir sets, file lists, zip file sets and ordered
//! paths), reference aliasing with cycle detection and the class path
//! ordering policy. It does **not** run tasks, launch processes or render
//! reports; those consume the resources it produces.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pathsel::{FileSet, Project, ResourceCollection, SizeSelector};
//!
//! let mut project = Project::new(".");
//!
//! let mut small = SizeSelector::new();
//! small.set_value(4);
//! small.set_units("Ki")?;
//! small.set_when("less")?;
//!
//! let mut sources = FileSet::new();
//! sources.set_dir("src")?;
//! sources.set_includes("**/*.rs")?;
//! sources.add_selector(small)?;
//! project.add_reference("sources", sources);
//!
//! let sources = project.lookup::<FileSet>("sources")?;
//! for file in sources.resources(&project)? {
//!     println!("{}", file.name);
//! }
//! # Ok::<(), pathsel::SelectError>(())
//! ```
//!
//! # Patterns
//!
//! Names are `/`-separated and relative to the scanned directory. `*`
//! matches within one segment, `?` one character and `**` any number of
//! whole segments; matches are anchored at both ends:
//!
//! ```rust
//! assert!(pathsel::matches("*.txt", "a.txt", true));
//! assert!(!pathsel::matches("*.txt", "dir/a.txt", true));
//! assert!(pathsel::matches("**/*.txt", "dir/a.txt", true));
//! ```
//!
//! # Class paths
//!
//! [`SearchPath`] keeps declaration order and combines with a platform
//! path under one of four [`ClasspathOrder`] policies, overridable with the
//! `build.sysclasspath` project property.

#![forbid(unsafe_code)]

mod archive;
mod builder;
mod cache;
mod collection;
mod config;
mod error;
mod filelist;
mod fileset;
mod mapper;
mod path;
mod pattern;
mod pattern_set;
mod project;
mod reference;
mod resource;
mod scanner;

pub mod selectors;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use archive::{ArchiveScan, ArchiveScanner, ArchiveSet};
pub use builder::ScanBuilder;
pub use cache::CollectionId;
pub use collection::ResourceCollection;
pub use config::{
    ArchiveSetConfig, BuildDescription, FileListConfig, FileSetConfig, MapperConfig,
    NameEntryConfig, ParamConfig, PathConfig, PathElementConfig, PatternFields,
    PatternSetConfig, SelectorConfig, SelectorContainerConfig,
};
pub use error::{ErrorCategory, SelectError};
pub use filelist::FileList;
pub use fileset::{FileSet, SetKind};
pub use mapper::{FileNameMapper, Mapper};
pub use path::{split_path_list, ClasspathOrder, PathElement, SearchPath};
pub use pattern::{matches, normalize_pattern, PatternMatcher, DEEP_TREE_MATCH};
pub use pattern_set::{
    default_excludes, split_patterns, NameEntry, PatternSet, Patterns, DEFAULT_EXCLUDES,
};
pub use project::{Element, Project, BUILD_SYSCLASSPATH};
pub use reference::{RefStack, Reference, Referenceable};
pub use resource::{Resource, ResourceKind};
pub use scanner::{DirectoryScanner, ScanResult, ScanStats};
pub use selectors::{
    Candidate, ContainsSelector, CustomSelector, DateSelector, DependSelector, DepthSelector,
    ExtendSelector, FileSelector, FilenameSelector, Logic, LogicSelector, ModifiedSelector,
    Parameter, PresentSelector, Selector, SelectorContainer, SelectorRegistry, SizeSelector,
    TypeSelector, When,
};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a [`ScanBuilder`] for a one-shot scan of `dir`.
///
/// # Example
///
/// ```rust,no_run
/// let result = pathsel::scan("docs")
///     .includes("**/*.md")
///     .run()?;
/// println!("{} files in {:.3}s", result.included_files.len(), result.stats.duration.as_secs_f64());
/// # Ok::<(), pathsel::SelectError>(())
/// ```
pub fn scan(dir: impl Into<std::path::PathBuf>) -> ScanBuilder {
    ScanBuilder::new(dir)
}
