//! Selectors: configurable predicates over candidate resources.
//!
//! Selectors are configured attribute by attribute in any order and only
//! validated when first evaluated, so a selector missing a required
//! attribute is constructed without complaint and fails on its first
//! [`FileSelector::is_selected`] call.
//!
//! The concrete kinds form one closed sum type, [`Selector`]. Boolean
//! combinators are a [`LogicSelector`] holding child selectors, and
//! selectors loaded by name go through the [`SelectorRegistry`].

mod contains;
mod custom;
mod date;
mod depth;
mod filename;
mod kind;
mod mapping;
mod modified;
mod size;

use std::path::Path;
use std::str::FromStr;

use tracing::warn;

pub use contains::ContainsSelector;
pub use custom::{
    to_boolean, CustomSelector, ExtendSelector, Parameter, SelectorFactory, SelectorRegistry,
};
pub use date::{DateSelector, DEFAULT_DATE_PATTERN};
pub use depth::DepthSelector;
pub use filename::FilenameSelector;
pub use kind::{FileType, TypeSelector};
pub use mapping::{DependSelector, Presence, PresentSelector};
pub use modified::{
    Algorithm, CacheKind, ChecksumAlgorithm, ComparatorKind, DigestAlgorithm, Fingerprint,
    HashValue, LastModified, MemoryCache, ModifiedSelector, PropertiesCache, ValueCache,
};
pub use size::{SizeSelector, Unit};

use crate::error::SelectError;
use crate::project::{Element, Project};
use crate::reference::{with_resolved, Definition, RefStack, Reference, Referenceable};
use crate::resource::Resource;

/// The thing a selector is asked about.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Directory (or archive) the name is relative to.
    pub basedir: &'a Path,

    /// `/`-separated name relative to `basedir`; empty for the root.
    pub name: &'a str,

    pub resource: &'a Resource,
}

/// Decides whether a candidate is selected.
pub trait FileSelector {
    /// # Errors
    ///
    /// [`SelectError::Validation`] when the selector is misconfigured, plus
    /// whatever reading the candidate can raise.
    fn is_selected(&self, project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError>;
}

/// Three-way comparison used by the date and size selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum When {
    /// `less` / `before`
    Less,
    /// `equal`
    #[default]
    Equal,
    /// `more` / `after`
    More,
}

impl FromStr for When {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "less" | "before" => Ok(Self::Less),
            "equal" => Ok(Self::Equal),
            "more" | "after" => Ok(Self::More),
            _ => Err(illegal_value(s)),
        }
    }
}

pub(crate) fn illegal_value(value: &str) -> SelectError {
    SelectError::Config(format!("{value} is not a legal value for this attribute"))
}

/// Filesystem timestamp resolution in milliseconds.
pub fn default_granularity_millis() -> i64 {
    if cfg!(windows) {
        2000
    } else {
        1000
    }
}

/// Depth of a relative name: `0` for the root and top-level entries,
/// one more per directory level.
pub(crate) fn depth_of(name: &str) -> usize {
    name.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .count()
        .saturating_sub(1)
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Selector {
    Date(DateSelector),
    Size(SizeSelector),
    Depth(DepthSelector),
    Contains(ContainsSelector),
    Type(TypeSelector),
    Filename(FilenameSelector),
    Present(PresentSelector),
    Depend(DependSelector),
    Modified(ModifiedSelector),
    Custom(CustomSelector),
    Logic(LogicSelector),
    /// A `<selector refid=..>`: the named container, ANDed.
    Reference(Reference),
}

impl Selector {
    pub fn and(children: Vec<Selector>) -> Self {
        Self::Logic(LogicSelector::with_children(Logic::And, children))
    }

    pub fn or(children: Vec<Selector>) -> Self {
        Self::Logic(LogicSelector::with_children(Logic::Or, children))
    }

    pub fn not(child: Selector) -> Self {
        Self::Logic(LogicSelector::with_children(Logic::Not, vec![child]))
    }

    pub fn none(children: Vec<Selector>) -> Self {
        Self::Logic(LogicSelector::with_children(Logic::None, children))
    }

    pub fn majority(children: Vec<Selector>) -> Self {
        Self::Logic(LogicSelector::with_children(Logic::Majority, children))
    }

    pub fn reference(id: &str) -> Self {
        Self::Reference(Reference::new(id))
    }

    /// Evaluate against one candidate.
    pub fn is_selected(
        &self,
        project: &Project,
        basedir: &Path,
        name: &str,
        resource: &Resource,
    ) -> Result<bool, SelectError> {
        let candidate = Candidate {
            basedir,
            name,
            resource,
        };
        self.evaluate(project, &mut RefStack::new(), &candidate)
    }

    pub(crate) fn evaluate(
        &self,
        project: &Project,
        stack: &mut RefStack,
        candidate: &Candidate<'_>,
    ) -> Result<bool, SelectError> {
        match self {
            Self::Date(s) => s.is_selected(project, candidate),
            Self::Size(s) => s.is_selected(project, candidate),
            Self::Depth(s) => s.is_selected(project, candidate),
            Self::Contains(s) => s.is_selected(project, candidate),
            Self::Type(s) => s.is_selected(project, candidate),
            Self::Filename(s) => s.is_selected(project, candidate),
            Self::Present(s) => s.is_selected(project, candidate),
            Self::Depend(s) => s.is_selected(project, candidate),
            Self::Modified(s) => s.is_selected(project, candidate),
            Self::Custom(s) => s.is_selected(project, candidate),
            Self::Logic(s) => s.evaluate(project, stack, candidate),
            Self::Reference(r) => {
                let container = SelectorContainer::from_reference(r.clone());
                container.accepts(project, stack, candidate)
            }
        }
    }

    /// Called once after a scan has evaluated every candidate. Selectors
    /// with deferred side effects (the modified selector's cache) commit
    /// them here.
    pub(crate) fn scan_finished(&self, project: &Project, stack: &mut RefStack) {
        match self {
            Self::Modified(s) => s.save_cache(),
            Self::Custom(s) => s.scan_finished(project),
            Self::Logic(s) => {
                for child in &s.children {
                    child.scan_finished(project, stack);
                }
            }
            Self::Reference(r) => {
                let container = SelectorContainer::from_reference(r.clone());
                container.scan_finished(project, stack);
            }
            _ => {}
        }
    }
}

macro_rules! selector_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Selector {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

selector_from! {
    Date => DateSelector,
    Size => SizeSelector,
    Depth => DepthSelector,
    Contains => ContainsSelector,
    Type => TypeSelector,
    Filename => FilenameSelector,
    Present => PresentSelector,
    Depend => DependSelector,
    Modified => ModifiedSelector,
    Custom => CustomSelector,
    Logic => LogicSelector,
}

// ---------------------------------------------------------------------------
// Boolean combinators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    Not,
    None,
    Majority,
}

#[derive(Debug, Clone)]
pub struct LogicSelector {
    op: Logic,
    allow_tie: bool,
    children: Vec<Selector>,
}

impl LogicSelector {
    pub fn new(op: Logic) -> Self {
        Self {
            op,
            allow_tie: true,
            children: Vec::new(),
        }
    }

    pub fn with_children(op: Logic, children: Vec<Selector>) -> Self {
        Self {
            children,
            ..Self::new(op)
        }
    }

    pub fn op(&self) -> Logic {
        self.op
    }

    pub fn add_selector(&mut self, selector: impl Into<Selector>) {
        self.children.push(selector.into());
    }

    /// Majority only: result when as many children accept as reject.
    pub fn set_allow_tie(&mut self, allow: bool) {
        self.allow_tie = allow;
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.children
    }

    fn validate(&self) -> Result<(), SelectError> {
        if self.op == Logic::Not && self.children.len() != 1 {
            return Err(SelectError::Validation(
                "One and only one selector is allowed within the <not> tag".into(),
            ));
        }
        Ok(())
    }

    fn evaluate(
        &self,
        project: &Project,
        stack: &mut RefStack,
        candidate: &Candidate<'_>,
    ) -> Result<bool, SelectError> {
        self.validate()?;
        match self.op {
            Logic::And => {
                for child in &self.children {
                    if !child.evaluate(project, stack, candidate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Logic::Or => {
                for child in &self.children {
                    if child.evaluate(project, stack, candidate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Logic::Not => Ok(!self.children[0].evaluate(project, stack, candidate)?),
            Logic::None => {
                for child in &self.children {
                    if child.evaluate(project, stack, candidate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Logic::Majority => {
                let (mut yes, mut no) = (0usize, 0usize);
                for child in &self.children {
                    if child.evaluate(project, stack, candidate)? {
                        yes += 1;
                    } else {
                        no += 1;
                    }
                }
                Ok(match yes.cmp(&no) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => self.allow_tie,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SelectorContainer
// ---------------------------------------------------------------------------

/// A named, referenceable group of selectors that accepts a candidate only
/// when every selector does.
#[derive(Debug, Clone, Default)]
pub struct SelectorContainer {
    def: Definition<Vec<Selector>>,
}

impl SelectorContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_reference(reference: Reference) -> Self {
        Self {
            def: Definition::Reference(reference),
        }
    }

    pub fn set_refid(&mut self, id: &str) -> Result<(), SelectError> {
        self.def.set_refid(id)
    }

    pub fn add_selector(&mut self, selector: impl Into<Selector>) -> Result<(), SelectError> {
        self.def.children_mut()?.push(selector.into());
        Ok(())
    }

    /// The directly held selectors; empty for a reference.
    pub fn selectors(&self) -> &[Selector] {
        self.def.direct().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of selectors after following references.
    pub fn selector_count(&self, project: &Project) -> Result<usize, SelectError> {
        with_resolved(self, project, &mut RefStack::new(), |c, _| {
            Ok(c.selectors().len())
        })
    }

    pub fn is_selected(
        &self,
        project: &Project,
        basedir: &Path,
        name: &str,
        resource: &Resource,
    ) -> Result<bool, SelectError> {
        let candidate = Candidate {
            basedir,
            name,
            resource,
        };
        self.accepts(project, &mut RefStack::new(), &candidate)
    }

    pub(crate) fn accepts(
        &self,
        project: &Project,
        stack: &mut RefStack,
        candidate: &Candidate<'_>,
    ) -> Result<bool, SelectError> {
        with_resolved(self, project, stack, |c, stack| {
            all_selected(c.selectors(), project, stack, candidate)
        })
    }

    pub(crate) fn scan_finished(&self, project: &Project, stack: &mut RefStack) {
        let result = with_resolved(self, project, stack, |c, stack| {
            for s in c.selectors() {
                s.scan_finished(project, stack);
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!(error = %e, "selectors not notified of scan end");
        }
    }
}

impl Referenceable for SelectorContainer {
    const TYPE_NAME: &'static str = "selector";

    fn reference(&self) -> Option<&Reference> {
        self.def.reference()
    }

    fn from_element(element: &Element) -> Option<&Self> {
        match element {
            Element::Selector(s) => Some(s),
            _ => None,
        }
    }
}

/// Implicit AND over a list of selectors.
pub(crate) fn all_selected(
    selectors: &[Selector],
    project: &Project,
    stack: &mut RefStack,
    candidate: &Candidate<'_>,
) -> Result<bool, SelectError> {
    for selector in selectors {
        if !selector.evaluate(project, stack, candidate)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_directory_levels() {
        assert_eq!(depth_of(""), 0);
        assert_eq!(depth_of("."), 0);
        assert_eq!(depth_of("a.txt"), 0);
        assert_eq!(depth_of("tar/a.txt"), 1);
        assert_eq!(depth_of("tar/gz/a.txt"), 2);
    }

    #[test]
    fn scan_end_tolerates_dangling_container() {
        let project = Project::new("/nonexistent");
        let container = SelectorContainer::from_reference(Reference::new("gone"));
        let mut stack = RefStack::new();
        container.scan_finished(&project, &mut stack);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn when_accepts_both_vocabularies() {
        assert_eq!("before".parse::<When>().unwrap(), When::Less);
        assert_eq!("MORE".parse::<When>().unwrap(), When::More);
        assert!("sideways".parse::<When>().is_err());
    }
}
