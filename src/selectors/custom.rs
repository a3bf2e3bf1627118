use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::SelectError;
use crate::project::Project;

use super::modified::ModifiedSelector;
use super::{Candidate, FileSelector};

/// A `name=value` pair handed to a custom selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `true`, `yes` and `on` (any case) are true; everything else is false.
pub fn to_boolean(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "on")
}

/// A selector that can be instantiated by name and configured with
/// generic parameters.
pub trait ExtendSelector: FileSelector + fmt::Debug {
    /// Receives every parameter before the first evaluation.
    fn set_parameters(&mut self, params: &[Parameter]) -> Result<(), SelectError>;

    /// Called once after a scan has evaluated every candidate.
    fn scan_finished(&self, _project: &Project) {}
}

pub type SelectorFactory = fn() -> Box<dyn ExtendSelector>;

/// Name to factory map for custom selectors.
#[derive(Clone, Default)]
pub struct SelectorRegistry {
    factories: BTreeMap<String, SelectorFactory>,
}

impl fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

fn modified_factory() -> Box<dyn ExtendSelector> {
    Box::new(ModifiedSelector::new())
}

impl SelectorRegistry {
    /// A registry with the built-in `modified` selector.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register("modified", modified_factory);
        registry
    }

    /// Register `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: SelectorFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn ExtendSelector>> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// A selector loaded by name from the project's [`SelectorRegistry`].
///
/// The instance is created and configured on first evaluation and then
/// reused, so stateful selectors keep their state for the lifetime of this
/// value (and its clones).
#[derive(Debug, Clone, Default)]
pub struct CustomSelector {
    classname: Option<String>,
    params: Vec<Parameter>,
    instance: Rc<RefCell<Option<Box<dyn ExtendSelector>>>>,
}

impl CustomSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_classname(&mut self, name: impl Into<String>) {
        self.classname = Some(name.into());
    }

    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push(Parameter::new(name, value));
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn ensure_instance(&self, project: &Project) -> Result<(), SelectError> {
        if self.instance.borrow().is_some() {
            return Ok(());
        }
        let classname = self.classname.as_deref().ok_or_else(|| {
            SelectError::Validation("The classname attribute is required".into())
        })?;
        let mut selector = project.selector_registry().create(classname).ok_or_else(|| {
            SelectError::Validation(format!(
                "Selector {classname} not initialized, no such class"
            ))
        })?;
        selector.set_parameters(&self.params)?;
        debug!(classname, params = self.params.len(), "custom selector created");
        *self.instance.borrow_mut() = Some(selector);
        Ok(())
    }

    pub(crate) fn scan_finished(&self, project: &Project) {
        if let Some(selector) = self.instance.borrow().as_ref() {
            selector.scan_finished(project);
        }
    }
}

impl FileSelector for CustomSelector {
    fn is_selected(&self, project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        self.ensure_instance(project)?;
        match self.instance.borrow().as_ref() {
            Some(selector) => selector.is_selected(project, candidate),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::path::Path;

    #[derive(Debug, Default)]
    struct Suffix {
        suffix: String,
    }

    impl FileSelector for Suffix {
        fn is_selected(&self, _: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
            Ok(candidate.name.ends_with(&self.suffix))
        }
    }

    impl ExtendSelector for Suffix {
        fn set_parameters(&mut self, params: &[Parameter]) -> Result<(), SelectError> {
            for p in params {
                match p.name.as_str() {
                    "suffix" => self.suffix = p.value.clone(),
                    other => {
                        return Err(SelectError::Validation(format!("Invalid parameter {other}")))
                    }
                }
            }
            Ok(())
        }
    }

    fn suffix_factory() -> Box<dyn ExtendSelector> {
        Box::new(Suffix::default())
    }

    fn candidate_check(project: &Project, selector: &CustomSelector, name: &str) -> Result<bool, SelectError> {
        let resource = Resource::from_path(None, name, Path::new("/nonexistent").join(name));
        let candidate = Candidate {
            basedir: Path::new("/nonexistent"),
            name,
            resource: &resource,
        };
        selector.is_selected(project, &candidate)
    }

    #[test]
    fn registered_selector_receives_params() {
        let mut project = Project::new("/nonexistent");
        project.selector_registry_mut().register("suffix", suffix_factory);

        let mut selector = CustomSelector::new();
        selector.set_classname("suffix");
        selector.add_param("suffix", ".rs");

        assert!(candidate_check(&project, &selector, "lib.rs").unwrap());
        assert!(!candidate_check(&project, &selector, "lib.c").unwrap());
    }

    #[test]
    fn missing_and_unknown_classnames_fail_on_use() {
        let project = Project::new("/nonexistent");
        let err = candidate_check(&project, &CustomSelector::new(), "a").unwrap_err();
        assert_eq!(err.to_string(), "The classname attribute is required");

        let mut selector = CustomSelector::new();
        selector.set_classname("nope");
        let err = candidate_check(&project, &selector, "a").unwrap_err();
        assert_eq!(err.to_string(), "Selector nope not initialized, no such class");
    }

    #[test]
    fn booleans_follow_yes_on_true() {
        assert!(to_boolean("Yes"));
        assert!(to_boolean("on"));
        assert!(!to_boolean("1"));
    }
}
