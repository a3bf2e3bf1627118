//! Reference aliasing and circular-reference protection.
//!
//! Every configurable element is either defined directly or is an alias
//! (`refid`) for an element registered in a [`Project`]. The two are
//! mutually exclusive: setting an attribute on an alias, or turning an
//! element that already has attributes into an alias, fails at that call.
//!
//! Following aliases pushes each id onto a [`RefStack`]; meeting an id that
//! is already on the stack is a circular reference.

use crate::error::SelectError;
use crate::project::{Element, Project};

/// A named alias for an element registered in a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub(crate) fn too_many_attributes() -> SelectError {
    SelectError::Config("You must not specify more than one attribute when using refid".into())
}

pub(crate) fn no_children_allowed() -> SelectError {
    SelectError::Config("You must not specify nested elements when using refid".into())
}

/// Either a directly configured state or an alias.
#[derive(Debug, Clone)]
pub(crate) enum Definition<T> {
    Direct { state: T, touched: bool },
    Reference(Reference),
}

impl<T: Default> Default for Definition<T> {
    fn default() -> Self {
        Self::Direct {
            state: T::default(),
            touched: false,
        }
    }
}

impl<T> Definition<T> {
    pub(crate) fn set_refid(&mut self, id: &str) -> Result<(), SelectError> {
        match self {
            Self::Direct { touched: true, .. } => Err(too_many_attributes()),
            _ => {
                *self = Self::Reference(Reference::new(id));
                Ok(())
            }
        }
    }

    /// State for an attribute setter.
    pub(crate) fn attrs_mut(&mut self) -> Result<&mut T, SelectError> {
        match self {
            Self::Direct { state, touched } => {
                *touched = true;
                Ok(state)
            }
            Self::Reference(_) => Err(too_many_attributes()),
        }
    }

    /// State for adding a nested element.
    pub(crate) fn children_mut(&mut self) -> Result<&mut T, SelectError> {
        match self {
            Self::Direct { state, touched } => {
                *touched = true;
                Ok(state)
            }
            Self::Reference(_) => Err(no_children_allowed()),
        }
    }

    pub(crate) fn direct(&self) -> Option<&T> {
        match self {
            Self::Direct { state, .. } => Some(state),
            Self::Reference(_) => None,
        }
    }

    pub(crate) fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(r) => Some(r),
            Self::Direct { .. } => None,
        }
    }
}

/// The chain of reference ids currently being followed.
#[derive(Debug, Default)]
pub struct RefStack {
    ids: Vec<String>,
}

impl RefStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&mut self, id: &str) -> Result<(), SelectError> {
        if self.ids.iter().any(|seen| seen == id) {
            let mut chain = self.ids.join(" -> ");
            if !chain.is_empty() {
                chain.push_str(" -> ");
            }
            chain.push_str(id);
            return Err(SelectError::CircularReference(chain));
        }
        self.ids.push(id.to_string());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.ids.pop();
    }

    pub fn depth(&self) -> usize {
        self.ids.len()
    }
}

/// An element kind that can be registered in a project and aliased.
pub trait Referenceable: Sized {
    /// The element name used in diagnostics.
    const TYPE_NAME: &'static str;

    /// The alias this element stands for, if it is one.
    fn reference(&self) -> Option<&Reference>;

    /// Downcast a registry entry.
    fn from_element(element: &Element) -> Option<&Self>;

    /// The element name of this particular value.
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    /// Whether an alias declared as `self` may stand for `target`.
    fn accepts(&self, _target: &Self) -> bool {
        true
    }
}

/// Follow `item`'s alias chain to a directly configured element and run
/// `f` on it. The ids of the chain stay on `stack` while `f` runs, so that
/// anything `f` recurses into sees them.
pub(crate) fn with_resolved<'a, T, R, F>(
    item: &'a T,
    project: &'a Project,
    stack: &mut RefStack,
    f: F,
) -> Result<R, SelectError>
where
    T: Referenceable,
    F: FnOnce(&'a T, &mut RefStack) -> Result<R, SelectError>,
{
    let mut current = item;
    let mut entered = 0;

    let resolved = loop {
        let Some(reference) = current.reference() else {
            break Ok(current);
        };
        if let Err(e) = stack.enter(reference.id()) {
            break Err(e);
        }
        entered += 1;
        match project.lookup::<T>(reference.id()) {
            Ok(next) if item.accepts(next) => current = next,
            Ok(_) | Err(SelectError::WrongReferenceType { .. }) => {
                break Err(SelectError::WrongReferenceType {
                    id: reference.id().to_string(),
                    expected: item.type_name(),
                })
            }
            Err(e) => break Err(e),
        }
    };

    let result = resolved.and_then(|target| f(target, stack));
    for _ in 0..entered {
        stack.leave();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct State {
        value: u32,
    }

    #[test]
    fn attributes_then_refid_is_rejected() {
        let mut def: Definition<State> = Definition::default();
        def.attrs_mut().unwrap().value = 3;
        assert!(def.set_refid("other").is_err());
    }

    #[test]
    fn refid_then_attributes_is_rejected() {
        let mut def: Definition<State> = Definition::default();
        def.set_refid("other").unwrap();
        let err = def.attrs_mut().unwrap_err();
        assert!(err.to_string().contains("more than one attribute"));
        let err = def.children_mut().unwrap_err();
        assert!(err.to_string().contains("nested elements"));
    }

    #[test]
    fn untouched_direct_may_become_reference() {
        let mut def: Definition<State> = Definition::default();
        def.set_refid("other").unwrap();
        assert_eq!(def.reference().map(Reference::id), Some("other"));
        assert!(def.direct().is_none());
    }

    #[test]
    fn stack_reports_the_chain() {
        let mut stack = RefStack::new();
        stack.enter("a").unwrap();
        stack.enter("b").unwrap();
        let err = stack.enter("a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "This data type contains a circular reference: a -> b -> a"
        );
        stack.leave();
        assert_eq!(stack.depth(), 1);
    }
}
