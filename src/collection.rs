use crate::error::SelectError;
use crate::project::Project;
use crate::reference::RefStack;
use crate::resource::Resource;

/// Anything that resolves to a sequence of [`Resource`]s.
///
/// Implemented by [`FileSet`](crate::FileSet) (files or directories of a
/// scan), [`FileList`](crate::FileList), [`ArchiveSet`](crate::ArchiveSet)
/// and [`SearchPath`](crate::SearchPath). Scanned collections are unordered
/// sets in walk order; a path is an ordered sequence in declaration order.
///
/// # Reference resolution
///
/// Collections may be aliases for elements registered in the [`Project`].
/// The required methods take the [`RefStack`] of the traversal in
/// progress so that a collection nested (directly or transitively) inside
/// itself is reported as a circular reference rather than recursing
/// forever. The plain methods start a fresh traversal.
pub trait ResourceCollection {
    /// Resolve the resources, following references on `stack`.
    fn collect_resources(
        &self,
        project: &Project,
        stack: &mut RefStack,
    ) -> Result<Vec<Resource>, SelectError>;

    /// Whether every transitively contained resource is backed by a file,
    /// following references on `stack`.
    fn filesystem_only(&self, project: &Project, stack: &mut RefStack) -> Result<bool, SelectError>;

    fn resources(&self, project: &Project) -> Result<Vec<Resource>, SelectError> {
        self.collect_resources(project, &mut RefStack::new())
    }

    fn is_filesystem_only(&self, project: &Project) -> Result<bool, SelectError> {
        self.filesystem_only(project, &mut RefStack::new())
    }

    /// Number of resources.
    fn size(&self, project: &Project) -> Result<usize, SelectError> {
        Ok(self.resources(project)?.len())
    }
}
