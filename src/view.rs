//! The host-implementable UI adapter.

use crate::tree::DirectoryEntry;
use std::sync::Arc;

/// One tree node handle on the host side.
///
/// The core calls these methods while holding the owning node's lock; a
/// view implementation must not block and must not call back into the
/// tree. Implementations that render on a UI thread should dispatch
/// asynchronously.
pub trait NodeView: Send + Sync {
    /// Insert child views at the given indices, in ascending index order.
    fn insert_subnodes(&self, views: &[(usize, Arc<dyn NodeView>)]);

    /// Bulk-append to a currently empty view.
    fn add_all_subnodes(&self, views: &[Arc<dyn NodeView>]);

    /// Remove child views at the given indices, in the order given
    /// (descending for synchronize diffs).
    fn remove_subnodes(&self, indices: &[usize]);

    /// Remove all child views.
    fn clear(&self);

    fn set_expanded(&self, expanded: bool);

    fn set_leaf(&self, leaf: bool);
}

/// Factory producing one fresh view per tree node.
pub type ViewFactory = Box<dyn Fn(&DirectoryEntry) -> Arc<dyn NodeView> + Send + Sync>;

/// A view that ignores every call, for headless use of the controller.
#[derive(Debug, Default)]
pub struct NullNodeView;

impl NodeView for NullNodeView {
    fn insert_subnodes(&self, _views: &[(usize, Arc<dyn NodeView>)]) {}
    fn add_all_subnodes(&self, _views: &[Arc<dyn NodeView>]) {}
    fn remove_subnodes(&self, _indices: &[usize]) {}
    fn clear(&self) {}
    fn set_expanded(&self, _expanded: bool) {}
    fn set_leaf(&self, _leaf: bool) {}
}

/// A factory producing [`NullNodeView`]s.
pub fn null_view_factory() -> ViewFactory {
    Box::new(|_| -> Arc<dyn NodeView> { Arc::new(NullNodeView) })
}
