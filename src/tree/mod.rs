//! The tree controller core: entries, per-node children, controllers,
//! the directory reader and the watch hub.

mod children;
mod controller;
mod entry;
mod reader;
mod watch;

pub use controller::NodeController;
pub use entry::DirectoryEntry;
pub use watch::WatchHub;

use crate::config::{NameComparator, NodePolicy};
use crate::fsys::FileSystem;
use crate::sorted_list::Comparator;
use crate::view::ViewFactory;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

/// Configuration shared by all nodes of one tree.
pub(crate) struct NodeConfig {
    view_factory: ViewFactory,
    watch_hub: Arc<WatchHub>,
    name_comparator: NameComparator,
    node_policy: Arc<dyn NodePolicy>,
    filesystem: Arc<dyn FileSystem>,
}

impl NodeConfig {
    pub fn new(
        view_factory: ViewFactory,
        watch_hub: Arc<WatchHub>,
        name_comparator: NameComparator,
        node_policy: Arc<dyn NodePolicy>,
        filesystem: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            view_factory,
            watch_hub,
            name_comparator,
            node_policy,
            filesystem,
        }
    }

    pub fn view_factory(&self) -> &ViewFactory {
        &self.view_factory
    }

    pub fn watch_hub(&self) -> &Arc<WatchHub> {
        &self.watch_hub
    }

    pub fn name_comparator(&self) -> &NameComparator {
        &self.name_comparator
    }

    /// The global filesystem this tree exposes; never closed by the tree.
    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.filesystem
    }

    /// The effective policy for a node at `path`.
    pub fn policy_for(&self, path: &Path) -> Arc<dyn NodePolicy> {
        Arc::clone(&self.node_policy).policy_for(path)
    }

    /// Sibling order over entries, induced by the name comparator.
    pub fn entry_comparator(&self) -> Comparator<DirectoryEntry> {
        let names = Arc::clone(&self.name_comparator);
        Arc::new(move |a: &DirectoryEntry, b: &DirectoryEntry| names(a.name(), b.name()))
    }

    /// Compares an entry against a bare name under the sibling order.
    pub fn compare_name(&self, entry: &DirectoryEntry, name: &str) -> Ordering {
        (self.name_comparator)(entry.name(), name)
    }
}
