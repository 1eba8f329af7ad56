//! The public entry point of the tree controller.

use crate::config::Configuration;
use crate::error::TreeViewError;
use crate::fsys::FileSystem;
use crate::tree::{DirectoryEntry, NodeConfig, NodeController, WatchHub};
use crate::view::{NodeView, ViewFactory};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A live, lazily expanded model of a hierarchical filesystem.
///
/// The tree materializes the children of expanded directories, keeps them
/// synchronized with the underlying storage through a single background
/// change notifier, and lets the host drive expansion either through
/// [`FileSystemTreeView::expand_path`] or through UI toggles forwarded via
/// [`DirectoryEntry::handle_expansion`].
///
/// Once [`FileSystemTreeView::close`] has returned, all further operations
/// are undefined.
pub struct FileSystemTreeView {
    root: Arc<NodeController>,
    filesystem: Arc<dyn FileSystem>,
    watch_hub: Arc<WatchHub>,
    selected: Mutex<Option<PathBuf>>,
}

impl FileSystemTreeView {
    /// Builds the tree over the configured filesystem.
    ///
    /// The root node is expanded immediately, so the filesystem roots are
    /// visible from the start. `view_factory` is invoked once per node; it
    /// must produce a fresh view each call.
    pub fn new(configuration: Configuration, view_factory: ViewFactory) -> Self {
        let filesystem = Arc::clone(configuration.filesystem());
        let watch_hub = Arc::new(WatchHub::new(
            configuration.request_watch_service(),
            &filesystem,
        ));
        let node_config = Arc::new(NodeConfig::new(
            view_factory,
            Arc::clone(&watch_hub),
            Arc::clone(configuration.name_comparator()),
            Arc::clone(configuration.node_policy()),
            Arc::clone(&filesystem),
        ));
        let root_entry = DirectoryEntry::filesystem_root(Arc::clone(&filesystem));
        let root = root_entry.init_controller(&node_config);
        root.set_expanded(true);
        root.maybe_start_roots_poll();
        Self {
            root,
            filesystem,
            watch_hub,
            selected: Mutex::new(None),
        }
    }

    /// Expands and optionally selects the given path.
    ///
    /// Returns the deepest reached path, which may be only a prefix of the
    /// request when a component does not exist, or `None` for a `None`
    /// input. With `select`, the selection is set only when the full
    /// requested path was reached; a `None` input with `select` clears the
    /// selection.
    pub fn expand_path(
        &self,
        path: Option<&Path>,
        expand_last_element: bool,
        select: bool,
    ) -> Result<Option<PathBuf>, TreeViewError> {
        let Some(path) = path else {
            if select {
                self.clear_selection();
            }
            return Ok(None);
        };
        if !self.filesystem.owns(path) {
            return Err(TreeViewError::DomainMismatch {
                path: path.to_path_buf(),
            });
        }
        let Some(steps) = self.filesystem.components_of(path) else {
            return Err(TreeViewError::NonAbsolutePath {
                path: path.to_path_buf(),
            });
        };
        // The global root node is expanded; start at the root component.
        let Some(entry) = self.root.find_child_by_name(&steps.root) else {
            return Ok(None);
        };
        let Some(controller) = entry.controller() else {
            return Ok(None);
        };
        let deepest = controller.expand_path(&steps.names, 0, expand_last_element);
        let (reached, consumed) = deepest.unwrap_or((controller, 0));
        let reached_path = reached.path().to_path_buf();
        if select && consumed == steps.names.len() {
            *self.selected.lock().unwrap() = Some(reached_path.clone());
        }
        Ok(Some(reached_path))
    }

    /// Collapses the node at the given path, if it is materialized.
    ///
    /// Clears the selection when the selected path was at or below the
    /// collapsed node. Returns whether a node was found.
    pub fn collapse_path(&self, path: &Path) -> bool {
        let Some(steps) = self.filesystem.components_of(path) else {
            return false;
        };
        let Some(entry) = self.root.find_child_by_name(&steps.root) else {
            return false;
        };
        let Some(mut controller) = entry.controller() else {
            return false;
        };
        for name in &steps.names {
            let Some(child) = controller.find_child_by_name(name) else {
                return false;
            };
            let Some(next) = child.controller() else {
                return false;
            };
            controller = next;
        }
        controller.set_expanded(false);
        let mut selected = self.selected.lock().unwrap();
        if selected.as_deref().is_some_and(|s| s.starts_with(path)) {
            *selected = None;
        }
        true
    }

    /// Clears the current path selection.
    pub fn clear_selection(&self) {
        *self.selected.lock().unwrap() = None;
    }

    /// The currently selected path, if any.
    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected.lock().unwrap().clone()
    }

    pub fn has_selection(&self) -> bool {
        self.selected.lock().unwrap().is_some()
    }

    /// The set of paths currently expanded: the deepest-expanded frontier,
    /// sorted. Re-applying the set through
    /// [`FileSystemTreeView::set_expanded_paths`] reproduces the same
    /// expansion state.
    pub fn expanded_paths(&self) -> BTreeSet<PathBuf> {
        self.root.expanded_paths()
    }

    /// Expands all given paths, without touching the selection.
    pub fn set_expanded_paths<I, P>(&self, paths: I) -> Result<(), TreeViewError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.expand_path(Some(path.as_ref()), false, false)?;
        }
        Ok(())
    }

    /// Triggers a recursive refresh from the root down through all
    /// expanded descendants.
    pub fn update_tree(&self) {
        self.root.update_tree();
    }

    /// True iff the filesystem roots are polled for changes.
    pub fn is_watching_roots(&self) -> bool {
        self.root.is_watching_roots()
    }

    /// The view of the (invisible) global root node, whose children are
    /// the filesystem roots.
    pub fn root_view(&self) -> Arc<dyn NodeView> {
        self.root.view()
    }

    /// The watch hub, exposing availability and membership queries.
    pub fn watch_hub(&self) -> &WatchHub {
        &self.watch_hub
    }

    /// Collapses the whole tree, stops the roots poll, and closes the
    /// watch service. Mounted filesystems that are still open are closed
    /// through the collapse.
    pub fn close(&self) {
        tracing::trace!("closing filesystem tree view");
        self.root.set_expanded(false);
        self.root.stop_roots_poll();
        self.watch_hub.close();
    }
}
