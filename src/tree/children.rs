//! Synchronized per-node ownership of the child list, the expansion state
//! machine, and the view wiring.

use super::entry::EntryRole;
use super::{DirectoryEntry, NodeConfig, NodeController};
use crate::config::NodePolicy;
use crate::fsys::FileSystem;
use crate::sorted_list::{ListEvent, SortedDistinctList};
use crate::view::NodeView;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// The expansion state machine of one node.
///
/// `Expanding` is the in-flight state of a user-driven expansion,
/// `Waiting` the in-flight state of a policy- or poll-driven refresh.
/// Both count as "on the way to expanded": a read result is only applied
/// while the state still targets expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpansionState {
    Collapsed,
    Expanding,
    Waiting,
    Expanded,
}

impl ExpansionState {
    /// The state the node is heading for.
    pub fn target(self) -> bool {
        !matches!(self, ExpansionState::Collapsed)
    }
}

pub(crate) struct ChildrenState {
    pub list: SortedDistinctList<DirectoryEntry>,
    pub expansion: ExpansionState,
}

/// Owner of one node's child entries.
///
/// Every mutation and inspection goes through the node's mutex; list
/// events fired during a mutation run under that lock and only reach
/// downward (fresh child controllers, the node's own view), never back up
/// to the parent.
///
/// Ownership points strictly downward: the parent's list owns the child
/// entries, each entry owns its controller, and the controller keeps only
/// copies of its entry's path data. Holding the entry handle itself would
/// close a reference cycle.
pub(crate) struct NodeChildren {
    path: PathBuf,
    display_name: String,
    filesystem: Arc<dyn FileSystem>,
    config: Arc<NodeConfig>,
    policy: Arc<dyn NodePolicy>,
    view: Arc<dyn NodeView>,
    state: Mutex<ChildrenState>,
}

impl NodeChildren {
    pub fn new(entry: &DirectoryEntry, config: Arc<NodeConfig>) -> Self {
        let policy = config.policy_for(entry.path());
        let view = (config.view_factory())(entry);
        let list = SortedDistinctList::new(config.entry_comparator());
        Self {
            path: entry.path().to_path_buf(),
            display_name: entry.display_name().to_string(),
            filesystem: Arc::clone(entry.filesystem()),
            config,
            policy,
            view,
            state: Mutex::new(ChildrenState {
                list,
                expansion: ExpansionState::Collapsed,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.filesystem
    }

    pub fn config(&self) -> &Arc<NodeConfig> {
        &self.config
    }

    pub fn policy(&self) -> &Arc<dyn NodePolicy> {
        &self.policy
    }

    pub fn view(&self) -> Arc<dyn NodeView> {
        Arc::clone(&self.view)
    }

    pub fn lock(&self) -> MutexGuard<'_, ChildrenState> {
        self.state.lock().unwrap()
    }

    pub fn is_expanded(&self) -> bool {
        self.lock().expansion.target()
    }

    /// Binary search by name under the sibling order.
    pub fn find_by_name(&self, name: &str) -> Option<DirectoryEntry> {
        let st = self.lock();
        let index = st
            .list
            .search_by(|entry| self.config.compare_name(entry, name))
            .ok()?;
        st.list.get(index).cloned()
    }

    /// Inserts an entry if the node is still expanded; the insert races a
    /// possible collapse, so the state is checked under the lock.
    pub fn add_if_expanded(&self, entry: DirectoryEntry) -> bool {
        let mut st = self.lock();
        if !st.expansion.target() {
            return false;
        }
        let st = &mut *st;
        st.list.add(entry, &mut |event| self.apply_event(event))
    }

    /// Removes the entry with the given name, if present.
    pub fn remove_named(&self, name: &str) -> bool {
        let mut st = self.lock();
        let st = &mut *st;
        st.list.remove_by(
            |entry| self.config.compare_name(entry, name),
            &mut |event| self.apply_event(event),
        )
    }

    /// Child controllers of subdirectory entries, for recursive walks.
    pub fn subdirectory_controllers(&self) -> Vec<Arc<NodeController>> {
        self.lock()
            .list
            .iter()
            .filter(|entry| entry.role() == EntryRole::Subdirectory)
            .filter_map(|entry| entry.controller())
            .collect()
    }

    /// Applies one list event to the tree: child controllers are created
    /// for arriving entries and forced collapsed for departing ones, and
    /// the view mirrors the change.
    pub fn apply_event(&self, event: ListEvent<DirectoryEntry>) {
        match event {
            ListEvent::Inserted { indices, items } => {
                let mut views = Vec::with_capacity(items.len());
                for (index, entry) in indices.into_iter().zip(items) {
                    let controller = entry.init_controller(&self.config);
                    let view = controller.view();
                    view.set_leaf(controller.is_leaf());
                    views.push((index, view));
                }
                self.view.insert_subnodes(&views);
            }
            ListEvent::BulkAdded { items } => {
                let mut views = Vec::with_capacity(items.len());
                for entry in items {
                    let controller = entry.init_controller(&self.config);
                    let view = controller.view();
                    view.set_leaf(controller.is_leaf());
                    views.push(view);
                }
                self.view.add_all_subnodes(&views);
            }
            ListEvent::Removed { indices, items } => {
                for entry in &items {
                    match entry.controller() {
                        Some(controller) => controller.set_expanded(false),
                        None => tracing::warn!(
                            "removed entry {} has no controller",
                            entry.display_name()
                        ),
                    }
                }
                self.view.remove_subnodes(&indices);
            }
            ListEvent::Cleared { items } => {
                for entry in &items {
                    match entry.controller() {
                        Some(controller) => controller.set_expanded(false),
                        None => tracing::warn!(
                            "cleared entry {} has no controller",
                            entry.display_name()
                        ),
                    }
                }
                self.view.clear();
            }
        }
    }
}
