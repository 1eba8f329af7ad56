//! Per-node controllers: how a node reads its children, what happens on
//! expand and collapse, and how it reacts to change events.

use super::children::{ChildrenState, ExpansionState, NodeChildren};
use super::entry::EntryRole;
use super::reader::{path_to_entry, DirectoryReader};
use super::{DirectoryEntry, NodeConfig};
use crate::fsys::{FileSystem, WatchEvent};
use crate::view::NodeView;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Fixed delay of the filesystem roots poll.
const ROOTS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The name of the trivial single root a filesystem may expose.
const TRIVIAL_ROOT: &str = "/";

enum ControllerKind {
    /// The global root enumerating filesystem roots; may run a periodic
    /// roots poll on hosts whose roots can change.
    RootDirectories { poll: Mutex<Option<RootsPoll>> },
    /// An ordinary directory, kept live through the watch hub.
    Directory,
    /// A regular file that mounts a child filesystem on expansion. A
    /// mount exposing exactly the trivial root `/` is skipped: the node's
    /// visible children are that root's contents.
    MountPoint {
        mount: Mutex<Option<Arc<dyn FileSystem>>>,
    },
}

/// The controller of one tree node. Created when the parent's child list
/// gains the corresponding entry, destroyed when the entry is removed or
/// the parent collapses.
pub struct NodeController {
    children: NodeChildren,
    kind: ControllerKind,
}

impl NodeController {
    pub(crate) fn create(entry: &DirectoryEntry, config: Arc<NodeConfig>) -> Arc<Self> {
        let kind = match entry.role() {
            EntryRole::FilesystemRoot => ControllerKind::RootDirectories {
                poll: Mutex::new(None),
            },
            EntryRole::Subdirectory => ControllerKind::Directory,
            EntryRole::RegularFile => ControllerKind::MountPoint {
                mount: Mutex::new(None),
            },
        };
        let controller = Arc::new(Self {
            children: NodeChildren::new(entry, config),
            kind,
        });
        if controller.children.policy().is_requesting_update_notifier() {
            let weak = Arc::downgrade(&controller);
            controller
                .children
                .policy()
                .set_update_notifier(Box::new(move || {
                    if let Some(controller) = weak.upgrade() {
                        controller.update_directory();
                    }
                }));
        }
        controller
    }

    /// The node's absolute path within its owning filesystem.
    pub fn path(&self) -> &Path {
        self.children.path()
    }

    /// The view adapter of this node.
    pub fn view(&self) -> Arc<dyn NodeView> {
        self.children.view()
    }

    /// Whether the policy declares this node a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children
            .policy()
            .is_leaf_node(self.children.path())
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_expanded()
    }

    /// Drives the expansion state machine.
    ///
    /// Expanding reads the children and wires the change notification;
    /// collapsing tears the watch registration down, recursively collapses
    /// all descendants and closes a mounted filesystem. Both directions
    /// run under the node lock. Leaves never expand.
    pub fn set_expanded(self: &Arc<Self>, expanded: bool) {
        let want = expanded && !self.is_leaf();
        let mut st = self.children.lock();
        if st.expansion.target() == want {
            return;
        }
        if want {
            tracing::trace!("expanding node {}", self.children.display_name());
            st.expansion = ExpansionState::Expanding;
            self.children.view().set_expanded(true);
            self.read_children(&mut st);
            st.expansion = ExpansionState::Expanded;
        } else {
            tracing::trace!("collapsing node {}", self.children.display_name());
            self.on_collapse();
            self.clear_children(&mut st);
            self.children.view().set_expanded(false);
            st.expansion = ExpansionState::Collapsed;
        }
    }

    /// Re-reads this node if it is expanded; a node the policy now calls
    /// a leaf is forced to an empty child set instead.
    pub(crate) fn update_directory(self: &Arc<Self>) {
        let mut st = self.children.lock();
        if !st.expansion.target() {
            return;
        }
        tracing::trace!("updating directory {}", self.children.path().display());
        if self.is_leaf() {
            self.clear_children(&mut st);
        } else {
            st.expansion = ExpansionState::Waiting;
            self.read_children(&mut st);
            st.expansion = ExpansionState::Expanded;
        }
    }

    /// Re-reads this node and recursively all expanded descendants.
    pub fn update_tree(self: &Arc<Self>) {
        if !self.is_expanded() {
            return;
        }
        self.update_directory();
        for controller in self.children.subdirectory_controllers() {
            controller.update_tree();
        }
    }

    /// O(log n) lookup of a child entry by name.
    pub fn find_child_by_name(&self, name: &str) -> Option<DirectoryEntry> {
        self.children.find_by_name(name)
    }

    /// Descends one path component per recursion step, expanding along the
    /// way, and returns the deepest reached controller together with the
    /// number of consumed components. `None` means no component at or
    /// below `index` could be resolved.
    pub(crate) fn expand_path(
        self: &Arc<Self>,
        names: &[String],
        index: usize,
        expand_last: bool,
    ) -> Option<(Arc<NodeController>, usize)> {
        if index >= names.len() {
            return None;
        }
        self.set_expanded(true);
        let entry = self.find_child_by_name(&names[index])?;
        let controller = entry.controller()?;
        let deeper = controller.expand_path(names, index + 1, expand_last);
        if index + 1 == names.len() && expand_last {
            controller.set_expanded(true);
        }
        Some(deeper.unwrap_or((controller, index + 1)))
    }

    /// The deepest-expanded frontier of this subtree: a node with an empty
    /// child list contributes its own path, any other node the union of
    /// its subdirectory children's sets.
    pub fn expanded_paths(&self) -> BTreeSet<PathBuf> {
        let st = self.children.lock();
        let mut set = BTreeSet::new();
        if st.list.is_empty() {
            set.insert(self.children.path().to_path_buf());
        } else {
            for entry in st.list.iter() {
                if entry.role() == EntryRole::Subdirectory {
                    if let Some(controller) = entry.controller() {
                        set.extend(controller.expanded_paths());
                    }
                }
            }
        }
        set
    }

    /// Starts the periodic roots poll when the host can watch directories
    /// but not its filesystem roots (multi-root hosts).
    pub(crate) fn maybe_start_roots_poll(self: &Arc<Self>) {
        let ControllerKind::RootDirectories { poll } = &self.kind else {
            return;
        };
        let config = self.children.config();
        if !config.watch_hub().is_available() {
            return;
        }
        let fs = self.children.filesystem();
        let roots = fs.roots().unwrap_or_default();
        let single_trivial = roots.len() == 1 && fs.name_of(&roots[0]) == TRIVIAL_ROOT;
        if single_trivial {
            return;
        }
        tracing::trace!("starting filesystem roots poll");
        *poll.lock().unwrap() = RootsPoll::start(self);
    }

    pub(crate) fn stop_roots_poll(&self) {
        if let ControllerKind::RootDirectories { poll } = &self.kind {
            if let Some(poll) = poll.lock().unwrap().take() {
                poll.stop();
            }
        }
    }

    /// Whether the filesystem roots are being polled for changes.
    pub fn is_watching_roots(&self) -> bool {
        match &self.kind {
            ControllerKind::RootDirectories { poll } => poll.lock().unwrap().is_some(),
            _ => false,
        }
    }

    /// Reads the authoritative child set and synchronizes the list with
    /// it. Runs under the node lock; the result is discarded if the node
    /// stopped targeting expansion in the meantime.
    fn read_children(self: &Arc<Self>, st: &mut ChildrenState) {
        let config = Arc::clone(self.children.config());
        let reader = DirectoryReader::new(&config, self.children.policy());
        match &self.kind {
            ControllerKind::RootDirectories { .. } => {
                let outcome = reader.read_roots(self.children.filesystem(), false);
                self.apply_read(st, outcome.entries);
            }
            ControllerKind::Directory => {
                let outcome = reader
                    .read_directory(self.children.filesystem(), self.children.path());
                let start_watch = outcome.start_watch;
                self.apply_read(st, outcome.entries);
                if start_watch {
                    self.register_watch();
                }
            }
            ControllerKind::MountPoint { mount } => {
                let fs = {
                    let mut mount = mount.lock().unwrap();
                    if mount.is_none() {
                        *mount = self
                            .children
                            .policy()
                            .create_filesystem_for(self.children.path());
                    }
                    mount.clone()
                };
                // Without a mounted filesystem the node expands empty.
                let Some(fs) = fs else { return };
                // The trivial single root of a mount stays invisible: the
                // skipping read yields its contents directly.
                let outcome = reader.read_roots(&fs, true);
                self.apply_read(st, outcome.entries);
            }
        }
    }

    fn apply_read(&self, st: &mut ChildrenState, entries: Vec<DirectoryEntry>) {
        if !st.expansion.target() {
            tracing::trace!("discarding read result for collapsed node");
            return;
        }
        let children = &self.children;
        st.list
            .synchronize_to(entries, &mut |event| children.apply_event(event));
    }

    fn on_collapse(&self) {
        if let ControllerKind::Directory = &self.kind {
            let config = self.children.config();
            // Mounted filesystems are never registered; their paths must
            // not touch same-named registrations of the global one.
            if Arc::ptr_eq(self.children.filesystem(), config.filesystem()) {
                config.watch_hub().unregister(self.children.path());
            }
        }
    }

    /// Clears the child list (forcing all descendants collapsed) and, for
    /// a mount point, releases the mounted filesystem.
    fn clear_children(&self, st: &mut ChildrenState) {
        let children = &self.children;
        st.list.clear(&mut |event| children.apply_event(event));
        if let ControllerKind::MountPoint { mount } = &self.kind {
            if let Some(fs) = mount.lock().unwrap().take() {
                let is_global = Arc::ptr_eq(&fs, self.children.config().filesystem());
                if !is_global && fs.is_open() {
                    self.children.policy().on_closing_filesystem(&fs);
                    if let Err(error) = fs.close() {
                        tracing::warn!("closing mounted filesystem: {error}");
                    }
                }
            }
        }
    }

    fn register_watch(self: &Arc<Self>) {
        let config = self.children.config();
        let hub = config.watch_hub();
        // The watch service covers the global filesystem only.
        if !Arc::ptr_eq(self.children.filesystem(), config.filesystem()) {
            return;
        }
        if hub.is_watched(self.children.path()) {
            return;
        }
        let weak = Arc::downgrade(self);
        hub.register(
            self.children.path(),
            Arc::new(move |event| {
                if let Some(controller) = weak.upgrade() {
                    controller.on_watch_event(event);
                }
            }),
        );
    }

    /// Runs on the watch thread; takes the node lock through the children
    /// primitives.
    fn on_watch_event(self: &Arc<Self>, event: WatchEvent) {
        match event {
            WatchEvent::Created(name) => {
                let fs = self.children.filesystem();
                let path = fs.resolve(self.children.path(), &name);
                if let Some(new_entry) = path_to_entry(fs, self.children.policy(), path) {
                    self.children.add_if_expanded(new_entry);
                }
            }
            WatchEvent::Deleted(name) => {
                self.children.remove_named(&name);
            }
            WatchEvent::Overflow => {
                self.update_directory();
            }
        }
    }
}

/// Periodic re-read of the filesystem roots, for hosts whose roots come
/// and go (removable drives) but cannot be watched natively.
struct RootsPoll {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl RootsPoll {
    fn start(controller: &Arc<NodeController>) -> Option<Self> {
        let (stop, wake) = mpsc::channel::<()>();
        let weak = Arc::downgrade(controller);
        let thread = std::thread::Builder::new()
            .name("fstree-view-roots-poll".to_string())
            .spawn(move || loop {
                match wake.recv_timeout(ROOTS_POLL_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(controller) = weak.upgrade() else {
                            break;
                        };
                        controller.update_directory();
                    }
                    _ => break,
                }
            });
        match thread {
            Ok(handle) => Some(Self { stop, handle }),
            Err(error) => {
                tracing::warn!("failed to spawn roots poll thread: {error}");
                None
            }
        }
    }

    fn stop(self) {
        drop(self.stop);
        if self.handle.join().is_err() {
            tracing::warn!("roots poll thread terminated with a panic");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodePolicy, SimpleNodePolicy, UpdateNotifier};
    use crate::fsys::MemoryFileSystem;
    use crate::tree::WatchHub;
    use crate::view::null_view_factory;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn node_config(fs: &Arc<dyn FileSystem>, policy: Arc<dyn NodePolicy>) -> Arc<NodeConfig> {
        Arc::new(NodeConfig::new(
            null_view_factory(),
            Arc::new(WatchHub::new(false, fs)),
            Arc::new(|a: &str, b: &str| a.cmp(b)),
            policy,
            Arc::clone(fs),
        ))
    }

    fn directory_controller(
        fs: &Arc<dyn FileSystem>,
        policy: Arc<dyn NodePolicy>,
        path: &str,
    ) -> Arc<NodeController> {
        let config = node_config(fs, policy);
        let entry = DirectoryEntry::subdirectory(Arc::clone(fs), PathBuf::from(path));
        entry.init_controller(&config)
    }

    struct LeafEverywherePolicy;

    impl NodePolicy for LeafEverywherePolicy {
        fn is_leaf_node(&self, _path: &Path) -> bool {
            true
        }

        fn policy_for(self: Arc<Self>, _path: &Path) -> Arc<dyn NodePolicy> {
            self
        }
    }

    #[test]
    fn test_leaf_nodes_never_expand() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.create_dir_all(Path::new("/a/b"));
        let fs: Arc<dyn FileSystem> = memory;
        let controller = directory_controller(&fs, Arc::new(LeafEverywherePolicy), "/a");

        controller.set_expanded(true);
        assert!(!controller.is_expanded());
        assert!(controller.find_child_by_name("b").is_none());
    }

    #[test]
    fn test_expand_collapse_round_trip() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.create_dir_all(Path::new("/a/x"));
        memory.create_dir_all(Path::new("/a/y"));
        let fs: Arc<dyn FileSystem> = memory;
        let controller = directory_controller(&fs, Arc::new(SimpleNodePolicy), "/a");

        assert!(!controller.is_expanded());
        controller.set_expanded(true);
        assert!(controller.is_expanded());
        assert!(controller.find_child_by_name("x").is_some());
        assert!(controller.find_child_by_name("y").is_some());
        assert!(controller.find_child_by_name("z").is_none());

        // Re-expanding an expanded node is a no-op.
        controller.set_expanded(true);
        assert!(controller.is_expanded());

        controller.set_expanded(false);
        assert!(!controller.is_expanded());
        assert!(controller.find_child_by_name("x").is_none());
    }

    #[test]
    fn test_expanded_paths_of_collapsed_node_is_its_own_path() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.create_dir_all(Path::new("/a/x"));
        let fs: Arc<dyn FileSystem> = memory;
        let controller = directory_controller(&fs, Arc::new(SimpleNodePolicy), "/a");

        let set = controller.expanded_paths();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("/a")]);
    }

    struct NoFilesystemMountPolicy;

    impl NodePolicy for NoFilesystemMountPolicy {
        fn is_creating_node_for_file(&self, _fs: &dyn FileSystem, _file: &Path) -> bool {
            true
        }

        fn policy_for(self: Arc<Self>, _path: &Path) -> Arc<dyn NodePolicy> {
            self
        }
    }

    #[test]
    fn test_mount_without_filesystem_expands_empty() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.create_file(Path::new("/data.bin"));
        let fs: Arc<dyn FileSystem> = memory;
        let config = node_config(&fs, Arc::new(NoFilesystemMountPolicy));
        let entry = DirectoryEntry::regular_file(Arc::clone(&fs), PathBuf::from("/data.bin"));
        let controller = entry.init_controller(&config);

        controller.set_expanded(true);
        assert!(controller.is_expanded());
        assert!(controller.find_child_by_name("anything").is_none());
        controller.set_expanded(false);
    }

    struct NotifierPolicy {
        notifier: Mutex<Option<UpdateNotifier>>,
    }

    impl NodePolicy for NotifierPolicy {
        fn is_requesting_update_notifier(&self) -> bool {
            true
        }

        fn set_update_notifier(&self, notifier: UpdateNotifier) {
            *self.notifier.lock().unwrap() = Some(notifier);
        }

        fn policy_for(self: Arc<Self>, _path: &Path) -> Arc<dyn NodePolicy> {
            self
        }
    }

    #[test]
    fn test_update_notifier_forces_reread() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.create_dir_all(Path::new("/a/old"));
        let policy = Arc::new(NotifierPolicy {
            notifier: Mutex::new(None),
        });
        let fs: Arc<dyn FileSystem> = memory.clone();
        let controller = directory_controller(&fs, policy.clone(), "/a");

        controller.set_expanded(true);
        assert!(controller.find_child_by_name("old").is_some());

        // Mutate behind the tree's back (no watch service in this config),
        // then ask for a refresh through the notifier.
        memory.remove(Path::new("/a/old"));
        memory.create_dir_all(Path::new("/a/new"));
        assert!(controller.find_child_by_name("new").is_none());

        let notifier = policy.notifier.lock().unwrap();
        if let Some(notify) = notifier.as_ref() {
            notify();
        }
        assert!(controller.find_child_by_name("new").is_some());
        assert!(controller.find_child_by_name("old").is_none());
    }
}
