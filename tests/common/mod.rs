//! Shared fixtures for the end-to-end tests: a recording view adapter and
//! deadline-based waiting for events delivered by the watch thread.

#![allow(dead_code)]

use fstree_view::fsys::MemoryFileSystem;
use fstree_view::view::ViewFactory;
use fstree_view::{Configuration, DirectoryEntry, FileSystemTreeView, NodeView};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A [`NodeView`] implementation mirroring the tree structure so tests can
/// assert the exact child lists the host would render.
pub struct RecordingNodeView {
    entry: DirectoryEntry,
    registry: Arc<ViewRegistry>,
    children: Mutex<Vec<Arc<RecordingNodeView>>>,
    expanded: AtomicBool,
    leaf: AtomicBool,
}

impl RecordingNodeView {
    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub fn name(&self) -> String {
        self.entry.display_name().to_string()
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .map(|child| child.name())
            .collect()
    }

    pub fn child(&self, name: &str) -> Option<Arc<RecordingNodeView>> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .find(|child| child.name() == name)
            .cloned()
    }

    /// Walks down the recorded structure by child names.
    pub fn descend(&self, names: &[&str]) -> Option<Arc<RecordingNodeView>> {
        let mut current = self.child(names.first()?)?;
        for name in &names[1..] {
            let next = current.child(name)?;
            current = next;
        }
        Some(current)
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.load(Ordering::SeqCst)
    }

    fn resolve(&self, view: &Arc<dyn NodeView>) -> Option<Arc<RecordingNodeView>> {
        self.registry.resolve(view)
    }
}

impl NodeView for RecordingNodeView {
    fn insert_subnodes(&self, views: &[(usize, Arc<dyn NodeView>)]) {
        let mut children = self.children.lock().unwrap();
        for (index, view) in views {
            if let Some(recorded) = self.resolve(view) {
                children.insert(*index, recorded);
            }
        }
    }

    fn add_all_subnodes(&self, views: &[Arc<dyn NodeView>]) {
        let mut children = self.children.lock().unwrap();
        for view in views {
            if let Some(recorded) = self.resolve(view) {
                children.push(recorded);
            }
        }
    }

    fn remove_subnodes(&self, indices: &[usize]) {
        let mut children = self.children.lock().unwrap();
        for index in indices {
            children.remove(*index);
        }
    }

    fn clear(&self) {
        self.children.lock().unwrap().clear();
    }

    fn set_expanded(&self, expanded: bool) {
        self.expanded.store(expanded, Ordering::SeqCst);
    }

    fn set_leaf(&self, leaf: bool) {
        self.leaf.store(leaf, Ordering::SeqCst);
    }
}

/// Maps the type-erased view handles the core passes around back to the
/// concrete recording views.
#[derive(Default)]
pub struct ViewRegistry {
    views: Mutex<HashMap<usize, Arc<RecordingNodeView>>>,
}

impl ViewRegistry {
    fn key(view: &Arc<dyn NodeView>) -> usize {
        Arc::as_ptr(view) as *const () as usize
    }

    fn register(&self, view: &Arc<RecordingNodeView>) {
        let erased: Arc<dyn NodeView> = view.clone() as Arc<dyn NodeView>;
        self.views
            .lock()
            .unwrap()
            .insert(Self::key(&erased), Arc::clone(view));
    }

    pub fn resolve(&self, view: &Arc<dyn NodeView>) -> Option<Arc<RecordingNodeView>> {
        self.views.lock().unwrap().get(&Self::key(view)).cloned()
    }
}

/// Builds the view factory for a registry.
pub fn recording_view_factory(registry: Arc<ViewRegistry>) -> ViewFactory {
    Box::new(move |entry: &DirectoryEntry| -> Arc<dyn NodeView> {
        let view = Arc::new(RecordingNodeView {
            entry: entry.clone(),
            registry: Arc::clone(&registry),
            children: Mutex::new(Vec::new()),
            expanded: AtomicBool::new(false),
            leaf: AtomicBool::new(false),
        });
        registry.register(&view);
        view
    })
}

/// A tree over a [`MemoryFileSystem`] plus the recorded view structure.
pub struct TreeFixture {
    pub fs: Arc<MemoryFileSystem>,
    pub tree: FileSystemTreeView,
    pub registry: Arc<ViewRegistry>,
}

/// Installs a fmt subscriber honoring `RUST_LOG`, so the controller's
/// tracing output is visible when a watch test needs debugging. Safe to
/// call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl TreeFixture {
    /// Builds the fixture with the default policy and watch service on.
    pub fn new(fs: Arc<MemoryFileSystem>) -> Self {
        Self::with_configuration(fs.clone(), |builder| builder.filesystem(fs))
    }

    pub fn with_configuration(
        fs: Arc<MemoryFileSystem>,
        configure: impl FnOnce(fstree_view::ConfigurationBuilder) -> fstree_view::ConfigurationBuilder,
    ) -> Self {
        init_tracing();
        let registry = Arc::new(ViewRegistry::default());
        let configuration = configure(Configuration::builder()).build();
        let tree = FileSystemTreeView::new(
            configuration,
            recording_view_factory(Arc::clone(&registry)),
        );
        Self { fs, tree, registry }
    }

    /// The recorded view of the invisible global root node.
    pub fn root(&self) -> Arc<RecordingNodeView> {
        self.registry
            .resolve(&self.tree.root_view())
            .expect("root view must be recorded")
    }

    /// The recorded view at the given names below the root, e.g.
    /// `["/", "a", "b"]`.
    pub fn node(&self, names: &[&str]) -> Option<Arc<RecordingNodeView>> {
        self.root().descend(names)
    }

    /// Child names at the given position, empty when the node is absent.
    pub fn child_names(&self, names: &[&str]) -> Vec<String> {
        match self.node(names) {
            Some(node) => node.child_names(),
            None => Vec::new(),
        }
    }
}

/// Polls `probe` until it holds or the deadline passes, the way the
/// original test-bed waits for watch deliveries.
pub fn wait_until(deadline: Duration, probe: impl Fn() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if probe() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    probe()
}

/// Convenience for building `/a/b/c`-style memory filesystems.
pub fn memory_fs_with_dirs(dirs: &[&str]) -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    for dir in dirs {
        fs.create_dir_all(Path::new(dir));
    }
    fs
}
