//! In-memory filesystem.
//!
//! Serves two purposes: it is the shipped example of a mounted
//! pseudo-filesystem (an archive or image exposed as a filesystem), and it
//! is the deterministic test double for the controller. Mutations emit
//! watch events synchronously, read errors can be injected per path, and
//! the filesystem can be closed like a real mount.

use super::{
    FileSystem, LinkBehavior, PathKind, PathSteps, WatchBackend, WatchEvent, WatchMessage,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct WatchRegistry {
    next_id: u64,
    sinks: Vec<SinkSlot>,
}

struct SinkSlot {
    id: u64,
    sender: Sender<WatchMessage>,
    watched: BTreeSet<PathBuf>,
}

#[derive(Default)]
struct Content {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
    errors: BTreeMap<PathBuf, io::ErrorKind>,
}

/// An in-memory filesystem with configurable roots and synchronous watch
/// event delivery.
pub struct MemoryFileSystem {
    roots: Mutex<Vec<PathBuf>>,
    watchable: bool,
    open: AtomicBool,
    content: Mutex<Content>,
    registry: Arc<Mutex<WatchRegistry>>,
}

impl MemoryFileSystem {
    /// A filesystem with the single root `/`.
    pub fn new() -> Self {
        Self::with_roots(["/"])
    }

    /// A filesystem with the given root names, e.g. `["C:\\", "D:\\"]`.
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roots: Vec<PathBuf> = roots.into_iter().map(|r| PathBuf::from(r.as_ref())).collect();
        let mut content = Content::default();
        for root in &roots {
            content.dirs.insert(root.clone());
        }
        Self {
            roots: Mutex::new(roots),
            watchable: true,
            open: AtomicBool::new(true),
            content: Mutex::new(content),
            registry: Arc::new(Mutex::new(WatchRegistry::default())),
        }
    }

    /// Disables the watch primitive, for hosts that cannot watch.
    pub fn unwatchable(self) -> Self {
        Self {
            watchable: false,
            ..self
        }
    }

    /// Adds a root at runtime, like a removable drive appearing.
    pub fn add_root(&self, name: &str) {
        let mut content = self.content.lock().unwrap();
        let mut roots = self.roots.lock().unwrap();
        let root = PathBuf::from(name);
        if !roots.contains(&root) {
            content.dirs.insert(root.clone());
            roots.push(root);
        }
    }

    /// Removes a root at runtime, like a removable drive vanishing.
    pub fn remove_root(&self, name: &str) {
        let mut content = self.content.lock().unwrap();
        let mut roots = self.roots.lock().unwrap();
        let root = PathBuf::from(name);
        roots.retain(|r| *r != root);
        content.dirs.remove(&root);
    }

    /// Creates a directory, creating missing parents, and emits `Created`
    /// events for every entry that appears.
    pub fn create_dir_all(&self, path: &Path) {
        self.materialize(path, PathKind::Directory);
    }

    /// Creates a regular file, creating missing parent directories.
    pub fn create_file(&self, path: &Path) {
        self.materialize(path, PathKind::RegularFile);
    }

    /// Removes a path and all its descendants, emitting `Deleted` events.
    pub fn remove(&self, path: &Path) {
        let removed: Vec<PathBuf> = {
            let mut content = self.content.lock().unwrap();
            let doomed: Vec<PathBuf> = content
                .dirs
                .iter()
                .chain(content.files.iter())
                .filter(|p| p.as_path() == path || p.starts_with(path))
                .cloned()
                .collect();
            for p in &doomed {
                content.dirs.remove(p);
                content.files.remove(p);
            }
            doomed
        };
        // Deepest first, so a watcher of a parent sees children go first.
        let mut removed = removed;
        removed.sort_by_key(|p| std::cmp::Reverse(p.as_os_str().len()));
        for p in &removed {
            if let Some((parent, name)) = self.split_parent(p) {
                self.emit(&parent, WatchEvent::Deleted(name));
            }
        }
    }

    /// Injects a read error for the given directory.
    pub fn set_error(&self, path: &Path, kind: io::ErrorKind) {
        self.content
            .lock()
            .unwrap()
            .errors
            .insert(path.to_path_buf(), kind);
    }

    /// Clears a previously injected read error.
    pub fn clear_error(&self, path: &Path) {
        self.content.lock().unwrap().errors.remove(path);
    }

    /// Injects a raw watch event for the given directory, e.g. an
    /// overflow signal or a duplicated create, to simulate notifier races.
    pub fn emit_event(&self, dir: &Path, event: WatchEvent) {
        self.emit(dir, event);
    }

    fn materialize(&self, path: &Path, kind: PathKind) {
        let mut created = Vec::new();
        {
            let mut content = self.content.lock().unwrap();
            let mut chain = Vec::new();
            let mut cursor = path.to_path_buf();
            loop {
                if content.dirs.contains(&cursor) || content.files.contains(&cursor) {
                    break;
                }
                match self.split_parent(&cursor) {
                    Some((parent, _)) => {
                        chain.push(cursor.clone());
                        cursor = parent;
                    }
                    None => break,
                }
            }
            for p in chain.into_iter().rev() {
                if p == path && kind == PathKind::RegularFile {
                    content.files.insert(p.clone());
                } else {
                    content.dirs.insert(p.clone());
                }
                created.push(p);
            }
        }
        for p in &created {
            if let Some((parent, name)) = self.split_parent(p) {
                self.emit(&parent, WatchEvent::Created(name));
            }
        }
    }

    fn emit(&self, dir: &Path, event: WatchEvent) {
        let mut registry = self.registry.lock().unwrap();
        registry.sinks.retain(|slot| {
            if !slot.watched.contains(dir) {
                return true;
            }
            slot.sender
                .send(WatchMessage {
                    dir: Some(dir.to_path_buf()),
                    event: event.clone(),
                })
                .is_ok()
        });
    }

    fn root_of<'a>(&self, s: &'a str) -> Option<(PathBuf, &'a str)> {
        for root in self.roots.lock().unwrap().iter() {
            let r = root.to_str().unwrap_or_default();
            if let Some(rest) = s.strip_prefix(r) {
                return Some((root.clone(), rest.trim_start_matches(['/', '\\'])));
            }
        }
        None
    }

    fn split_parent(&self, path: &Path) -> Option<(PathBuf, String)> {
        let s = path.to_str()?;
        let (root, rest) = self.root_of(s)?;
        if rest.is_empty() {
            return None;
        }
        match rest.rfind(['/', '\\']) {
            Some(i) => {
                let parent = format!("{}{}", root.to_str().unwrap_or_default(), &rest[..i]);
                Some((PathBuf::from(parent), rest[i + 1..].to_string()))
            }
            None => Some((root, rest.to_string())),
        }
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemoryFileSystem {
    fn roots(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.roots.lock().unwrap().clone())
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let content = self.content.lock().unwrap();
        if let Some(kind) = content.errors.get(dir) {
            return Err(io::Error::new(*kind, format!("injected error for {}", dir.display())));
        }
        if !content.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }
        let children = content
            .dirs
            .iter()
            .chain(content.files.iter())
            .filter(|p| self.split_parent(p).is_some_and(|(parent, _)| parent == dir))
            .cloned()
            .collect();
        Ok(children)
    }

    fn probe(&self, path: &Path, _links: LinkBehavior) -> PathKind {
        let content = self.content.lock().unwrap();
        if content.dirs.contains(path) {
            PathKind::Directory
        } else if content.files.contains(path) {
            PathKind::RegularFile
        } else {
            PathKind::Other
        }
    }

    fn is_hidden(&self, path: &Path) -> bool {
        self.name_of(path).starts_with('.')
    }

    fn name_of(&self, path: &Path) -> String {
        match self.split_parent(path) {
            Some((_, name)) => name,
            None => path.to_str().unwrap_or_default().to_string(),
        }
    }

    fn resolve(&self, base: &Path, name: &str) -> PathBuf {
        let base_str = base.to_str().unwrap_or_default();
        if base_str.ends_with(['/', '\\']) {
            PathBuf::from(format!("{base_str}{name}"))
        } else {
            PathBuf::from(format!("{base_str}/{name}"))
        }
    }

    fn components_of(&self, path: &Path) -> Option<PathSteps> {
        let s = path.to_str()?;
        let (root, rest) = self.root_of(s)?;
        let names = rest
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        Some(PathSteps {
            root: root.to_str().unwrap_or_default().to_string(),
            names,
        })
    }

    fn owns(&self, path: &Path) -> bool {
        path.to_str().is_some_and(|s| self.root_of(s).is_some())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> io::Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn supports_watching(&self) -> bool {
        self.watchable
    }

    fn start_watcher(&self, sink: Sender<WatchMessage>) -> io::Result<Box<dyn WatchBackend>> {
        if !self.watchable {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "watch service disabled for this filesystem",
            ));
        }
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.sinks.push(SinkSlot {
            id,
            sender: sink,
            watched: BTreeSet::new(),
        });
        Ok(Box::new(MemoryWatchBackend {
            id,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct MemoryWatchBackend {
    id: u64,
    registry: Arc<Mutex<WatchRegistry>>,
}

impl WatchBackend for MemoryWatchBackend {
    fn watch(&mut self, dir: &Path) -> io::Result<()> {
        let mut registry = self.registry.lock().unwrap();
        if let Some(slot) = registry.sinks.iter_mut().find(|s| s.id == self.id) {
            slot.watched.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> io::Result<()> {
        let mut registry = self.registry.lock().unwrap();
        if let Some(slot) = registry.sinks.iter_mut().find(|s| s.id == self.id) {
            slot.watched.remove(dir);
        }
        Ok(())
    }
}

impl Drop for MemoryWatchBackend {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap();
        registry.sinks.retain(|s| s.id != self.id);
    }
}
