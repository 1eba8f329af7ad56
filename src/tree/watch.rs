//! Single background notifier multiplexing per-directory watch
//! registrations.

use crate::fsys::{FileSystem, WatchBackend, WatchEvent, WatchMessage};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Callback receiving the change events of one registered directory.
pub(crate) type WatchCallback = Arc<dyn Fn(WatchEvent) + Send + Sync>;

type CallbackMap = Arc<Mutex<BTreeMap<PathBuf, WatchCallback>>>;

struct HubInner {
    backend: Mutex<Option<Box<dyn WatchBackend>>>,
    callbacks: CallbackMap,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the watch primitive of one filesystem, a single drain thread, and
/// the directory-path to callback mapping.
///
/// When the watch service is not requested, not supported, or failed to
/// start, the hub stays in "off" mode and every call is a no-op.
pub struct WatchHub {
    inner: Option<HubInner>,
}

impl WatchHub {
    pub(crate) fn new(requested: bool, filesystem: &Arc<dyn FileSystem>) -> Self {
        if !requested {
            return Self { inner: None };
        }
        if !filesystem.supports_watching() {
            tracing::warn!("watch service requested, but not available for this filesystem");
            return Self { inner: None };
        }
        let (sink, source) = mpsc::channel::<WatchMessage>();
        let backend = match filesystem.start_watcher(sink) {
            Ok(backend) => backend,
            Err(error) => {
                tracing::warn!("failed to start watch service: {error}");
                return Self { inner: None };
            }
        };
        let callbacks: CallbackMap = Arc::new(Mutex::new(BTreeMap::new()));
        let drained = Arc::clone(&callbacks);
        let thread = std::thread::Builder::new()
            .name("fstree-view-watch".to_string())
            .spawn(move || drain_loop(source, drained));
        match thread {
            Ok(handle) => Self {
                inner: Some(HubInner {
                    backend: Mutex::new(Some(backend)),
                    callbacks,
                    thread: Mutex::new(Some(handle)),
                }),
            },
            Err(error) => {
                tracing::warn!("failed to spawn watch thread: {error}");
                Self { inner: None }
            }
        }
    }

    /// True iff the hub was requested at construction and the filesystem
    /// supports watching (and the hub was not closed yet).
    pub fn is_available(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.backend.lock().unwrap().is_some())
    }

    /// Registers `dir` for create and delete events. A previous
    /// registration for the same path is replaced.
    pub(crate) fn register(&self, dir: &Path, callback: WatchCallback) {
        let Some(inner) = &self.inner else { return };
        let mut backend = inner.backend.lock().unwrap();
        let Some(backend) = backend.as_mut() else { return };
        match backend.watch(dir) {
            Ok(()) => {
                tracing::trace!("start watching path {}", dir.display());
                inner
                    .callbacks
                    .lock()
                    .unwrap()
                    .insert(dir.to_path_buf(), callback);
            }
            Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                tracing::info!("access denied for path {}", dir.display());
            }
            Err(error) => {
                tracing::warn!("cannot watch path {}: {error}", dir.display());
            }
        }
    }

    /// Whether `dir` is currently registered.
    pub fn is_watched(&self, dir: &Path) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.callbacks.lock().unwrap().contains_key(dir))
    }

    /// Cancels the registration of `dir`, if any.
    pub(crate) fn unregister(&self, dir: &Path) {
        let Some(inner) = &self.inner else { return };
        let mut backend = inner.backend.lock().unwrap();
        let removed = inner.callbacks.lock().unwrap().remove(dir);
        if removed.is_some() {
            tracing::trace!("stop watching path {}", dir.display());
            if let Some(backend) = backend.as_mut() {
                if let Err(error) = backend.unwatch(dir) {
                    tracing::trace!("unwatch {} failed: {error}", dir.display());
                }
            }
        }
    }

    /// Closes the watch primitive; the drain thread exits on the next
    /// wake-up and is joined.
    pub(crate) fn close(&self) {
        let Some(inner) = &self.inner else { return };
        tracing::trace!("closing directory watch service");
        // Dropping the backend disconnects the event channel.
        inner.backend.lock().unwrap().take();
        inner.callbacks.lock().unwrap().clear();
        let handle = inner.thread.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("watch thread terminated with a panic");
            }
        }
    }
}

/// The take-loop: pull the next message, look up the destination callback,
/// dispatch it after releasing the map lock. A vanished registration means
/// the event raced a collapse and is dropped.
fn drain_loop(source: Receiver<WatchMessage>, callbacks: CallbackMap) {
    while let Ok(message) = source.recv() {
        match message.dir {
            Some(dir) => {
                let callback = callbacks.lock().unwrap().get(&dir).cloned();
                if let Some(callback) = callback {
                    callback(message.event);
                }
            }
            None => {
                // Backend-wide overflow: every registered directory
                // re-reads.
                let all: Vec<WatchCallback> =
                    callbacks.lock().unwrap().values().cloned().collect();
                for callback in all {
                    callback(WatchEvent::Overflow);
                }
            }
        }
    }
    tracing::trace!("watch service closed");
}
