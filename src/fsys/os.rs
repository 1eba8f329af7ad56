//! Host filesystem adapter.
//!
//! Wraps `std::fs` for listing and probing and the `notify` crate for the
//! watch primitive. Raw `notify` events carry full paths and rich kinds;
//! they are flattened here into per-directory create/delete/overflow
//! messages before reaching the hub.

use super::{
    FileSystem, LinkBehavior, PathKind, PathSteps, WatchBackend, WatchEvent, WatchMessage,
};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;

/// The platform filesystem.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn roots(&self) -> io::Result<Vec<PathBuf>> {
        #[cfg(windows)]
        {
            let mut roots = Vec::new();
            for letter in b'A'..=b'Z' {
                let root = PathBuf::from(format!("{}:\\", letter as char));
                if root.exists() {
                    roots.push(root);
                }
            }
            Ok(roots)
        }
        #[cfg(not(windows))]
        {
            Ok(vec![PathBuf::from("/")])
        }
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn probe(&self, path: &Path, links: LinkBehavior) -> PathKind {
        let metadata = match links {
            LinkBehavior::Follow => std::fs::metadata(path),
            LinkBehavior::NoFollow => std::fs::symlink_metadata(path),
        };
        match metadata {
            Ok(m) if m.is_dir() => PathKind::Directory,
            Ok(m) if m.is_file() => PathKind::RegularFile,
            _ => PathKind::Other,
        }
    }

    fn is_hidden(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
    }

    fn name_of(&self, path: &Path) -> String {
        if let Some(name) = path.file_name() {
            return name.to_string_lossy().into_owned();
        }
        // No name elements: the root name, or empty.
        let mut root = String::new();
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    root.push_str(&prefix.as_os_str().to_string_lossy())
                }
                Component::RootDir => root.push(std::path::MAIN_SEPARATOR),
                _ => break,
            }
        }
        root
    }

    fn resolve(&self, base: &Path, name: &str) -> PathBuf {
        base.join(name)
    }

    fn components_of(&self, path: &Path) -> Option<PathSteps> {
        if !path.is_absolute() {
            return None;
        }
        let mut root = String::new();
        let mut names = Vec::new();
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    root.push_str(&prefix.as_os_str().to_string_lossy())
                }
                Component::RootDir => root.push(std::path::MAIN_SEPARATOR),
                Component::Normal(name) => names.push(name.to_string_lossy().into_owned()),
                Component::CurDir | Component::ParentDir => {}
            }
        }
        Some(PathSteps { root, names })
    }

    fn owns(&self, path: &Path) -> bool {
        // The host filesystem owns every native path; absoluteness is a
        // separate property checked through `components_of`.
        let _ = path;
        true
    }

    fn supports_watching(&self) -> bool {
        true
    }

    fn start_watcher(&self, sink: Sender<WatchMessage>) -> io::Result<Box<dyn WatchBackend>> {
        let watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => deliver(&sink, event),
                Err(error) => tracing::warn!("watch backend error: {error}"),
            },
            Config::default(),
        )
        .map_err(to_io_error)?;
        Ok(Box::new(NotifyWatchBackend { watcher }))
    }
}

struct NotifyWatchBackend {
    watcher: RecommendedWatcher,
}

impl WatchBackend for NotifyWatchBackend {
    fn watch(&mut self, dir: &Path) -> io::Result<()> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(to_io_error)
    }

    fn unwatch(&mut self, dir: &Path) -> io::Result<()> {
        self.watcher.unwatch(dir).map_err(to_io_error)
    }
}

/// Translates one raw notify event into hub messages.
fn deliver(sink: &Sender<WatchMessage>, event: Event) {
    if event.need_rescan() {
        let _ = sink.send(WatchMessage {
            dir: None,
            event: WatchEvent::Overflow,
        });
        return;
    }
    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                send_named(sink, path, WatchEvent::Created);
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                send_named(sink, path, WatchEvent::Deleted);
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                for path in &event.paths {
                    send_named(sink, path, WatchEvent::Deleted);
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    send_named(sink, path, WatchEvent::Created);
                }
            }
            RenameMode::Both => {
                if let [from, to] = event.paths.as_slice() {
                    send_named(sink, from, WatchEvent::Deleted);
                    send_named(sink, to, WatchEvent::Created);
                }
            }
            _ => {
                // Rename with unknown direction: existence decides.
                for path in &event.paths {
                    if path.exists() {
                        send_named(sink, path, WatchEvent::Created);
                    } else {
                        send_named(sink, path, WatchEvent::Deleted);
                    }
                }
            }
        },
        _ => {}
    }
}

fn send_named(
    sink: &Sender<WatchMessage>,
    path: &Path,
    make: impl FnOnce(String) -> WatchEvent,
) {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return;
    };
    let _ = sink.send(WatchMessage {
        dir: Some(parent.to_path_buf()),
        event: make(name.to_string_lossy().into_owned()),
    });
}

fn to_io_error(err: notify::Error) -> io::Error {
    match err {
        notify::Error {
            kind: notify::ErrorKind::Io(io_err),
            ..
        } => io_err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
