//! Filesystem abstraction consumed by the tree controller.
//!
//! The controller never touches `std::fs` directly: directory listing,
//! file-type probing and the watch primitive all go through the
//! [`FileSystem`] trait, so hosts can expose the OS filesystem, an archive,
//! or an in-memory stand-in interchangeably.

pub mod memory;
pub mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Whether symbolic links are followed when probing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkBehavior {
    /// Probe the link target (the default).
    #[default]
    Follow,
    /// Probe the link itself.
    NoFollow,
}

/// The coarse file type classification the controller cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    RegularFile,
    /// Anything else: sockets, devices, dangling links, missing paths.
    Other,
}

/// A change inside one watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An entry with the given name appeared.
    Created(String),
    /// An entry with the given name disappeared.
    Deleted(String),
    /// Events were lost; the directory content must be re-read.
    Overflow,
}

/// A raw message from a watch backend to the hub's drain thread.
///
/// `dir` is the watched directory the event belongs to; `None` marks a
/// backend-wide overflow that applies to every registered directory.
#[derive(Debug, Clone)]
pub struct WatchMessage {
    pub dir: Option<PathBuf>,
    pub event: WatchEvent,
}

/// The raw, non-recursive watch primitive of a filesystem.
///
/// Implementations deliver [`WatchMessage`]s into the sink handed to
/// [`FileSystem::start_watcher`]. Dropping the backend stops delivery and
/// disconnects the sink, which is how the hub's drain thread learns to
/// exit.
pub trait WatchBackend: Send {
    fn watch(&mut self, dir: &Path) -> io::Result<()>;
    fn unwatch(&mut self, dir: &Path) -> io::Result<()>;
}

/// The absolute-path decomposition of a path: its root plus the name
/// elements below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSteps {
    pub root: String,
    pub names: Vec<String>,
}

/// A hierarchical filesystem as seen by the tree controller.
///
/// Paths are plain [`Path`]s; which filesystem a path belongs to is
/// context the caller carries (entries store their owning filesystem
/// handle). All methods are callable from any thread.
pub trait FileSystem: Send + Sync {
    /// The root directories of this filesystem, e.g. `["/"]` or drive
    /// letters.
    fn roots(&self) -> io::Result<Vec<PathBuf>>;

    /// Lists the entries of a directory as absolute paths.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Classifies a path, honoring the link behavior.
    fn probe(&self, path: &Path, links: LinkBehavior) -> PathKind;

    /// The host's notion of a hidden entry.
    fn is_hidden(&self, path: &Path) -> bool;

    /// The name of the last path element, or the root name for a root, or
    /// the empty string.
    fn name_of(&self, path: &Path) -> String;

    /// Resolves a child name against a base directory.
    fn resolve(&self, base: &Path, name: &str) -> PathBuf;

    /// Splits an absolute path into its root and name elements, or `None`
    /// if the path is not absolute in this filesystem.
    fn components_of(&self, path: &Path) -> Option<PathSteps>;

    /// Whether this filesystem is the owner of the given path.
    fn owns(&self, path: &Path) -> bool;

    /// Whether the filesystem is open. Closed filesystems read as empty.
    fn is_open(&self) -> bool {
        true
    }

    /// Closes the filesystem and releases its resources.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    /// Whether [`FileSystem::start_watcher`] can succeed at all.
    fn supports_watching(&self) -> bool {
        false
    }

    /// Starts the watch primitive, delivering events into `sink`.
    fn start_watcher(&self, sink: Sender<WatchMessage>) -> io::Result<Box<dyn WatchBackend>> {
        let _ = sink;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "watch service not supported by this filesystem",
        ))
    }
}
