//! Tree node payloads.

use super::{NodeConfig, NodeController};
use crate::fsys::FileSystem;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Display form of the empty path.
const EPSILON: &str = "ε";

/// What a [`DirectoryEntry`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryRole {
    /// The wrapper around a whole filesystem; its path is the empty path.
    FilesystemRoot,
    /// An absolute directory path.
    Subdirectory,
    /// An absolute file path which may mount a child filesystem.
    RegularFile,
}

struct EntryInner {
    path: PathBuf,
    name: String,
    filesystem: Arc<dyn FileSystem>,
    role: EntryRole,
    controller: OnceLock<Arc<NodeController>>,
}

/// One tree payload: a filesystem root wrapper, a subdirectory, or a
/// regular (mountable) file.
///
/// Entries are cheap-clone handles. Identity is path equality: the same
/// path never appears twice among siblings.
#[derive(Clone)]
pub struct DirectoryEntry {
    inner: Arc<EntryInner>,
}

impl DirectoryEntry {
    pub(crate) fn filesystem_root(filesystem: Arc<dyn FileSystem>) -> Self {
        Self::new(EntryRole::FilesystemRoot, filesystem, PathBuf::new())
    }

    pub(crate) fn subdirectory(filesystem: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self::new(EntryRole::Subdirectory, filesystem, path)
    }

    pub(crate) fn regular_file(filesystem: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self::new(EntryRole::RegularFile, filesystem, path)
    }

    fn new(role: EntryRole, filesystem: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        let name = if path.as_os_str().is_empty() {
            String::new()
        } else {
            filesystem.name_of(&path)
        };
        Self {
            inner: Arc::new(EntryInner {
                path,
                name,
                filesystem,
                role,
                controller: OnceLock::new(),
            }),
        }
    }

    /// The absolute path inside the owning filesystem; empty for a
    /// filesystem root wrapper.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The last path element, the root name, or the empty string.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Like [`DirectoryEntry::name`], with the empty name rendered as a
    /// sentinel so hosts can still display it.
    pub fn display_name(&self) -> &str {
        if self.inner.name.is_empty() {
            EPSILON
        } else {
            &self.inner.name
        }
    }

    /// Whether this entry stands for a directory (a filesystem root
    /// wrapper or a subdirectory), e.g. for icon selection in a host.
    pub fn is_directory(&self) -> bool {
        !matches!(self.inner.role, EntryRole::RegularFile)
    }

    /// Whether this entry is a regular file that may mount a child
    /// filesystem on expansion.
    pub fn is_mountable_file(&self) -> bool {
        matches!(self.inner.role, EntryRole::RegularFile)
    }

    /// Notifies the tree about this node being expanded or collapsed,
    /// e.g. from a UI toggle.
    pub fn handle_expansion(&self, expand: bool) {
        if let Some(controller) = self.controller() {
            controller.set_expanded(expand);
        }
    }

    pub(crate) fn role(&self) -> EntryRole {
        self.inner.role
    }

    pub(crate) fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.inner.filesystem
    }

    /// Builds the matching controller on first call; later calls return
    /// the existing one.
    pub(crate) fn init_controller(&self, config: &Arc<NodeConfig>) -> Arc<NodeController> {
        Arc::clone(
            self.inner
                .controller
                .get_or_init(|| NodeController::create(self, Arc::clone(config))),
        )
    }

    pub(crate) fn controller(&self) -> Option<Arc<NodeController>> {
        self.inner.controller.get().cloned()
    }
}

impl PartialEq for DirectoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.inner.path == other.inner.path
    }
}

impl Eq for DirectoryEntry {}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("role", &self.inner.role)
            .field("path", &self.inner.path)
            .finish()
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
