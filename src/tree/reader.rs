//! One-shot reads of filesystem roots and directory contents.

use super::{DirectoryEntry, NodeConfig};
use crate::config::NodePolicy;
use crate::fsys::{FileSystem, PathKind};
use crate::sorted_list::{ignore_events, SortedDistinctList};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What one read produced.
pub(crate) struct ReadOutcome {
    /// The entries, sorted and deduplicated under the sibling order.
    pub entries: Vec<DirectoryEntry>,
    /// True iff the read completed against a real directory and the caller
    /// should register the path with the watch hub.
    pub start_watch: bool,
}

impl ReadOutcome {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            start_watch: false,
        }
    }
}

/// Applies the policy filters to a listed path and wraps it into the
/// matching entry, or drops it.
pub(crate) fn path_to_entry(
    fs: &Arc<dyn FileSystem>,
    policy: &Arc<dyn NodePolicy>,
    path: PathBuf,
) -> Option<DirectoryEntry> {
    match fs.probe(&path, policy.link_behavior()) {
        PathKind::Directory => policy
            .is_creating_node_for_directory(fs.as_ref(), &path)
            .then(|| DirectoryEntry::subdirectory(Arc::clone(fs), path)),
        PathKind::RegularFile => policy
            .is_creating_node_for_file(fs.as_ref(), &path)
            .then(|| DirectoryEntry::regular_file(Arc::clone(fs), path)),
        PathKind::Other => None,
    }
}

/// Reads filesystem roots or the children of one directory through the
/// node policy, producing a sorted entry set.
pub(crate) struct DirectoryReader<'a> {
    config: &'a Arc<NodeConfig>,
    policy: &'a Arc<dyn NodePolicy>,
}

impl<'a> DirectoryReader<'a> {
    pub fn new(config: &'a Arc<NodeConfig>, policy: &'a Arc<dyn NodePolicy>) -> Self {
        Self { config, policy }
    }

    /// Enumerates the roots of `fs` as subdirectory entries.
    ///
    /// With `skip_single_root`, a filesystem exposing exactly one trivial
    /// root `/` is read as that root's directory content instead, so the
    /// vestigial `/` never becomes visible.
    pub fn read_roots(&self, fs: &Arc<dyn FileSystem>, skip_single_root: bool) -> ReadOutcome {
        if !fs.is_open() {
            tracing::warn!("cannot read roots: filesystem is not open");
            return ReadOutcome::empty();
        }
        let roots = match fs.roots() {
            Ok(roots) => roots,
            Err(error) => {
                tracing::warn!("reading filesystem roots: {error}");
                return ReadOutcome::empty();
            }
        };
        let mut set = SortedDistinctList::new(self.config.entry_comparator());
        for root in roots {
            set.add(
                DirectoryEntry::subdirectory(Arc::clone(fs), root),
                &mut ignore_events,
            );
        }
        if skip_single_root && set.len() == 1 && set.get(0).is_some_and(|e| e.name() == "/") {
            let root_path = set.get(0).map(|e| e.path().to_path_buf());
            if let Some(root_path) = root_path {
                return self.read_directory(fs, &root_path);
            }
        }
        ReadOutcome {
            entries: set.into_vec(),
            start_watch: false,
        }
    }

    /// Lists one directory, applying the policy filters to each entry.
    pub fn read_directory(&self, fs: &Arc<dyn FileSystem>, dir: &Path) -> ReadOutcome {
        let listing = match fs.read_dir(dir) {
            Ok(listing) => listing,
            Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                tracing::info!("access denied for path {}", dir.display());
                return ReadOutcome::empty();
            }
            Err(error) => {
                tracing::warn!("reading directory {}: {error}", dir.display());
                return ReadOutcome::empty();
            }
        };
        let mut set = SortedDistinctList::new(self.config.entry_comparator());
        for path in listing {
            if let Some(entry) = path_to_entry(fs, self.policy, path) {
                set.add(entry, &mut ignore_events);
            }
        }
        ReadOutcome {
            entries: set.into_vec(),
            start_watch: true,
        }
    }
}
