//! fstree-view
//!
//! A UI-agnostic filesystem tree controller: a live, lazily expanded model
//! of a hierarchical filesystem that keeps itself synchronized with the
//! underlying storage through a change notification service.
//!
//! The crate is the headless core of a tree component. It maintains the
//! expansion state machine of every node, keeps each expanded directory's
//! visible children equal to the authoritative on-disk listing under
//! concurrent external mutation, and multiplexes a single background
//! change notifier across all registered directories. Rendering is fully
//! delegated: the host implements [`NodeView`] and receives fine-grained
//! insert/remove callbacks.
//!
//! ## Flow
//!
//! ```text
//! expand_path()
//!        ↓
//! NodeController (per node, state machine under the node lock)
//!        ↓
//! DirectoryReader (policy-filtered roots/directory listing)
//!        ↓
//! SortedDistinctList::synchronize_to (diff → insert/remove events)
//!        ↓
//! NodeView callbacks  +  WatchHub registration
//!        ↑
//! watch thread (Create/Delete/Overflow per directory)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fstree_view::{Configuration, FileSystemTreeView};
//! use fstree_view::view::null_view_factory;
//! use std::path::Path;
//!
//! let tree = FileSystemTreeView::new(Configuration::builder().build(), null_view_factory());
//! tree.expand_path(Some(Path::new("/tmp")), true, true).unwrap();
//! for path in tree.expanded_paths() {
//!     println!("{}", path.display());
//! }
//! tree.close();
//! ```
//!
//! ## Module structure
//!
//! - [`sorted_list`]: the ordered deduplicated child container with
//!   diffing `synchronize_to` semantics
//! - [`fsys`]: the filesystem abstraction plus the OS and in-memory
//!   implementations
//! - [`tree`]: entries, controllers, the directory reader and the
//!   watch hub
//! - [`config`]: builder configuration and the [`NodePolicy`] contract
//! - [`view`]: the host-implementable view adapter
//! - [`state`]: flat text persistence of expansion set and selection

pub mod config;
pub mod error;
mod facade;
pub mod fsys;
pub mod sorted_list;
pub mod state;
pub mod tree;
pub mod view;

pub use config::{Configuration, ConfigurationBuilder, NodePolicy, SimpleNodePolicy};
pub use error::TreeViewError;
pub use facade::FileSystemTreeView;
pub use state::TreeViewState;
pub use tree::DirectoryEntry;
pub use view::NodeView;

/// Re-exports for convenience.
pub mod prelude {
    pub use crate::config::{
        Configuration, ConfigurationBuilder, NameComparator, NodePolicy, SimpleNodePolicy,
        UpdateNotifier,
    };
    pub use crate::error::TreeViewError;
    pub use crate::facade::FileSystemTreeView;
    pub use crate::fsys::{
        FileSystem, LinkBehavior, MemoryFileSystem, OsFileSystem, PathKind, WatchEvent,
    };
    pub use crate::state::TreeViewState;
    pub use crate::tree::{DirectoryEntry, NodeController, WatchHub};
    pub use crate::view::{NodeView, ViewFactory};
}
