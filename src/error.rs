//! Errors surfaced across the facade boundary.
//!
//! Only path validation failures reach the caller; access-denied and other
//! I/O conditions are recovered locally and logged, leaving the affected
//! node empty.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::FileSystemTreeView::expand_path`].
#[derive(Error, Debug)]
pub enum TreeViewError {
    /// The path belongs to a different filesystem than this tree.
    #[error("path {} belongs to a different filesystem than this tree", .path.display())]
    DomainMismatch {
        /// The rejected path.
        path: PathBuf,
    },

    /// An absolute path was required.
    #[error("path {} is not absolute", .path.display())]
    NonAbsolutePath {
        /// The rejected path.
        path: PathBuf,
    },
}
