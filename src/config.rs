//! Tree view configuration and the per-node policy contract.

use crate::fsys::{FileSystem, LinkBehavior, OsFileSystem};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

/// Strict total order over sibling file names.
pub type NameComparator = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Callback a policy may invoke to force a refresh of its node.
pub type UpdateNotifier = Box<dyn Fn() + Send + Sync>;

/// Host-implementable per-node behavior.
///
/// One policy instance is attached to every tree node; the instance is
/// obtained through [`NodePolicy::policy_for`], which may hand out a shared
/// singleton or a fresh stateful instance per path.
pub trait NodePolicy: Send + Sync {
    /// How symbolic links are treated when inspecting paths.
    fn link_behavior(&self) -> LinkBehavior {
        LinkBehavior::Follow
    }

    /// Whether the subdirectory at `directory` should become a node.
    /// The default shows non-hidden directories.
    fn is_creating_node_for_directory(&self, fs: &dyn FileSystem, directory: &Path) -> bool {
        !fs.is_hidden(directory)
    }

    /// Whether the regular file at `file` should become a (mountable) node.
    fn is_creating_node_for_file(&self, _fs: &dyn FileSystem, _file: &Path) -> bool {
        false
    }

    /// Optionally mounts a filesystem for a file path, e.g. a zip archive
    /// exposed as a filesystem. Returning a filesystem here requires
    /// [`NodePolicy::is_creating_node_for_file`] to accept the path.
    fn create_filesystem_for(&self, _file: &Path) -> Option<Arc<dyn FileSystem>> {
        None
    }

    /// Called exactly once when a mounted filesystem is about to be
    /// closed, so the host can release related resources.
    fn on_closing_filesystem(&self, _fs: &Arc<dyn FileSystem>) {}

    /// Whether the node is conceptually a leaf regardless of its actual
    /// contents (e.g. `DCIM`, `.git`).
    fn is_leaf_node(&self, _path: &Path) -> bool {
        false
    }

    /// Whether this node wants an update notifier callback.
    fn is_requesting_update_notifier(&self) -> bool {
        false
    }

    /// Receives the notifier; the policy may invoke it at any time to
    /// re-read the node it belongs to.
    fn set_update_notifier(&self, _notifier: UpdateNotifier) {}

    /// Factory producing the policy instance for a node at `path`.
    fn policy_for(self: Arc<Self>, path: &Path) -> Arc<dyn NodePolicy>;
}

/// The stateless default policy: non-hidden directories only, no files,
/// no mounts.
#[derive(Debug, Default)]
pub struct SimpleNodePolicy;

impl NodePolicy for SimpleNodePolicy {
    fn policy_for(self: Arc<Self>, _path: &Path) -> Arc<dyn NodePolicy> {
        self
    }
}

/// Configuration for a [`crate::FileSystemTreeView`].
pub struct Configuration {
    filesystem: Arc<dyn FileSystem>,
    request_watch_service: bool,
    name_comparator: NameComparator,
    node_policy: Arc<dyn NodePolicy>,
}

impl Configuration {
    /// Returns a builder with the defaults: host filesystem, watch service
    /// requested, natural name order, [`SimpleNodePolicy`].
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Same as `Configuration::builder().build()`.
    pub fn default_configuration() -> Self {
        Self::builder().build()
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.filesystem
    }

    pub fn request_watch_service(&self) -> bool {
        self.request_watch_service
    }

    pub fn name_comparator(&self) -> &NameComparator {
        &self.name_comparator
    }

    pub fn node_policy(&self) -> &Arc<dyn NodePolicy> {
        &self.node_policy
    }
}

/// Builder for [`Configuration`].
#[derive(Default)]
pub struct ConfigurationBuilder {
    filesystem: Option<Arc<dyn FileSystem>>,
    request_watch_service: Option<bool>,
    name_comparator: Option<NameComparator>,
    node_policy: Option<Arc<dyn NodePolicy>>,
}

impl ConfigurationBuilder {
    /// Sets the filesystem exposed as the global root.
    pub fn filesystem(mut self, filesystem: Arc<dyn FileSystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    /// Whether to attempt watch integration (default: true).
    pub fn request_watch_service(mut self, requested: bool) -> Self {
        self.request_watch_service = Some(requested);
        self
    }

    /// Sets the sibling name ordering (default: natural string order).
    pub fn filename_comparator(mut self, comparator: NameComparator) -> Self {
        self.name_comparator = Some(comparator);
        self
    }

    /// Sets the node policy factory (default: [`SimpleNodePolicy`]).
    pub fn node_policy(mut self, policy: Arc<dyn NodePolicy>) -> Self {
        self.node_policy = Some(policy);
        self
    }

    pub fn build(self) -> Configuration {
        Configuration {
            filesystem: self
                .filesystem
                .unwrap_or_else(|| Arc::new(OsFileSystem::new())),
            request_watch_service: self.request_watch_service.unwrap_or(true),
            name_comparator: self
                .name_comparator
                .unwrap_or_else(|| Arc::new(|a: &str, b: &str| a.cmp(b))),
            node_policy: self.node_policy.unwrap_or_else(|| Arc::new(SimpleNodePolicy)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsys::MemoryFileSystem;

    #[test]
    fn test_builder_defaults() {
        let configuration = Configuration::builder().build();
        assert!(configuration.request_watch_service());
        assert_eq!(
            (configuration.name_comparator())("a", "b"),
            Ordering::Less
        );
    }

    #[test]
    fn test_builder_overrides() {
        let fsys: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new());
        let configuration = Configuration::builder()
            .filesystem(Arc::clone(&fsys))
            .request_watch_service(false)
            .filename_comparator(Arc::new(|a: &str, b: &str| b.cmp(a)))
            .build();
        assert!(!configuration.request_watch_service());
        assert_eq!(
            (configuration.name_comparator())("a", "b"),
            Ordering::Greater
        );
        assert!(Arc::ptr_eq(configuration.filesystem(), &fsys));
    }

    #[test]
    fn test_simple_policy_is_shared_across_paths() {
        let policy: Arc<dyn NodePolicy> = Arc::new(SimpleNodePolicy);
        let for_path = Arc::clone(&policy).policy_for(Path::new("/a"));
        assert!(!for_path.is_requesting_update_notifier());
        assert!(!for_path.is_creating_node_for_file(&MemoryFileSystem::new(), Path::new("/a/f")));
    }
}
