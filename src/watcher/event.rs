use std::path::{Path, PathBuf};

/// Watch event after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A source file was created or its content changed.
    Modified(PathBuf),
    /// A source file was deleted.
    Removed(PathBuf),
    /// A path without an extension disappeared; assumed to be a package directory.
    DirectoryRemoved(PathBuf),
    /// The manifest listing the watch roots changed; the subscription must be rebuilt.
    ManifestChanged,
}

impl WatchEvent {
    /// Path whose mapping must be regenerated, `None` for manifest changes.
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Modified(p) | WatchEvent::Removed(p) | WatchEvent::DirectoryRemoved(p) => {
                Some(p)
            }
            WatchEvent::ManifestChanged => None,
        }
    }
}
