//! Entry metadata as exposed by readers and held by the index.

use std::fmt;
use std::sync::Arc;

use crate::path::{self, DirectoryPath};

/// Identifies the container an entry was read from.
///
/// On-disk containers use their header UUID, so the same file reached through
/// two paths is still one container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(Arc<str>);

impl ContainerId {
    pub fn new(id: impl AsRef<str>) -> Self {
        ContainerId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file record inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    container: ContainerId,
    record: u32,
    path: String,
    directory: DirectoryPath,
    name: String,
    size: u64,
}

impl Entry {
    /// `record` is the reader's own handle for the entry; the index never
    /// interprets it.
    pub fn new(container: ContainerId, record: u32, path: &str, size: u64) -> Self {
        let (directory, name) = path::split_entry_path(path);
        let path = format!("{}{}", directory.as_str(), name);
        Self { container, record, path, directory, name, size }
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn record(&self) -> u32 {
        self.record
    }

    /// Full normalized path, e.g. `Characters/Hero.uasset`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn directory(&self) -> &DirectoryPath {
        &self.directory
    }

    /// File name including extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        path::display_name(&self.name)
    }

    pub fn extension(&self) -> &str {
        path::extension(&self.name)
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}
