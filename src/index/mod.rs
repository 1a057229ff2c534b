//! The archive index: one namespace over every registered container.
//!
//! Entries are grouped by [`DirectoryPath`].  Registration is append-only and
//! idempotent per `(container, path)`.  All entries are kept, including ones
//! that share a display name with an earlier entry; the
//! first-registered-wins rule is applied only when listing or resolving by
//! display name.  Exact `name.ext` lookups reach every stored entry.

use std::collections::{BTreeMap, HashSet};
use std::ops::Index;

use tracing::debug;

use crate::entry::{ContainerId, Entry};
use crate::error::{Error, Result};
use crate::path::{fold, split_entry_path, DirectoryPath};
use crate::reader::ArchiveReader;
use crate::tree::{build_tree, DirectoryTreeNode};

// ── DirectoryMapping ─────────────────────────────────────────────────────────

/// Directory → entries, in registration order within each directory.
///
/// Lookups by `&str` normalize their argument, so `"characters"` finds the
/// `"Characters/"` directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryMapping {
    dirs: BTreeMap<DirectoryPath, Vec<Entry>>,
    // Keys in the order they were first registered.
    registered: Vec<DirectoryPath>,
}

impl DirectoryMapping {
    pub fn get(&self, directory: &str) -> Option<&[Entry]> {
        self.get_path(&DirectoryPath::new(directory))
    }

    pub fn get_path(&self, directory: &DirectoryPath) -> Option<&[Entry]> {
        self.dirs.get(directory).map(Vec::as_slice)
    }

    pub fn contains(&self, directory: &str) -> bool {
        self.dirs.contains_key(&DirectoryPath::new(directory))
    }

    /// Number of directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Directories in case-insensitive order.
    pub fn keys(&self) -> impl Iterator<Item = &DirectoryPath> {
        self.dirs.keys()
    }

    /// Directories in the order they first appeared during registration.
    pub fn registration_order(&self) -> impl Iterator<Item = &DirectoryPath> {
        self.registered.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DirectoryPath, &[Entry])> {
        self.dirs.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn entry_count(&self) -> usize {
        self.dirs.values().map(Vec::len).sum()
    }

    fn push(&mut self, entry: Entry) {
        // The first-seen casing of a directory stays as the map key.
        match self.dirs.get_mut(entry.directory()) {
            Some(entries) => entries.push(entry),
            None => {
                self.registered.push(entry.directory().clone());
                self.dirs.insert(entry.directory().clone(), vec![entry]);
            }
        }
    }
}

/// # Panics
///
/// Panics if `directory` is not in the mapping.  Use
/// [`DirectoryMapping::get`] or [`ArchiveIndex::list_directory`] when the
/// directory may be absent.
impl Index<&str> for DirectoryMapping {
    type Output = [Entry];

    fn index(&self, directory: &str) -> &[Entry] {
        match self.get(directory) {
            Some(entries) => entries,
            None => panic!("no directory {directory:?} in mapping"),
        }
    }
}

// ── ArchiveIndex ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ArchiveIndex {
    directories: DirectoryMapping,
    // (container, case-folded full path) of everything registered so far
    seen: HashSet<(ContainerId, String)>,
    containers: Vec<ContainerId>,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every entry of an unlocked reader.  Returns how many entries
    /// were new.
    pub fn register_container(&mut self, reader: &dyn ArchiveReader) -> Result<usize> {
        let entries = reader.entries()?;
        Ok(self.register_entries(reader.id(), entries))
    }

    /// Register entries already listed from `container`.
    ///
    /// An entry whose `(container, path)` was registered before is ignored, so
    /// registering the same container twice changes nothing.  An empty list is
    /// a no-op.
    pub fn register_entries<I>(&mut self, container: &ContainerId, entries: I) -> usize
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut added = 0;
        for entry in entries {
            let key = (entry.container().clone(), fold(entry.path()).into_owned());
            if !self.seen.insert(key) {
                continue;
            }
            self.directories.push(entry);
            added += 1;
        }
        if added > 0 && !self.containers.contains(container) {
            self.containers.push(container.clone());
        }
        debug!(%container, added, directories = self.directories.len(), "registered container");
        added
    }

    /// First-registered entry in `directory` whose display name (file name
    /// without extension) matches `display_name`, case-insensitively.
    pub fn resolve_entry(&self, directory: &str, display_name: &str) -> Result<&Entry> {
        let dir = DirectoryPath::new(directory);
        let wanted = fold(display_name);
        self.directories
            .get_path(&dir)
            .and_then(|entries| entries.iter().find(|e| fold(e.display_name()) == wanted))
            .ok_or_else(|| not_found(&dir, display_name))
    }

    /// Entry in `directory` whose full file name (with extension) matches.
    pub fn resolve_file(&self, directory: &str, file_name: &str) -> Result<&Entry> {
        let dir = DirectoryPath::new(directory);
        let wanted = fold(file_name);
        self.directories
            .get_path(&dir)
            .and_then(|entries| entries.iter().find(|e| fold(e.name()) == wanted))
            .ok_or_else(|| not_found(&dir, file_name))
    }

    /// Resolve a full path such as `Characters/Hero.uexp`.
    pub fn resolve_path(&self, path: &str) -> Result<&Entry> {
        let (dir, name) = split_entry_path(path);
        self.resolve_file(dir.as_str(), &name)
    }

    /// Visible entries of `directory`: one per display name (first registered
    /// wins), sorted case-insensitively.  Unknown directories list as empty.
    pub fn list_directory(&self, directory: &str) -> Vec<&Entry> {
        let Some(entries) = self.directories.get(directory) else {
            return Vec::new();
        };
        let mut names = HashSet::new();
        let mut visible: Vec<&Entry> = entries
            .iter()
            .filter(|e| names.insert(fold(e.display_name()).into_owned()))
            .collect();
        visible.sort_by_cached_key(|e| fold(e.display_name()).into_owned());
        visible
    }

    pub fn directories(&self) -> &DirectoryMapping {
        &self.directories
    }

    /// Containers that contributed entries, in registration order.
    pub fn containers(&self) -> &[ContainerId] {
        &self.containers
    }

    pub fn entry_count(&self) -> usize {
        self.directories.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn build_tree(&self) -> DirectoryTreeNode {
        build_tree(&self.directories)
    }
}

fn not_found(dir: &DirectoryPath, name: &str) -> Error {
    Error::EntryNotFound { directory: dir.to_string(), name: name.to_owned() }
}
