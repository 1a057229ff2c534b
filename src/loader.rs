//! Bulk load: discover → open + key-test → register.
//!
//! Opening and key-testing touch only one container each and run on the rayon
//! pool when the `parallel` feature is enabled.  Registration into the
//! [`ArchiveIndex`] is then done on the calling thread, in discovery order, so
//! the index only ever has one writer and the result does not depend on
//! scheduling.  A container that cannot be opened or unlocked is logged and
//! skipped; it never stops the others.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::crypto::ArchiveKey;
use crate::entry::{ContainerId, Entry};
use crate::error::{Error, Result};
use crate::index::ArchiveIndex;
use crate::reader::{ArchiveOpener, ArchiveReader};
use crate::registry::ContainerRegistry;
use crate::settings::Settings;
use crate::tree::DirectoryTreeNode;

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be opened as a container.
    OpenFailed(String),
    /// The configured key does not unlock the container.
    KeyRejected,
    /// Unlocked, but its entries could not be listed.
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OpenFailed(e) => write!(f, "open failed: {e}"),
            SkipReason::KeyRejected   => f.write_str("key rejected"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptedContainer {
    pub path: PathBuf,
    pub id: ContainerId,
    /// Entries this container added to the index.
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct SkippedContainer {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub accepted: Vec<AcceptedContainer>,
    pub skipped: Vec<SkippedContainer>,
}

impl LoadReport {
    pub fn is_skipped(&self, path: &Path) -> bool {
        self.skipped.iter().any(|s| s.path == path)
    }
}

// ── LoadedArchives ───────────────────────────────────────────────────────────

/// The immutable result of one load: the index, the readers behind it, and
/// a lazily derived directory tree.
pub struct LoadedArchives {
    index: ArchiveIndex,
    readers: HashMap<ContainerId, Box<dyn ArchiveReader>>,
    report: LoadReport,
    tree: OnceLock<DirectoryTreeNode>,
}

impl LoadedArchives {
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Directory tree of the index, built on first use.
    pub fn tree(&self) -> &DirectoryTreeNode {
        self.tree.get_or_init(|| self.index.build_tree())
    }

    pub fn reader(&self, id: &ContainerId) -> Option<&dyn ArchiveReader> {
        self.readers.get(id).map(|r| &**r)
    }

    /// Contents of a resolved entry, read through its owning container.
    pub fn read_entry(&self, entry: &Entry) -> Result<Vec<u8>> {
        self.reader(entry.container())
            .ok_or_else(|| Error::UnknownContainer(entry.container().to_string()))?
            .read(entry)
    }
}

impl fmt::Debug for LoadedArchives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedArchives")
            .field("containers", &self.readers.len())
            .field("directories", &self.index.directories().len())
            .field("entries", &self.index.entry_count())
            .field("report", &self.report)
            .finish()
    }
}

// ── Load ─────────────────────────────────────────────────────────────────────

enum Outcome {
    Accepted {
        path: PathBuf,
        reader: Box<dyn ArchiveReader>,
        entries: Vec<Entry>,
    },
    Skipped(SkippedContainer),
}

fn skip(path: &Path, reason: SkipReason) -> Outcome {
    warn!(container = %path.display(), %reason, "skipping container");
    Outcome::Skipped(SkippedContainer { path: path.to_owned(), reason })
}

/// Open one container, unlock it with `key`, and list its entries.
fn prepare(path: &Path, key: Option<&ArchiveKey>, opener: &dyn ArchiveOpener) -> Outcome {
    let mut reader = match opener.open(path) {
        Ok(reader) => reader,
        Err(e) => return skip(path, SkipReason::OpenFailed(e.to_string())),
    };
    if let Some(key) = key {
        if !reader.test_key(key) {
            return skip(path, SkipReason::KeyRejected);
        }
        if let Err(e) = reader.set_key(key) {
            return skip(path, SkipReason::Unreadable(e.to_string()));
        }
    }
    match reader.entries() {
        Ok(entries) => {
            debug!(container = reader.name(), entries = entries.len(), "container unlocked");
            Outcome::Accepted { path: path.to_owned(), reader, entries }
        }
        Err(Error::KeyRequired(_)) => skip(path, SkipReason::KeyRejected),
        Err(e) => skip(path, SkipReason::Unreadable(e.to_string())),
    }
}

fn prepare_all(
    paths: &[PathBuf],
    key: Option<&ArchiveKey>,
    opener: &dyn ArchiveOpener,
    parallel: bool,
) -> Vec<Outcome> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return paths.par_iter().map(|p| prepare(p, key, opener)).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    paths.iter().map(|p| prepare(p, key, opener)).collect()
}

/// Build a fresh index from every container described by `settings`.
///
/// Fails only when the settings are invalid or the container directory cannot
/// be listed; per-container failures end up in [`LoadedArchives::report`].
pub fn load_containers(settings: &Settings, opener: &dyn ArchiveOpener) -> Result<LoadedArchives> {
    settings.validate()?;
    let key = settings.archive_key()?;
    let paths = ContainerRegistry::from_settings(settings).discover()?;

    let mut index = ArchiveIndex::new();
    let mut readers: HashMap<ContainerId, Box<dyn ArchiveReader>> = HashMap::new();
    let mut report = LoadReport::default();

    for outcome in prepare_all(&paths, key.as_ref(), opener, settings.parallel) {
        match outcome {
            Outcome::Accepted { path, reader, entries } => {
                let id = reader.id().clone();
                let added = index.register_entries(&id, entries);
                if readers.contains_key(&id) {
                    debug!(container = %path.display(), %id, "container already loaded from another file");
                } else {
                    readers.insert(id.clone(), reader);
                }
                report.accepted.push(AcceptedContainer { path, id, entries: added });
            }
            Outcome::Skipped(skipped) => report.skipped.push(skipped),
        }
    }

    info!(
        accepted = report.accepted.len(),
        skipped = report.skipped.len(),
        directories = index.directories().len(),
        entries = index.entry_count(),
        "load complete"
    );

    Ok(LoadedArchives { index, readers, report, tree: OnceLock::new() })
}
