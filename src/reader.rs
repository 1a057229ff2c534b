//! The reader contract the index is built against.
//!
//! A reader owns one opened container: it answers whether a key unlocks it,
//! lists its entries once unlocked, and reads entry contents on demand for a
//! decoding collaborator.  The index never looks inside containers itself.

use std::collections::HashMap;
use std::path::Path;

use crate::crypto::{ArchiveKey, CryptoError};
use crate::entry::{ContainerId, Entry};
use crate::error::{Error, Result};

pub trait ArchiveReader: Send + Sync {
    fn id(&self) -> &ContainerId;

    /// Short label for logs (usually the file name).
    fn name(&self) -> &str;

    /// `true` if `key` unlocks this container.  Unencrypted containers accept
    /// any key.
    fn test_key(&self, key: &ArchiveKey) -> bool;

    /// Unlock the container for [`entries`](Self::entries) and
    /// [`read`](Self::read).
    fn set_key(&mut self, key: &ArchiveKey) -> Result<()>;

    fn entries(&self) -> Result<Vec<Entry>>;

    /// Full uncompressed contents of one of this reader's entries.
    fn read(&self, entry: &Entry) -> Result<Vec<u8>>;
}

/// Turns a discovered file into a reader.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>>;
}

// ── In-memory reader ─────────────────────────────────────────────────────────

/// A container whose entries live in memory.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    id: ContainerId,
    key: Option<ArchiveKey>,
    unlocked: bool,
    files: Vec<(String, Vec<u8>)>,
}

impl MemoryReader {
    pub fn new(name: &str) -> Self {
        Self { id: ContainerId::new(name), key: None, unlocked: true, files: Vec::new() }
    }

    /// A container that only lists its entries once `key` has been set.
    pub fn with_key(name: &str, key: ArchiveKey) -> Self {
        Self { id: ContainerId::new(name), key: Some(key), unlocked: false, files: Vec::new() }
    }

    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.to_owned(), data.into()));
        self
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.unlocked {
            Ok(())
        } else {
            Err(Error::KeyRequired(self.id.to_string()))
        }
    }
}

impl ArchiveReader for MemoryReader {
    fn id(&self) -> &ContainerId {
        &self.id
    }

    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn test_key(&self, key: &ArchiveKey) -> bool {
        self.key.as_ref().map_or(true, |k| k == key)
    }

    fn set_key(&mut self, key: &ArchiveKey) -> Result<()> {
        if !self.test_key(key) {
            return Err(CryptoError::DecryptionFailed.into());
        }
        self.unlocked = true;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        self.ensure_unlocked()?;
        Ok(self.files
            .iter()
            .enumerate()
            .map(|(i, (path, data))| Entry::new(self.id.clone(), i as u32, path, data.len() as u64))
            .collect())
    }

    fn read(&self, entry: &Entry) -> Result<Vec<u8>> {
        self.ensure_unlocked()?;
        if entry.container() != &self.id {
            return Err(Error::UnknownContainer(entry.container().to_string()));
        }
        self.files
            .get(entry.record() as usize)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Error::EntryNotFound {
                directory: entry.directory().to_string(),
                name: entry.name().to_owned(),
            })
    }
}

/// Opens prepared [`MemoryReader`]s by file name; any other file fails to open.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    readers: HashMap<String, MemoryReader>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, file_name: &str, reader: MemoryReader) -> Self {
        self.readers.insert(file_name.to_owned(), reader);
        self
    }
}

impl ArchiveOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>> {
        let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        match self.readers.get(&*file_name) {
            Some(reader) => Ok(Box::new(reader.clone())),
            None => Err(Error::invalid_container(path, "not a known container")),
        }
    }
}
