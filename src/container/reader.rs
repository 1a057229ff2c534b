//! Reader for on-disk `.pak` containers.
//!
//! Opening reads the header and the stored entry table, checking the table's
//! CRC32.  For an encrypted container the table stays sealed until a key is
//! set; [`ArchiveReader::test_key`] attempts to open it, and AES-GCM
//! authentication makes a wrong key fail cleanly.  Every record's block must
//! lie inside the file before the table is accepted.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::container::block::{decode_block, index_checksum, BlockHeader, BLOCK_HEADER_SIZE, BLOCK_MAGIC};
use crate::container::header::{Header, HEADER_SIZE};
use crate::container::record::{EntryRecord, EntryTable};
use crate::crypto::{decrypt, ArchiveKey, KEY_LEN};
use crate::entry::{ContainerId, Entry};
use crate::error::{Error, Result};
use crate::reader::{ArchiveOpener, ArchiveReader};

pub struct PakReader {
    path: PathBuf,
    name: String,
    id: ContainerId,
    header: Header,
    file_len: u64,
    sealed_table: Vec<u8>,
    table: Option<EntryTable>,
    cipher_key: Option<[u8; KEY_LEN]>,
    // Last key handed to `test_key`/`set_key` and what it derived to.
    derived: Mutex<Option<(ArchiveKey, [u8; KEY_LEN])>>,
    derivations: AtomicU32,
}

impl PakReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let mut file = BufReader::new(File::open(&path)?);
        let file_len = file.get_ref().metadata()?.len();

        let header = Header::read(&mut file)
            .map_err(|e| Error::invalid_container(&path, e.to_string()))?;

        let index_end = header.index_offset.checked_add(header.index_size);
        if header.index_offset < HEADER_SIZE as u64 || index_end.map_or(true, |end| end > file_len) {
            return Err(Error::invalid_container(&path, "entry table lies outside the file"));
        }

        file.seek(SeekFrom::Start(header.index_offset))?;
        let mut sealed_table = vec![0u8; header.index_size as usize];
        file.read_exact(&mut sealed_table)?;
        if index_checksum(&sealed_table) != header.index_crc32 {
            return Err(Error::invalid_container(&path, "entry table checksum mismatch"));
        }

        let table = if header.is_encrypted() {
            None
        } else {
            let table = EntryTable::from_bytes(&sealed_table)?;
            check_records(&path, file_len, &table)?;
            Some(table)
        };

        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            id: ContainerId::new(header.uuid.hyphenated().to_string()),
            path,
            name,
            header,
            file_len,
            sealed_table,
            table,
            cipher_key: None,
            derived: Mutex::new(None),
            derivations: AtomicU32::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn is_unlocked(&self) -> bool {
        self.table.is_some()
    }

    /// Records of the entry table, once unlocked.
    pub fn records(&self) -> Option<&[EntryRecord]> {
        self.table.as_ref().map(|t| t.records.as_slice())
    }

    /// Derive the cipher key for `key`, reusing the last derivation when the
    /// same key comes back (Argon2id is expensive).
    fn cipher_key_for(&self, key: &ArchiveKey) -> Result<[u8; KEY_LEN]> {
        let mut cached = self.derived.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((last, cipher_key)) = cached.as_ref() {
            if last == key {
                return Ok(*cipher_key);
            }
        }
        let cipher_key = key.derive(self.header.uuid.as_bytes())?;
        self.derivations.fetch_add(1, Ordering::Relaxed);
        *cached = Some((key.clone(), cipher_key));
        Ok(cipher_key)
    }

    fn unseal(&self, key: &ArchiveKey) -> Result<([u8; KEY_LEN], EntryTable)> {
        let cipher_key = self.cipher_key_for(key)?;
        let plain = decrypt(&cipher_key, &self.sealed_table)?;
        let table = EntryTable::from_bytes(&plain)?;
        check_records(&self.path, self.file_len, &table)?;
        Ok((cipher_key, table))
    }

    fn table(&self) -> Result<&EntryTable> {
        self.table.as_ref().ok_or_else(|| Error::KeyRequired(self.name.clone()))
    }

    fn read_record(&self, record: &EntryRecord) -> Result<Vec<u8>> {
        if block_end(record).map_or(true, |end| end > self.file_len) {
            return Err(out_of_bounds(&self.path, record));
        }
        let mut file = BufReader::new(File::open(&self.path)?);
        file.seek(SeekFrom::Start(record.offset))?;
        let block = BlockHeader::read(&mut file)?;
        if block.magic != BLOCK_MAGIC || block.stored_size != record.stored_size {
            return Err(Error::invalid_container(
                &self.path,
                format!("bad block header at offset {}", record.offset),
            ));
        }

        let mut payload = vec![0u8; block.stored_size as usize];
        file.read_exact(&mut payload)?;

        let data = decode_block(&block, &payload, self.cipher_key.as_ref())?
            .ok_or_else(|| Error::invalid_container(
                &self.path,
                format!("block checksum mismatch for {}", record.path),
            ))?;

        if blake3::hash(&data).to_hex().as_str() != record.content_hash {
            return Err(Error::invalid_container(
                &self.path,
                format!("content hash mismatch for {}", record.path),
            ));
        }
        Ok(data)
    }
}

impl ArchiveReader for PakReader {
    fn id(&self) -> &ContainerId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn test_key(&self, key: &ArchiveKey) -> bool {
        if !self.header.is_encrypted() {
            return true;
        }
        match self.unseal(key) {
            Ok(_) => true,
            Err(e) => {
                trace!(container = %self.name, error = %e, "key test failed");
                false
            }
        }
    }

    fn set_key(&mut self, key: &ArchiveKey) -> Result<()> {
        if !self.header.is_encrypted() {
            return Ok(());
        }
        let (cipher_key, table) = self.unseal(key)?;
        self.cipher_key = Some(cipher_key);
        self.table = Some(table);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self.table()?
            .records
            .iter()
            .map(|r| Entry::new(self.id.clone(), r.id, &r.path, r.original_size))
            .collect())
    }

    fn read(&self, entry: &Entry) -> Result<Vec<u8>> {
        if entry.container() != &self.id {
            return Err(Error::UnknownContainer(entry.container().to_string()));
        }
        let record = self.table()?.get(entry.record()).ok_or_else(|| Error::EntryNotFound {
            directory: entry.directory().to_string(),
            name: entry.name().to_owned(),
        })?;
        self.read_record(record)
    }
}

/// End offset of `record`'s block, or `None` on overflow.
fn block_end(record: &EntryRecord) -> Option<u64> {
    record.offset
        .checked_add(BLOCK_HEADER_SIZE as u64)?
        .checked_add(record.stored_size)
}

fn out_of_bounds(path: &Path, record: &EntryRecord) -> Error {
    Error::invalid_container(
        path,
        format!("block for {} lies outside the file", record.path),
    )
}

/// Every record's block must sit between the header and the end of the file.
fn check_records(path: &Path, file_len: u64, table: &EntryTable) -> Result<()> {
    for record in &table.records {
        let inside = record.offset >= HEADER_SIZE as u64
            && block_end(record).is_some_and(|end| end <= file_len);
        if !inside {
            return Err(out_of_bounds(path, record));
        }
    }
    Ok(())
}

/// Opens `.pak` containers from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PakOpener;

impl ArchiveOpener for PakOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>> {
        Ok(Box::new(PakReader::open(path)?))
    }
}
