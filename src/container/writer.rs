//! Container writer.
//!
//! Entries are written as self-describing DATA blocks in the order they are
//! added.  Identical contents are stored once (content-addressed on BLAKE3 of
//! the uncompressed bytes).  The entry table is written last and the header is
//! patched in place at offset 0 by [`ContainerWriter::finalize`].

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::codec::CodecId;
use crate::container::block::{encode_block, index_checksum};
use crate::container::header::{Header, FLAG_ENCRYPTED, HEADER_SIZE};
use crate::container::record::{EntryRecord, EntryTable};
use crate::crypto::{encrypt, ArchiveKey, KEY_LEN};
use crate::error::Result;
use crate::path::{fold, normalize_entry_path};

/// Default Zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Configuration for [`ContainerWriter`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub codec: CodecId,
    pub level: i32,
    /// When set, the entry table and every block are AES-256-GCM sealed.
    pub key: Option<ArchiveKey>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            codec: CodecId::Zstd,
            level: DEFAULT_COMPRESSION_LEVEL,
            key: None,
        }
    }
}

pub struct ContainerWriter<W: Write + Seek> {
    writer: W,
    pub header: Header,
    pub table: EntryTable,
    options: PackOptions,
    cipher_key: Option<[u8; KEY_LEN]>,
    // BLAKE3(content) → (block offset, stored size)
    dedup: HashMap<[u8; 32], (u64, u64)>,
    paths: HashSet<String>,
}

impl ContainerWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, options: PackOptions) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), options)
    }
}

impl<W: Write + Seek> ContainerWriter<W> {
    pub fn new(mut writer: W, options: PackOptions) -> Result<Self> {
        let mut header = Header::new();
        let cipher_key = match &options.key {
            Some(key) => {
                header.flags |= FLAG_ENCRYPTED;
                Some(key.derive(header.uuid.as_bytes())?)
            }
            None => None,
        };
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&[0u8; HEADER_SIZE])?; // patched on finalize
        Ok(Self {
            writer,
            header,
            table: EntryTable::default(),
            options,
            cipher_key,
            dedup: HashMap::new(),
            paths: HashSet::new(),
        })
    }

    /// Add an entry with the writer's default codec.  Returns its record id.
    pub fn add_entry(&mut self, path: &str, data: &[u8]) -> Result<u32> {
        let codec = self.options.codec;
        self.add_entry_with_codec(path, data, codec)
    }

    pub fn add_entry_with_codec(&mut self, path: &str, data: &[u8], codec: CodecId) -> Result<u32> {
        let path = normalize_entry_path(path);
        if path.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty entry path").into());
        }
        if !self.paths.insert(fold(&path).into_owned()) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("duplicate entry path: {path}"),
            ).into());
        }

        let id = self.table.records.len() as u32;
        let content_hash: [u8; 32] = blake3::hash(data).into();

        let (offset, stored_size, codec) = match self.dedup.get(&content_hash) {
            Some(&(offset, stored)) => {
                debug!(%path, offset, "content already stored, sharing block");
                let shared = self.table.records.iter()
                    .find(|r| r.offset == offset)
                    .map(|r| r.codec)
                    .unwrap_or(codec.to_byte());
                (offset, stored, shared)
            }
            None => {
                let (header, payload) = encode_block(
                    data,
                    codec,
                    self.options.level,
                    self.cipher_key.as_ref(),
                )?;
                let offset = self.writer.stream_position()?;
                header.write(&mut self.writer)?;
                self.writer.write_all(&payload)?;
                self.dedup.insert(content_hash, (offset, header.stored_size));
                (offset, header.stored_size, codec.to_byte())
            }
        };

        self.table.records.push(EntryRecord {
            id,
            path,
            offset,
            original_size: data.len() as u64,
            stored_size,
            codec,
            content_hash: hex::encode(content_hash),
        });
        Ok(id)
    }

    /// Write the entry table, patch the header, and hand back the sink.
    pub fn finalize(mut self) -> Result<W> {
        let table = self.table.to_bytes()?;
        let stored = match &self.cipher_key {
            Some(key) => encrypt(key, &table)?,
            None      => table,
        };

        self.header.index_offset = self.writer.stream_position()?;
        self.header.index_size = stored.len() as u64;
        self.header.index_crc32 = index_checksum(&stored);
        self.writer.write_all(&stored)?;

        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        debug!(
            container = %self.header.uuid,
            entries = self.table.records.len(),
            encrypted = self.header.is_encrypted(),
            "container finalized"
        );
        Ok(self.writer)
    }
}
