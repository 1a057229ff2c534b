//! Fixed-size container header at offset 0.
//!
//! Layout (little-endian, 64 bytes):
//!
//! | off | size | field          |
//! |-----|------|----------------|
//! | 0   | 4    | magic `PAKX`   |
//! | 4   | 4    | version        |
//! | 8   | 16   | container uuid |
//! | 24  | 4    | flags          |
//! | 28  | 8    | index offset   |
//! | 36  | 8    | index size     |
//! | 44  | 4    | index crc32    |
//! | 48  | 8    | created (unix) |
//! | 56  | 8    | reserved       |

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use std::io::{self, Read, Write};
use thiserror::Error;
use uuid::Uuid;

pub const MAGIC: &[u8; 4] = b"PAKX";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 64;

/// Index and every data block are AES-256-GCM sealed.
pub const FLAG_ENCRYPTED: u32 = 1 << 0;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Invalid magic number")]
    InvalidMagic,
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct Header {
    pub version: u32,
    pub uuid: Uuid,
    pub flags: u32,
    pub index_offset: u64,
    pub index_size: u64,
    pub index_crc32: u32,
    pub created: i64,
}

impl Header {
    pub fn new() -> Self {
        Self {
            version: VERSION,
            uuid: Uuid::new_v4(),
            flags: 0,
            index_offset: 0,
            index_size: 0,
            index_crc32: 0,
            created: Utc::now().timestamp(),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created, 0).single()
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_all(self.uuid.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u64::<LittleEndian>(self.index_offset)?;
        writer.write_u64::<LittleEndian>(self.index_size)?;
        writer.write_u32::<LittleEndian>(self.index_crc32)?;
        writer.write_i64::<LittleEndian>(self.created)?;
        writer.write_all(&[0u8; 8])?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, HeaderError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(HeaderError::InvalidMagic);
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }
        let mut uuid_bytes = [0u8; 16];
        reader.read_exact(&mut uuid_bytes)?;
        let flags = reader.read_u32::<LittleEndian>()?;
        let index_offset = reader.read_u64::<LittleEndian>()?;
        let index_size = reader.read_u64::<LittleEndian>()?;
        let index_crc32 = reader.read_u32::<LittleEndian>()?;
        let created = reader.read_i64::<LittleEndian>()?;
        let mut reserved = [0u8; 8];
        reader.read_exact(&mut reserved)?;
        Ok(Self {
            version,
            uuid: Uuid::from_bytes(uuid_bytes),
            flags,
            index_offset,
            index_size,
            index_crc32,
            created,
        })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}
