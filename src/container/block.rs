//! Data blocks: `[ BlockHeader (20 B) | payload ]`.
//!
//! The payload is the codec output, sealed with AES-256-GCM when the block is
//! encrypted.  The CRC32 covers the stored payload so that corruption is caught
//! before any decryption or decompression is attempted.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use std::io::{self, Read, Write};

use crate::codec::{get_codec, get_codec_by_byte, CodecId};
use crate::crypto::{decrypt, encrypt, KEY_LEN};
use crate::error::Result;

pub const BLOCK_MAGIC: u32 = 0x424C_4B50; // "PKLB"
pub const BLOCK_HEADER_SIZE: usize = 20;

pub const BLOCK_FLAG_ENCRYPTED: u8 = 1 << 0;

#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub magic: u32,
    pub codec: u8,
    pub flags: u8,
    pub stored_size: u64,
    pub checksum: u32,
}

impl BlockHeader {
    pub fn is_encrypted(&self) -> bool {
        self.flags & BLOCK_FLAG_ENCRYPTED != 0
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u8(self.codec)?;
        writer.write_u8(self.flags)?;
        writer.write_u16::<LittleEndian>(0)?;
        writer.write_u64::<LittleEndian>(self.stored_size)?;
        writer.write_u32::<LittleEndian>(self.checksum)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        let codec = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let _reserved = reader.read_u16::<LittleEndian>()?;
        Ok(Self {
            magic,
            codec,
            flags,
            stored_size: reader.read_u64::<LittleEndian>()?,
            checksum: reader.read_u32::<LittleEndian>()?,
        })
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compress, optionally seal, and frame `data` as one block.
pub fn encode_block(
    data: &[u8],
    codec: CodecId,
    level: i32,
    key: Option<&[u8; KEY_LEN]>,
) -> Result<(BlockHeader, Vec<u8>)> {
    let compressed = get_codec(codec).compress(data, level)?;
    let (payload, flags) = match key {
        Some(k) => (encrypt(k, &compressed)?, BLOCK_FLAG_ENCRYPTED),
        None    => (compressed, 0),
    };
    let header = BlockHeader {
        magic: BLOCK_MAGIC,
        codec: codec.to_byte(),
        flags,
        stored_size: payload.len() as u64,
        checksum: crc32(&payload),
    };
    Ok((header, payload))
}

/// Verify, open and decompress one block payload.
///
/// Returns `Ok(None)` when the CRC does not match, so the caller can attach
/// container context to the failure.
pub fn decode_block(
    header: &BlockHeader,
    payload: &[u8],
    key: Option<&[u8; KEY_LEN]>,
) -> Result<Option<Vec<u8>>> {
    if crc32(payload) != header.checksum {
        return Ok(None);
    }
    let opened;
    let compressed = if header.is_encrypted() {
        let k = match key {
            Some(k) => k,
            None    => return Ok(None),
        };
        opened = decrypt(k, payload)?;
        &opened[..]
    } else {
        payload
    };
    Ok(Some(get_codec_by_byte(header.codec)?.decompress(compressed)?))
}

pub(crate) fn index_checksum(data: &[u8]) -> u32 {
    crc32(data)
}
