//! The container's entry table, stored as JSON at `Header::index_offset`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub id: u32,
    /// Full path inside the container, forward-slash separated.
    pub path: String,
    /// Absolute offset of the block header.
    pub offset: u64,
    pub original_size: u64,
    pub stored_size: u64,
    pub codec: u8,
    /// BLAKE3 of the uncompressed content, lowercase hex.
    pub content_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EntryTable {
    pub records: Vec<EntryRecord>,
}

impl EntryTable {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn get(&self, id: u32) -> Option<&EntryRecord> {
        self.records.get(id as usize).filter(|r| r.id == id)
            .or_else(|| self.records.iter().find(|r| r.id == id))
    }
}
