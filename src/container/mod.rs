//! The `.pak` container format: a fixed header, content-addressed data
//! blocks, and a trailing JSON entry table.
//!
//! ```no_run
//! use pakindex::container::{ContainerWriter, PackOptions, PakReader};
//! use pakindex::reader::ArchiveReader;
//!
//! let key: pakindex::ArchiveKey = "0xb5dbd6c9db714cc3e2c9c7422eb0a7e667168d92c59770214ec6abc68d8c2d3e".parse()?;
//! let mut w = ContainerWriter::create("chunk0.pak", PackOptions { key: Some(key.clone()), ..Default::default() })?;
//! w.add_entry("Characters/Hero.uasset", b"...")?;
//! w.finalize()?;
//!
//! let mut r = PakReader::open("chunk0.pak")?;
//! assert!(r.test_key(&key));
//! r.set_key(&key)?;
//! let entries = r.entries()?;
//! let bytes = r.read(&entries[0])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod block;
pub mod header;
pub mod reader;
pub mod record;
pub mod writer;

pub use header::Header;
pub use reader::{PakOpener, PakReader};
pub use record::{EntryRecord, EntryTable};
pub use writer::{ContainerWriter, PackOptions, DEFAULT_COMPRESSION_LEVEL};

/// File extension of containers written by this crate.
pub const EXTENSION: &str = "pak";
