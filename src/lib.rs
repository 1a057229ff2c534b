//! # pakindex
//!
//! One browsable namespace over many encrypted, compressed archive
//! containers.
//!
//! ```no_run
//! use pakindex::{ArchiveSession, Settings};
//!
//! let settings = Settings::new("/games/paks")
//!     .with_key("0xb5dbd6c9db714cc3e2c9c7422eb0a7e667168d92c59770214ec6abc68d8c2d3e");
//! let session = ArchiveSession::with_pak_containers(settings);
//! let loaded = session.load_all()?;
//!
//! for node in loaded.tree().children() {
//!     println!("{}", node.name());
//! }
//! let hero = loaded.index().resolve_entry("Characters/", "Hero")?;
//! let bytes = loaded.read_entry(hero)?;
//! # Ok::<(), pakindex::Error>(())
//! ```

pub mod codec;
pub mod container;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod index;
pub mod loader;
pub mod path;
pub mod reader;
pub mod registry;
pub mod session;
pub mod settings;
pub mod tree;

pub use codec::CodecId;
pub use container::{ContainerWriter, PackOptions, PakOpener, PakReader};
pub use crypto::ArchiveKey;
pub use entry::{ContainerId, Entry};
pub use error::{Error, Result};
pub use index::{ArchiveIndex, DirectoryMapping};
pub use loader::{load_containers, LoadReport, LoadedArchives, SkipReason};
pub use path::DirectoryPath;
pub use reader::{ArchiveOpener, ArchiveReader, MemoryOpener, MemoryReader};
pub use registry::ContainerRegistry;
pub use session::{ArchiveSession, LoadState};
pub use settings::Settings;
pub use tree::{build_tree, DirectoryTreeNode};
