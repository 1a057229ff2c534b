//! Crate-level error type.
//!
//! Module-local errors ([`CodecError`], [`CryptoError`]) convert into [`Error`]
//! so that `?` works across the container, index and session layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Invalid container {path}: {reason}")]
    InvalidContainer { path: PathBuf, reason: String },

    #[error("Container {0} is encrypted and no valid key has been set")]
    KeyRequired(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Entry not found: {directory}{name}")]
    EntryNotFound { directory: String, name: String },

    #[error("No reader registered for container {0}")]
    UnknownContainer(String),

    #[error("A load is already in progress")]
    LoadInProgress,

    #[error("No containers have been loaded yet")]
    NotLoaded,

    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl Error {
    pub(crate) fn invalid_container(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidContainer { path: path.into(), reason: reason.into() }
    }

    /// `true` for the absent-result of a lookup, as opposed to a real fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
