//! Load settings: where containers live and which key opens them.
//!
//! Stored as JSON; every field has a default so a partial file is valid:
//!
//! ```json
//! { "archive_dir": "/games/paks", "key": "0xb5db…2d3e", "extension": "pak" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::EXTENSION;
use crate::crypto::ArchiveKey;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub archive_dir: PathBuf,
    /// Shared key for every container; `None` admits unencrypted ones only.
    pub key: Option<String>,
    /// Container file extension, with or without the leading dot.
    pub extension: String,
    /// Open and key-test containers on the rayon pool (`parallel` feature).
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("."),
            key: None,
            extension: EXTENSION.to_owned(),
            parallel: true,
        }
    }
}

impl Settings {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self { archive_dir: archive_dir.into(), ..Self::default() }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension().is_empty() {
            return Err(Error::Settings("extension must not be empty".into()));
        }
        self.archive_key()?;
        Ok(())
    }

    /// The extension without its leading dot.
    pub fn extension(&self) -> &str {
        self.extension.trim().trim_start_matches('.')
    }

    pub fn archive_key(&self) -> Result<Option<ArchiveKey>> {
        match &self.key {
            Some(raw) => raw.parse::<ArchiveKey>()
                .map(Some)
                .map_err(|e| Error::InvalidKey(e.to_string())),
            None => Ok(None),
        }
    }
}
