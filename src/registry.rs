//! Container discovery: list candidate files in the configured directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct ContainerRegistry {
    dir: PathBuf,
    extension: String,
}

impl ContainerRegistry {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.trim().trim_start_matches('.').to_owned(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.archive_dir, settings.extension())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// Regular files directly inside the directory whose extension matches,
    /// sorted by file name so loads are reproducible.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.accepts(&path) {
                found.push(path);
            }
        }
        found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(dir = %self.dir.display(), containers = found.len(), "discovered containers");
        Ok(found)
    }
}
