//! Virtual path handling shared by the index and the tree builder.
//!
//! Paths inside containers are case-insensitive.  A [`DirectoryPath`] keeps
//! the casing it was first seen with for display, and compares, hashes and
//! orders on a case-folded key.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-fold a path fragment for comparison.
pub fn fold(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_uppercase) {
        Cow::Owned(s.to_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
}

/// Normalize a full entry path: forward slashes, no empty or `.` segments,
/// no leading or trailing separator.
pub fn normalize_entry_path(raw: &str) -> String {
    segments(raw).collect::<Vec<_>>().join("/")
}

/// Split a full entry path into its directory and file name.
pub fn split_entry_path(raw: &str) -> (DirectoryPath, String) {
    let normalized = normalize_entry_path(raw);
    match normalized.rfind('/') {
        Some(pos) => (DirectoryPath::new(&normalized[..pos]), normalized[pos + 1..].to_owned()),
        None      => (DirectoryPath::root(), normalized),
    }
}

/// File name without its last extension (`Hero.uasset` → `Hero`).
///
/// A leading dot does not start an extension (`.config` stays `.config`).
pub fn display_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[..pos],
        _                    => file_name,
    }
}

/// Extension after the last dot, without the dot; empty when there is none.
pub fn extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[pos + 1..],
        _                    => "",
    }
}

// ── DirectoryPath ────────────────────────────────────────────────────────────

/// Normalized directory key: `Characters/Heroes/`, or `""` for the root.
#[derive(Clone)]
pub struct DirectoryPath {
    display: String,
    key: String,
}

impl DirectoryPath {
    pub fn root() -> Self {
        Self { display: String::new(), key: String::new() }
    }

    pub fn new(raw: &str) -> Self {
        let mut display = String::with_capacity(raw.len() + 1);
        for segment in segments(raw) {
            display.push_str(segment);
            display.push('/');
        }
        let key = fold(&display).into_owned();
        Self { display, key }
    }

    /// Display form, with the casing it was first registered under.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Case-folded comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_root(&self) -> bool {
        self.display.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.display.split('/').filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl PartialEq for DirectoryPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DirectoryPath {}

impl Hash for DirectoryPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for DirectoryPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirectoryPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Debug for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectoryPath({:?})", self.display)
    }
}

impl fmt::Display for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for DirectoryPath {
    fn from(raw: &str) -> Self {
        DirectoryPath::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trailing_separators_and_case_collapse() {
        let a = DirectoryPath::new("Characters/Heroes");
        let b = DirectoryPath::new("characters\\heroes\\\\");
        let c = DirectoryPath::new("/CHARACTERS/./Heroes/");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.as_str(), "Characters/Heroes/");
        assert_eq!(b.as_str(), "characters/heroes/");
        assert_eq!(a.key(), "characters/heroes/");
        assert_eq!(a.depth(), 2);
    }

    #[test]
    fn empty_path_is_root() {
        assert!(DirectoryPath::new("").is_root());
        assert!(DirectoryPath::new("//").is_root());
        assert_eq!(DirectoryPath::root().segments().count(), 0);
    }

    #[test]
    fn splits_entry_paths() {
        let (dir, name) = split_entry_path("Characters\\Hero.uasset");
        assert_eq!(dir.as_str(), "Characters/");
        assert_eq!(name, "Hero.uasset");

        let (dir, name) = split_entry_path("readme.txt");
        assert!(dir.is_root());
        assert_eq!(name, "readme.txt");
    }

    #[test]
    fn names_and_extensions() {
        assert_eq!(display_name("Hero.uasset"), "Hero");
        assert_eq!(extension("Hero.uasset"), "uasset");
        assert_eq!(display_name("archive.tar.gz"), "archive.tar");
        assert_eq!(extension("archive.tar.gz"), "gz");
        assert_eq!(display_name("Makefile"), "Makefile");
        assert_eq!(extension("Makefile"), "");
        assert_eq!(display_name(".config"), ".config");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[A-Za-z0-9_/\\\\.]{0,40}") {
            let once = DirectoryPath::new(&raw);
            let twice = DirectoryPath::new(once.as_str());
            prop_assert_eq!(once.as_str(), twice.as_str());
        }

        #[test]
        fn case_never_splits_keys(raw in "[A-Za-z/]{0,30}") {
            let upper = DirectoryPath::new(&raw.to_uppercase());
            let lower = DirectoryPath::new(&raw.to_lowercase());
            prop_assert_eq!(upper, lower);
        }
    }
}
