//! Cache keys and the index of computed entries
//!
//! Entries live one file per key, named `{index}_{copy}.evc`, with no
//! manifest. The directory listing is the source of truth for which keys
//! are computed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use event_data_core::io::is_temporary;
use event_data_core::Result;

/// Extension of cache entry files
pub const ENTRY_EXTENSION: &str = "evc";

/// Identifies one stored copy of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Sample index in the source dataset
    pub index: usize,
    /// Copy slot
    pub copy: usize,
}

impl CacheKey {
    /// Create a key
    pub const fn new(index: usize, copy: usize) -> Self {
        Self { index, copy }
    }

    /// File name of the entry
    pub fn file_name(&self) -> String {
        format!("{self}.{ENTRY_EXTENSION}")
    }

    /// Full path of the entry under `dir`
    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Parse an entry file name; anything else yields `None`
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(ENTRY_EXTENSION)?.strip_suffix('.')?;
        let (index, copy) = stem.split_once('_')?;
        if !is_decimal(index) || !is_decimal(copy) {
            return None;
        }
        Some(Self::new(index.parse().ok()?, copy.parse().ok()?))
    }
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.index, self.copy)
    }
}

/// Set of computed keys, grouped by sample index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
    entries: BTreeMap<usize, BTreeSet<usize>>,
}

impl CacheIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from the entry files present in `dir`
    ///
    /// Temporary files from interrupted writes and unrelated files are
    /// skipped. A missing directory yields an empty index.
    pub fn bootstrap(dir: &Path) -> Result<Self> {
        let mut index = Self::new();
        if !dir.exists() {
            return Ok(index);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_temporary(&path) || !path.is_file() {
                continue;
            }
            if let Some(key) = path.file_name().and_then(|n| n.to_str()).and_then(CacheKey::parse) {
                index.insert(key);
            }
        }

        tracing::info!(
            path = %dir.display(),
            indices = index.num_indices(),
            entries = index.len(),
            "bootstrapped cache index"
        );
        Ok(index)
    }

    /// Mark a key as computed
    pub fn insert(&mut self, key: CacheKey) -> bool {
        self.entries.entry(key.index).or_default().insert(key.copy)
    }

    /// Whether a key is computed
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries
            .get(&key.index)
            .is_some_and(|copies| copies.contains(&key.copy))
    }

    /// Computed copy slots of a sample, ascending
    pub fn copies(&self, index: usize) -> Vec<usize> {
        self.entries
            .get(&index)
            .map(|copies| copies.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sample indices with at least one computed copy, ascending
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    /// Number of distinct sample indices
    pub fn num_indices(&self) -> usize {
        self.entries.len()
    }

    /// Total number of computed entries
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing is computed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every key
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0_0.evc", Some(CacheKey::new(0, 0)))]
    #[test_case("12_3.evc", Some(CacheKey::new(12, 3)))]
    #[test_case("12_3.bin", None)]
    #[test_case("12-3.evc", None)]
    #[test_case("_3.evc", None)]
    #[test_case("+1_0.evc", None)]
    #[test_case("1_2_3.evc", None)]
    #[test_case(".1_0.evc.9f0c.tmp", None)]
    fn test_parse(name: &str, expected: Option<CacheKey>) {
        assert_eq!(CacheKey::parse(name), expected);
    }

    #[test]
    fn test_file_name() {
        let key = CacheKey::new(42, 1);
        assert_eq!(key.file_name(), "42_1.evc");
        assert_eq!(CacheKey::parse(&key.file_name()), Some(key));
    }

    #[test]
    fn test_bootstrap_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0_0.evc", "0_1.evc", "5_0.evc", ".3_0.evc.abc.tmp", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("7_0.evc")).unwrap();

        let index = CacheIndex::bootstrap(dir.path()).unwrap();
        assert_eq!(index.num_indices(), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.copies(0), vec![0, 1]);
        assert_eq!(index.indices().collect::<Vec<_>>(), vec![0, 5]);
        assert!(!index.contains(CacheKey::new(3, 0)));
    }

    #[test]
    fn test_bootstrap_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let index = CacheIndex::bootstrap(&dir.path().join("absent")).unwrap();
        assert!(index.is_empty());
    }
}
