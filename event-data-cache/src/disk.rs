//! Persistent per-sample cache on disk
//!
//! Each computed sample lands in its own container file under the cache
//! directory. Writes are published atomically, so concurrent readers see
//! either no entry or a complete one, and racing writers of the same key
//! both succeed with the last rename winning.
//!
//! The directory is the source of truth. An entry file published by another
//! instance or process is served, never rewritten.
//!
//! Entries are trusted as-is: when the preprocessing pipeline changes, the
//! old files keep being served until the cache is reset.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use event_data_core::dataset::{apply_transforms, child_rng};
use event_data_core::io::{write_atomic, MemoryMappedFile};
use event_data_core::{Dataset, Error, Result, Sample, TargetTransform, Transform};

use crate::container::{decode_sample, encode_sample};
use crate::key::{CacheIndex, CacheKey};

/// Configuration for a [`DiskCachedDataset`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCacheConfig {
    /// Directory holding the entry files
    pub cache_path: PathBuf,

    /// Number of stored variants per sample
    pub num_copies: usize,

    /// Wipe the directory when the cache is opened
    pub reset_cache: bool,

    /// Seed for augmentations; entropy when unset
    pub seed: Option<u64>,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("cache"),
            num_copies: 1,
            reset_cache: false,
            seed: None,
        }
    }
}

impl DiskCacheConfig {
    /// Create a config for `cache_path` with default settings
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            ..Self::default()
        }
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid cache config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of copies per sample
    #[must_use]
    pub fn num_copies(mut self, num_copies: usize) -> Self {
        self.num_copies = num_copies;
        self
    }

    /// Wipe the directory on open
    #[must_use]
    pub fn reset_cache(mut self, reset_cache: bool) -> Self {
        self.reset_cache = reset_cache;
        self
    }

    /// Seed the augmentation generator
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the settings
    pub fn validate(&self) -> Result<()> {
        if self.num_copies == 0 {
            return Err(Error::config("num_copies must be at least 1"));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(Error::config("cache_path must not be empty"));
        }
        Ok(())
    }
}

/// A dataset backed by a directory of cached samples
///
/// With a source, misses are computed through it and persisted. Without
/// one, the cache serves whatever entries the directory already holds.
pub struct DiskCachedDataset {
    /// Dataset computing missing entries
    source: Option<Arc<dyn Dataset>>,

    /// Settings
    config: DiskCacheConfig,

    /// Computed keys
    index: RwLock<CacheIndex>,

    /// Accesses so far, per sample index
    rotation: Mutex<HashMap<usize, usize>>,

    /// Augmentation applied after loading
    transform: Option<Arc<dyn Transform>>,

    /// Target transform applied after loading
    target_transform: Option<Arc<TargetTransform>>,

    /// Random source for augmentations
    rng: Mutex<StdRng>,
}

static_assertions::assert_impl_all!(DiskCachedDataset: Send, Sync);

impl DiskCachedDataset {
    /// Open a cache directory, creating it if needed
    pub fn new(source: Option<Arc<dyn Dataset>>, config: DiskCacheConfig) -> Result<Self> {
        config.validate()?;
        if config.reset_cache {
            wipe(&config.cache_path)?;
        }
        fs::create_dir_all(&config.cache_path)?;
        let index = CacheIndex::bootstrap(&config.cache_path)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            source,
            config,
            index: RwLock::new(index),
            rotation: Mutex::new(HashMap::new()),
            transform: None,
            target_transform: None,
            rng: Mutex::new(rng),
        })
    }

    /// Attach an augmentation
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a target transform
    pub fn with_target_transform(mut self, target_transform: Arc<TargetTransform>) -> Self {
        self.target_transform = Some(target_transform);
        self
    }

    /// The cache settings
    pub fn config(&self) -> &DiskCacheConfig {
        &self.config
    }

    /// The cache directory
    pub fn cache_path(&self) -> &Path {
        &self.config.cache_path
    }

    /// Number of entry files known to be computed
    pub fn cached_entries(&self) -> usize {
        self.read_index().len()
    }

    /// Delete every entry and start over
    pub fn reset(&self) -> Result<()> {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        wipe(&self.config.cache_path)?;
        fs::create_dir_all(&self.config.cache_path)?;
        index.clear();
        self.rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    /// Compute and persist every missing entry of every copy
    ///
    /// Requires a source.
    pub fn populate(&self) -> Result<()> {
        let source = self.require_source()?;
        let keys: Vec<CacheKey> = {
            let index = self.read_index();
            (0..source.len())
                .flat_map(|i| (0..self.config.num_copies).map(move |c| CacheKey::new(i, c)))
                .filter(|key| !index.contains(*key))
                .collect()
        };
        tracing::info!(entries = keys.len(), path = %self.cache_path().display(), "populating cache");

        #[cfg(feature = "parallel")]
        let result = {
            use rayon::prelude::*;
            keys.par_iter().try_for_each(|key| self.fill(source, *key))
        };

        #[cfg(not(feature = "parallel"))]
        let result = keys.iter().try_for_each(|key| self.fill(source, *key));

        result
    }

    fn require_source(&self) -> Result<&dyn Dataset> {
        self.source
            .as_deref()
            .ok_or_else(|| Error::config("populating a cache requires a source dataset"))
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, CacheIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the per-index counter, returning the access number
    fn next_access(&self, index: usize) -> usize {
        let mut rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = rotation.entry(index).or_insert(0);
        let access = *counter;
        *counter = counter.wrapping_add(1);
        access
    }

    /// Make sure an entry file exists for `key` without rewriting one
    fn fill(&self, source: &dyn Dataset, key: CacheKey) -> Result<()> {
        if key.path(self.cache_path()).is_file() {
            self.mark(key);
            return Ok(());
        }
        self.compute(source, key).map(|_| ())
    }

    /// Run the source for one key and publish the entry
    fn compute(&self, source: &dyn Dataset, key: CacheKey) -> Result<Sample> {
        let sample = source.get(key.index)?;
        let bytes = encode_sample(&sample)?;
        write_atomic(key.path(self.cache_path()), &bytes)?;
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        tracing::debug!(%key, bytes = bytes.len(), "persisted cache entry");
        Ok(sample)
    }

    fn load(&self, key: CacheKey) -> Result<Sample> {
        let file = MemoryMappedFile::open(key.path(self.cache_path()))?;
        decode_sample(file.as_slice())
    }

    /// Fetch the stored sample for `index`, computing it on a miss
    fn stored(&self, index: usize) -> Result<Sample> {
        let Some(source) = self.source.as_deref() else {
            return self.stored_without_source(index);
        };

        let len = source.len();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        let key = CacheKey::new(index, self.next_access(index) % self.config.num_copies);
        self.load_or_compute(source, key)
    }

    /// Serve the entry file for `key` if one exists, otherwise compute it
    ///
    /// The directory is checked even when the index lacks the key, since
    /// other instances may have published it after this one bootstrapped.
    /// Only a missing file counts as uncomputed.
    fn load_or_compute(&self, source: &dyn Dataset, key: CacheKey) -> Result<Sample> {
        match self.load(key) {
            Ok(sample) => {
                self.mark(key);
                tracing::debug!(%key, "disk cache hit");
                Ok(sample)
            }
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%key, "disk cache miss");
                self.compute(source, key)
            }
            Err(e) => Err(e),
        }
    }

    /// Record a key found on disk
    fn mark(&self, key: CacheKey) {
        if !self.read_index().contains(key) {
            self.index
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key);
        }
    }

    fn stored_without_source(&self, index: usize) -> Result<Sample> {
        let (len, copies) = {
            let cache = self.read_index();
            (cache.num_indices(), cache.copies(index))
        };
        if index >= len || copies.is_empty() {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        let copy = copies[self.next_access(index) % copies.len()];
        let key = CacheKey::new(index, copy);
        let sample = self.load(key)?;
        tracing::debug!(%key, "disk cache hit");
        Ok(sample)
    }
}

impl Dataset for DiskCachedDataset {
    /// Source length, or the number of cached indices without a source
    fn len(&self) -> usize {
        match &self.source {
            Some(source) => source.len(),
            None => self.read_index().num_indices(),
        }
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let sample = self.stored(index)?;
        let mut rng = child_rng(&self.rng);
        apply_transforms(
            sample,
            self.transform.as_deref(),
            self.target_transform.as_deref(),
            &mut rng,
        )
    }
}

/// Remove a cache directory and everything in it
fn wipe(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::info!(path = %dir.display(), "reset disk cache");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
