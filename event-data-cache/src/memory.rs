//! In-memory sample cache

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rand::rngs::StdRng;
use rand::SeedableRng;

use event_data_core::dataset::{apply_transforms, child_rng};
use event_data_core::{Dataset, Error, Result, Sample, TargetTransform, Transform};

/// Keeps every sample of a source dataset in memory after its first access
///
/// The source output is cached as-is. The optional augmentation and target
/// transform run on every access and their results are never stored, so
/// each epoch sees fresh random augmentations of the same preprocessed data.
pub struct MemoryCachedDataset<D> {
    /// The wrapped dataset
    source: D,

    /// Cached source samples by index
    samples: RwLock<HashMap<usize, Sample>>,

    /// Augmentation applied after the cache
    transform: Option<Arc<dyn Transform>>,

    /// Target transform applied after the cache
    target_transform: Option<Arc<TargetTransform>>,

    /// Random source for augmentations
    rng: Mutex<StdRng>,
}

impl<D: Dataset> MemoryCachedDataset<D> {
    /// Wrap a dataset
    pub fn new(source: D) -> Self {
        Self {
            source,
            samples: RwLock::new(HashMap::new()),
            transform: None,
            target_transform: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
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

    /// Make augmentations reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get a reference to the wrapped dataset
    pub fn source(&self) -> &D {
        &self.source
    }

    /// Number of samples currently held
    pub fn cached_len(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Approximate heap footprint of the held samples in bytes
    pub fn memory_usage(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Sample::memory_usage)
            .sum()
    }

    /// Drop every held sample
    pub fn clear(&self) {
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, index: usize) -> Result<Sample> {
        let hit = self
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned();
        if let Some(sample) = hit {
            tracing::debug!(index, "memory cache hit");
            return Ok(sample);
        }

        // Computed outside the lock; a racing thread may insert first
        let sample = self.source.get(index)?;
        tracing::debug!(index, "memory cache miss");
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        Ok(samples.entry(index).or_insert(sample).clone())
    }
}

impl<D: Dataset> Dataset for MemoryCachedDataset<D> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        let sample = self.cached(index)?;
        let mut rng = child_rng(&self.rng);
        apply_transforms(
            sample,
            self.transform.as_deref(),
            self.target_transform.as_deref(),
            &mut rng,
        )
    }
}
