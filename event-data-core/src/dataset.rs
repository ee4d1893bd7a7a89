//! Dataset trait and implementations
//!
//! A [`Dataset`] is any indexable provider of [`Sample`]s. Sensor file
//! decoders implement it upstream; [`TransformedDataset`] attaches a
//! preprocessing pipeline, and the caching crate wraps either of them.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::representation::{Sample, Target};
use crate::transform::Transform;

/// Function applied to a sample's target
pub type TargetTransform = dyn Fn(&Target) -> Result<Target> + Send + Sync;

/// An indexable collection of samples
pub trait Dataset: Send + Sync {
    /// Number of samples
    fn len(&self) -> usize;

    /// Fetch the sample at `index`
    fn get(&self, index: usize) -> Result<Sample>;

    /// Whether the dataset has no samples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

impl<D: Dataset + ?Sized> Dataset for Box<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

/// Iteration over any dataset
pub trait DatasetExt: Dataset {
    /// Iterate over every sample in index order, stopping at `len()`
    fn iter(&self) -> DatasetIter<'_, Self> {
        DatasetIter {
            dataset: self,
            index: 0,
            len: self.len(),
        }
    }
}

impl<D: Dataset + ?Sized> DatasetExt for D {}

/// Iterator over the samples of a dataset
pub struct DatasetIter<'a, D: ?Sized> {
    /// The dataset being iterated
    dataset: &'a D,

    /// The next index to fetch
    index: usize,

    /// Length captured when iteration started
    len: usize,
}

impl<D: Dataset + ?Sized> Iterator for DatasetIter<'_, D> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let item = self.dataset.get(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<D: Dataset + ?Sized> ExactSizeIterator for DatasetIter<'_, D> {}

/// An in-memory dataset backed by a vector of samples
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    /// The samples
    samples: Vec<Sample>,
}

impl InMemoryDataset {
    /// Create a new in-memory dataset
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Get the samples in this dataset
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.samples.len(),
            })
    }
}

/// A dataset whose samples pass through a preprocessing pipeline on access
pub struct TransformedDataset<D> {
    /// The wrapped dataset
    inner: D,

    /// Transform applied to the sample data
    transform: Option<Arc<dyn Transform>>,

    /// Transform applied to the sample target
    target_transform: Option<Arc<TargetTransform>>,

    /// Random source for randomized transforms
    rng: Mutex<StdRng>,
}

impl<D: Dataset> TransformedDataset<D> {
    /// Wrap a dataset with a data transform
    pub fn new(inner: D, transform: impl Transform + 'static) -> Self {
        Self {
            inner,
            transform: Some(Arc::new(transform)),
            target_transform: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Wrap a dataset without any transform
    pub fn passthrough(inner: D) -> Self {
        Self {
            inner,
            transform: None,
            target_transform: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Attach a target transform
    pub fn with_target_transform(mut self, target_transform: Arc<TargetTransform>) -> Self {
        self.target_transform = Some(target_transform);
        self
    }

    /// Make randomized transforms reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get a reference to the wrapped dataset
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Dataset> Dataset for TransformedDataset<D> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let sample = self.inner.get(index)?;
        let mut rng = child_rng(&self.rng);
        apply_transforms(
            sample,
            self.transform.as_deref(),
            self.target_transform.as_deref(),
            &mut rng,
        )
    }
}

/// Derive an independent generator from a shared one
///
/// The lock is held only long enough to draw a seed.
pub fn child_rng(rng: &Mutex<StdRng>) -> StdRng {
    let seed = rng.lock().unwrap_or_else(PoisonError::into_inner).gen();
    StdRng::seed_from_u64(seed)
}

/// Apply optional data and target transforms to a sample
pub fn apply_transforms(
    sample: Sample,
    transform: Option<&dyn Transform>,
    target_transform: Option<&TargetTransform>,
    rng: &mut StdRng,
) -> Result<Sample> {
    let data = match transform {
        Some(transform) => transform.apply(&sample.data, rng)?,
        None => sample.data,
    };
    let target = match target_transform {
        Some(target_transform) => target_transform(&sample.target)?,
        None => sample.target,
    };
    Ok(Sample { data, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventStream};
    use crate::representation::Representation;
    use rand::RngCore;

    struct Reverse;

    impl Transform for Reverse {
        fn name(&self) -> &'static str {
            "Reverse"
        }

        fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
            let events = data.expect_events(self.name())?;
            Ok(events.iter().rev().copied().collect::<EventStream>().into())
        }
    }

    fn dataset(n: usize) -> InMemoryDataset {
        InMemoryDataset::new(
            (0..n)
                .map(|i| {
                    let events = EventStream::from_vec(vec![
                        Event::new(0, 0, 0, 0),
                        Event::new(i as i64, 0, 1, 1),
                    ]);
                    Sample::new(events, i as i64)
                })
                .collect(),
        )
    }

    #[test]
    fn test_iteration_stops_at_len() {
        let data = dataset(4);
        let items: Vec<_> = data.iter().collect::<Result<_>>().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(data.iter().len(), 4);
    }

    #[test]
    fn test_out_of_range_index() {
        let err = dataset(2).get(2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 2, len: 2 }));
    }

    #[test]
    fn test_transformed_dataset_applies_both_transforms() {
        let wrapped = TransformedDataset::new(dataset(3), Reverse)
            .with_target_transform(Arc::new(|t: &Target| -> Result<Target> {
                Ok(Target::Class(t.as_class().unwrap_or(0) * 10))
            }));
        let sample = wrapped.get(2).unwrap();
        assert_eq!(sample.data.as_events().unwrap().xs(), vec![2, 0]);
        assert_eq!(sample.target, Target::Class(20));
        assert_eq!(wrapped.len(), 3);
    }
}
