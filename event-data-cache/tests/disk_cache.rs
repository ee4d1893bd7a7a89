use std::fs;
use std::sync::{Arc, Once};
use std::thread;

use anyhow::Result;
use event_data_cache::{decode_sample, encode_sample, DiskCacheConfig, DiskCachedDataset};
use event_data_core::synthetic::random_events;
use event_data_core::{
    Compose, Dataset, DatasetExt, Error, InMemoryDataset, Representation, Sample, SensorSize,
    Transform, TransformedDataset,
};
use event_data_transforms::transforms::{Denoise, DropEvent, RandomFlipLR, ToFrame, ToImage};
use event_data_transforms::FrameConfig;
use mockall::mock;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SIZE: SensorSize = SensorSize::new(34, 34, 2);

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

fn recordings(n: usize) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(11);
    InMemoryDataset::new(
        (0..n)
            .map(|i| Sample::new(random_events(SIZE, 2_000, &mut rng), i as i64))
            .collect(),
    )
}

fn framed(n: usize) -> Arc<dyn Dataset> {
    let stages: Vec<Arc<dyn Transform>> = vec![
        Arc::new(Denoise::new(20_000).unwrap()),
        Arc::new(ToFrame::new(SIZE, FrameConfig::default().n_time_bins(4)).unwrap()),
    ];
    Arc::new(TransformedDataset::new(recordings(n), Compose::new(stages)))
}

fn thinned(n: usize, seed: u64) -> Arc<dyn Dataset> {
    let drop = DropEvent::new((0.1, 0.9)).unwrap();
    Arc::new(TransformedDataset::new(recordings(n), drop).with_seed(seed))
}

fn imaged(n: usize) -> Arc<dyn Dataset> {
    Arc::new(TransformedDataset::new(recordings(n), ToImage::new(SIZE).unwrap()))
}

mock! {
    Decoder {}

    impl Dataset for Decoder {
        fn len(&self) -> usize;
        fn get(&self, index: usize) -> event_data_core::Result<Sample>;
    }
}

#[test]
fn test_recompute_after_reset_is_byte_identical() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cache = DiskCachedDataset::new(Some(framed(3)), DiskCacheConfig::new(dir.path()))?;

    let first = cache.get(1)?;
    let entry = dir.path().join("1_0.evc");
    let before = fs::read(&entry)?;
    assert_eq!(decode_sample(&before)?, first);

    cache.reset()?;
    assert_eq!(cache.cached_entries(), 0);
    assert!(!entry.exists());

    let second = cache.get(1)?;
    assert_eq!(second, first);
    assert_eq!(fs::read(&entry)?, before);
    Ok(())
}

#[test]
fn test_stale_entries_until_reset() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let old = DiskCachedDataset::new(Some(imaged(2)), DiskCacheConfig::new(dir.path()))?;
    assert_eq!(old.get(0)?.data.kind(), "image");

    // Changed preprocessing, same directory: the old entry is still served
    let stale = DiskCachedDataset::new(Some(framed(2)), DiskCacheConfig::new(dir.path()))?;
    assert_eq!(stale.get(0)?.data.kind(), "image");
    assert_eq!(stale.get(1)?.data.kind(), "frames");

    let fresh = DiskCachedDataset::new(
        Some(framed(2)),
        DiskCacheConfig::new(dir.path()).reset_cache(true),
    )?;
    assert_eq!(fresh.cached_entries(), 0);
    assert_eq!(fresh.get(0)?.data.shape(), vec![4, 2, 34, 34]);
    Ok(())
}

#[test]
fn test_sourceless_cache_serves_directory() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = DiskCacheConfig::new(dir.path()).num_copies(2);
    let writer = DiskCachedDataset::new(Some(framed(5)), config.clone())?;
    writer.populate()?;
    let expected: Vec<Sample> = writer.iter().collect::<event_data_core::Result<_>>()?;

    let reader = DiskCachedDataset::new(None, config)?;
    assert_eq!(reader.len(), 5);
    let served: Vec<Sample> = reader.iter().collect::<event_data_core::Result<_>>()?;
    assert_eq!(served, expected);
    assert!(matches!(
        reader.get(5),
        Err(Error::IndexOutOfBounds { index: 5, len: 5 })
    ));
    Ok(())
}

#[test]
fn test_sourceless_rotation_over_present_copies() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = Sample::new(Representation::from(random_events(SIZE, 10, &mut StdRng::seed_from_u64(1))), 0_i64);
    let b = Sample::new(Representation::from(random_events(SIZE, 10, &mut StdRng::seed_from_u64(2))), 0_i64);
    fs::write(dir.path().join("0_0.evc"), encode_sample(&a)?)?;
    fs::write(dir.path().join("0_3.evc"), encode_sample(&b)?)?;

    let reader = DiskCachedDataset::new(None, DiskCacheConfig::new(dir.path()))?;
    assert_eq!(reader.len(), 1);
    let served: Vec<Sample> = (0..4).map(|_| reader.get(0)).collect::<event_data_core::Result<_>>()?;
    assert_eq!(served, vec![a.clone(), b.clone(), a, b]);
    Ok(())
}

#[test]
fn test_augmentation_never_reaches_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source: Arc<dyn Dataset> = Arc::new(recordings(1));
    let stored = source.get(0)?;

    let cache = DiskCachedDataset::new(Some(source), DiskCacheConfig::new(dir.path()).seed(9))?
        .with_transform(Arc::new(RandomFlipLR::new(SIZE, 1.0)?));
    let flipped = cache.get(0)?;
    assert_ne!(flipped, stored);
    assert_eq!(flipped.target, stored.target);

    let on_disk = decode_sample(&fs::read(dir.path().join("0_0.evc"))?)?;
    assert_eq!(on_disk, stored);
    assert_eq!(cache.get(0)?, flipped);
    Ok(())
}

#[test]
fn test_concurrent_readers_and_writers() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let source = framed(6);
    let expected: Vec<Sample> = source.iter().collect::<event_data_core::Result<_>>()?;
    let cache = Arc::new(DiskCachedDataset::new(
        Some(source),
        DiskCacheConfig::new(dir.path()).num_copies(2),
    )?);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || -> event_data_core::Result<Vec<Sample>> {
                (0..cache.len())
                    .map(|i| cache.get((i + worker) % cache.len()))
                    .collect()
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let samples = handle.join().expect("worker panicked")?;
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample, &expected[(i + worker) % expected.len()]);
        }
    }

    let leftovers = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| event_data_core::io::is_temporary(&e.path()))
        .count();
    assert_eq!(leftovers, 0);
    assert_eq!(cache.cached_entries(), 12);
    Ok(())
}

#[test]
fn test_source_error_propagates_and_nothing_is_written() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut decoder = MockDecoder::new();
    decoder.expect_len().return_const(4_usize);
    decoder
        .expect_get()
        .withf(|&index| index == 2)
        .returning(|_| Err(Error::Source("truncated recording".into())));

    let cache = DiskCachedDataset::new(Some(Arc::new(decoder)), DiskCacheConfig::new(dir.path()))?;
    let err = cache.get(2).unwrap_err();
    assert_eq!(err.to_string(), "Source error: truncated recording");
    assert_eq!(cache.cached_entries(), 0);
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);

    assert!(matches!(
        cache.get(4),
        Err(Error::IndexOutOfBounds { index: 4, len: 4 })
    ));
    Ok(())
}

#[test]
fn test_entries_from_another_worker_are_not_rewritten() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // Both open before anything is written, so neither index knows the other's entries
    let first = DiskCachedDataset::new(Some(thinned(2, 1)), DiskCacheConfig::new(dir.path()))?;
    let second = DiskCachedDataset::new(Some(thinned(2, 2)), DiskCacheConfig::new(dir.path()))?;
    assert_eq!(second.cached_entries(), 0);

    let written = first.get(0)?;
    first.get(1)?;
    let entry_0 = fs::read(dir.path().join("0_0.evc"))?;
    let entry_1 = fs::read(dir.path().join("1_0.evc"))?;

    assert_eq!(second.get(0)?, written);
    assert_eq!(second.cached_entries(), 1);
    second.populate()?;
    assert_eq!(second.cached_entries(), 2);

    assert_eq!(fs::read(dir.path().join("0_0.evc"))?, entry_0);
    assert_eq!(fs::read(dir.path().join("1_0.evc"))?, entry_1);
    Ok(())
}
