//! Memory and disk caching of preprocessed event samples
//!
//! Preprocessing a recording (denoising, framing, building time surfaces) is
//! usually far more expensive than the random augmentations applied on top.
//! The caches in this crate store the output of a source [`Dataset`] once
//! and re-apply an optional augmentation on every access:
//!
//! - [`MemoryCachedDataset`] keeps samples in a map owned by the instance.
//! - [`DiskCachedDataset`] writes one container file per `(index, copy)`
//!   key and can later serve the directory without any source at all.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use event_data_cache::{DiskCacheConfig, DiskCachedDataset};
//! use event_data_core::{Dataset, InMemoryDataset};
//!
//! # fn main() -> event_data_core::Result<()> {
//! let source: Arc<dyn Dataset> = Arc::new(InMemoryDataset::default());
//! let config = DiskCacheConfig::new("/tmp/event-cache").num_copies(2);
//! let cache = DiskCachedDataset::new(Some(source), config)?;
//! cache.populate()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Dataset`]: event_data_core::Dataset

#![warn(missing_docs)]

pub mod container;
pub mod disk;
pub mod key;
pub mod memory;

pub use container::{decode_sample, encode_sample, StoredArray};
pub use disk::{DiskCacheConfig, DiskCachedDataset};
pub use key::{CacheIndex, CacheKey};
pub use memory::MemoryCachedDataset;

static_assertions::assert_impl_all!(
    MemoryCachedDataset<event_data_core::InMemoryDataset>: Send,
    Sync
);
