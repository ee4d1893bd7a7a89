//! Augmentations and representation builders for event streams
//!
//! [`functional`] holds the pure kernels. [`transforms`] wraps each kernel in
//! a configurable struct implementing [`event_data_core::Transform`], so it
//! can be chained with [`event_data_core::Compose`] and attached to a dataset.
//!
//! ```
//! use event_data_core::{Compose, Representation, SensorSize, Transform};
//! use event_data_transforms::transforms::{DropEvent, RandomFlipLR, ToFrame};
//! use event_data_transforms::FrameConfig;
//! use std::sync::Arc;
//!
//! let size = SensorSize::new(34, 34, 2);
//! let stages: Vec<Arc<dyn Transform>> = vec![
//!     Arc::new(RandomFlipLR::new(size, 0.5).unwrap()),
//!     Arc::new(DropEvent::new(0.1).unwrap()),
//!     Arc::new(ToFrame::new(size, FrameConfig::default().n_time_bins(3)).unwrap()),
//! ];
//! let pipeline = Compose::new(stages);
//!
//! let mut rng = rand::thread_rng();
//! let events = event_data_core::synthetic::random_events(size, 1000, &mut rng);
//! let frames = pipeline.apply(&Representation::from(events), &mut rng).unwrap();
//! assert_eq!(frames.shape(), vec![3, 2, 34, 34]);
//! ```

#![warn(missing_docs)]

pub mod functional;
pub mod transforms;

pub use functional::{Decay, DownsamplingMethod, SliceStrategy};
pub use transforms::FrameConfig;
