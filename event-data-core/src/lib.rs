//! Core traits, data structures, and abstractions for neuromorphic event pipelines
//!
//! This crate provides the foundational components shared by the transform
//! library and the caching layer: the event stream model, randomized
//! parameters, dense representations, the [`Transform`] trait with its
//! [`Compose`] pipeline, and the [`Dataset`] abstraction.

#![warn(missing_docs)]

pub mod dataset;
pub mod error;
pub mod event;
pub mod io;
pub mod param;
pub mod representation;
pub mod synthetic;
pub mod transform;

// Re-export key types for convenience
pub use dataset::{Dataset, DatasetExt, InMemoryDataset, TargetTransform, TransformedDataset};
pub use error::{Error, Result};
pub use event::{Event, EventStream, SensorSize};
pub use param::Param;
pub use representation::{Representation, Sample, Target};
pub use transform::{Compose, Transform};
