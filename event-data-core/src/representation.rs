//! Values that flow through transform pipelines and caches
//!
//! A pipeline starts from an [`EventStream`] and may end in a dense tensor.
//! Dense layouts follow a fixed axis convention:
//!
//! - [`Representation::Image`]: `[polarity, height, width]` event counts
//! - [`Representation::Frames`]: `[bin, polarity, height, width]` event counts
//! - [`Representation::Surfaces`]: `[event, polarity, surface_height, surface_width]`
//!   decayed recency scores

use ndarray::{Array3, Array4, ArrayD};

use crate::error::{Error, Result};
use crate::event::EventStream;

/// Data produced by a source or a transform
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// Sparse event list
    Events(EventStream),

    /// Time-collapsed accumulation frame
    Image(Array3<i64>),

    /// Binned frames (a raster)
    Frames(Array4<i64>),

    /// Per-event or per-interval time surfaces
    Surfaces(Array4<f64>),
}

impl Representation {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Representation::Events(_) => "events",
            Representation::Image(_) => "image",
            Representation::Frames(_) => "frames",
            Representation::Surfaces(_) => "surfaces",
        }
    }

    /// Borrow the event list, if this is one
    pub fn as_events(&self) -> Option<&EventStream> {
        match self {
            Representation::Events(events) => Some(events),
            _ => None,
        }
    }

    /// Borrow the event list or report which transform rejected the input
    pub fn expect_events(&self, transform: &str) -> Result<&EventStream> {
        self.as_events().ok_or_else(|| self.unsupported(transform))
    }

    /// Consume into the event list, if this is one
    pub fn into_events(self) -> Option<EventStream> {
        match self {
            Representation::Events(events) => Some(events),
            _ => None,
        }
    }

    /// Borrow the frames, if this is a raster
    pub fn as_frames(&self) -> Option<&Array4<i64>> {
        match self {
            Representation::Frames(frames) => Some(frames),
            _ => None,
        }
    }

    /// Borrow the image, if this is one
    pub fn as_image(&self) -> Option<&Array3<i64>> {
        match self {
            Representation::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Borrow the surfaces, if these are time surfaces
    pub fn as_surfaces(&self) -> Option<&Array4<f64>> {
        match self {
            Representation::Surfaces(surfaces) => Some(surfaces),
            _ => None,
        }
    }

    /// Shape of the value; event lists report `[len]`
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Representation::Events(events) => vec![events.len()],
            Representation::Image(image) => image.shape().to_vec(),
            Representation::Frames(frames) => frames.shape().to_vec(),
            Representation::Surfaces(surfaces) => surfaces.shape().to_vec(),
        }
    }

    /// Error for a transform that cannot handle this variant
    pub fn unsupported(&self, transform: &str) -> Error {
        Error::UnsupportedInput {
            transform: transform.to_string(),
            input: self.kind(),
        }
    }

    /// Approximate heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Representation::Events(events) => events.memory_usage(),
            Representation::Image(image) => image.len() * std::mem::size_of::<i64>(),
            Representation::Frames(frames) => frames.len() * std::mem::size_of::<i64>(),
            Representation::Surfaces(surfaces) => surfaces.len() * std::mem::size_of::<f64>(),
        }
    }
}

impl From<EventStream> for Representation {
    fn from(events: EventStream) -> Self {
        Representation::Events(events)
    }
}

impl From<Array3<i64>> for Representation {
    fn from(image: Array3<i64>) -> Self {
        Representation::Image(image)
    }
}

impl From<Array4<i64>> for Representation {
    fn from(frames: Array4<i64>) -> Self {
        Representation::Frames(frames)
    }
}

impl From<Array4<f64>> for Representation {
    fn from(surfaces: Array4<f64>) -> Self {
        Representation::Surfaces(surfaces)
    }
}

/// Label attached to a sample
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Target {
    /// No label
    #[default]
    None,

    /// Class index
    Class(i64),

    /// Dense numeric target of any shape
    Tensor(ArrayD<f64>),
}

impl Target {
    /// Class index, if this is a class label
    pub fn as_class(&self) -> Option<i64> {
        match self {
            Target::Class(class) => Some(*class),
            _ => None,
        }
    }
}

impl From<i64> for Target {
    fn from(class: i64) -> Self {
        Target::Class(class)
    }
}

/// A `(data, target)` pair as served by a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sample data
    pub data: Representation,

    /// Sample label
    pub target: Target,
}

impl Sample {
    /// Create a new sample
    pub fn new(data: impl Into<Representation>, target: impl Into<Target>) -> Self {
        Self {
            data: data.into(),
            target: target.into(),
        }
    }

    /// Approximate heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        let target = match &self.target {
            Target::Tensor(t) => t.len() * std::mem::size_of::<f64>(),
            _ => 0,
        };
        self.data.memory_usage() + target
    }
}
