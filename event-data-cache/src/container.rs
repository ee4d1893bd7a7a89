//! Self-describing on-disk container for cached samples
//!
//! Layout: the magic bytes `EVDC`, a little-endian `u16` format version, then
//! a bincode payload holding named arrays. Every array carries its own dtype
//! tag and shape, so a container can be decoded without knowing which
//! pipeline produced it. A sample container holds exactly two arrays, `data`
//! and `target`.
//!
//! Limitation: `data` must map onto a [`Representation`]. Events, rank-3 or
//! rank-4 `i64` arrays and rank-4 `f64` arrays load as-is, whatever their
//! shape. Any other rank has no representation and fails with
//! [`Error::Format`] instead of being served.

use ndarray::{ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, Event, Representation, Result, Sample, Target};

/// Leading bytes of every container
pub const MAGIC: [u8; 4] = *b"EVDC";

/// Current container format version
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + std::mem::size_of::<u16>();

const DATA: &str = "data";
const TARGET: &str = "target";

/// A dtype-tagged array as stored in a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredArray {
    /// Structured event records
    Events(Vec<Event>),

    /// Signed integer tensor in row-major order
    Int64 {
        /// Dimensions
        shape: Vec<usize>,
        /// Flattened values
        values: Vec<i64>,
    },

    /// Floating point tensor in row-major order
    Float64 {
        /// Dimensions
        shape: Vec<usize>,
        /// Flattened values
        values: Vec<f64>,
    },

    /// Absent value
    Null,
}

impl StoredArray {
    /// The dtype tag
    pub fn dtype(&self) -> &'static str {
        match self {
            StoredArray::Events(_) => "events",
            StoredArray::Int64 { .. } => "i64",
            StoredArray::Float64 { .. } => "f64",
            StoredArray::Null => "null",
        }
    }

    fn int64<D: Dimension>(array: &ndarray::Array<i64, D>) -> Self {
        StoredArray::Int64 {
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
        }
    }

    fn float64<D: Dimension>(array: &ndarray::Array<f64, D>) -> Self {
        StoredArray::Float64 {
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
        }
    }
}

/// Named arrays in write order
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    arrays: Vec<(String, StoredArray)>,
}

impl From<&Representation> for StoredArray {
    fn from(data: &Representation) -> Self {
        match data {
            Representation::Events(events) => StoredArray::Events(events.as_slice().to_vec()),
            Representation::Image(image) => StoredArray::int64(image),
            Representation::Frames(frames) => StoredArray::int64(frames),
            Representation::Surfaces(surfaces) => StoredArray::float64(surfaces),
        }
    }
}

impl From<&Target> for StoredArray {
    fn from(target: &Target) -> Self {
        match target {
            Target::None => StoredArray::Null,
            Target::Class(class) => StoredArray::Int64 {
                shape: Vec::new(),
                values: vec![*class],
            },
            Target::Tensor(tensor) => StoredArray::float64(tensor),
        }
    }
}

fn dense<A>(shape: Vec<usize>, values: Vec<A>) -> Result<ArrayD<A>> {
    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| Error::ShapeMismatch(format!("stored array of shape {shape:?}: {e}")))
}

fn fixed_rank<A, D: Dimension>(array: ArrayD<A>) -> Result<ndarray::Array<A, D>> {
    array
        .into_dimensionality::<D>()
        .map_err(|e| Error::ShapeMismatch(e.to_string()))
}

impl TryFrom<StoredArray> for Representation {
    type Error = Error;

    fn try_from(array: StoredArray) -> Result<Self> {
        match array {
            StoredArray::Events(events) => Ok(Representation::Events(events.into_iter().collect())),
            StoredArray::Int64 { shape, values } => match shape.len() {
                3 => Ok(Representation::Image(fixed_rank(dense(shape, values)?)?)),
                4 => Ok(Representation::Frames(fixed_rank(dense(shape, values)?)?)),
                rank => Err(Error::Format(format!("no i64 representation of rank {rank}"))),
            },
            StoredArray::Float64 { shape, values } if shape.len() == 4 => {
                Ok(Representation::Surfaces(fixed_rank(dense(shape, values)?)?))
            }
            other => Err(Error::Format(format!(
                "{} array of this shape is not sample data",
                other.dtype()
            ))),
        }
    }
}

impl TryFrom<StoredArray> for Target {
    type Error = Error;

    fn try_from(array: StoredArray) -> Result<Self> {
        match array {
            StoredArray::Null => Ok(Target::None),
            StoredArray::Int64 { shape, values } if shape.is_empty() => match values.as_slice() {
                [class] => Ok(Target::Class(*class)),
                _ => Err(Error::Format("scalar target must hold one value".into())),
            },
            StoredArray::Float64 { shape, values } => Ok(Target::Tensor(dense(shape, values)?)),
            other => Err(Error::Format(format!(
                "{} array cannot be a target",
                other.dtype()
            ))),
        }
    }
}

/// Serialize a sample into container bytes
pub fn encode_sample(sample: &Sample) -> Result<Vec<u8>> {
    let payload = Payload {
        arrays: vec![
            (DATA.to_string(), StoredArray::from(&sample.data)),
            (TARGET.to_string(), StoredArray::from(&sample.target)),
        ],
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + sample.memory_usage());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, &payload)?;
    Ok(bytes)
}

/// Parse container bytes back into a sample
pub fn decode_sample(bytes: &[u8]) -> Result<Sample> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Format(format!(
            "container is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[..MAGIC.len()] != MAGIC {
        return Err(Error::Format("missing EVDC magic".into()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(Error::Format(format!(
            "unsupported container version {version}, expected {FORMAT_VERSION}"
        )));
    }

    let payload: Payload = bincode::deserialize(body)?;
    let mut data = None;
    let mut target = None;
    for (name, array) in payload.arrays {
        let slot = match name.as_str() {
            DATA => &mut data,
            TARGET => &mut target,
            _ => return Err(Error::Format(format!("unexpected array '{name}'"))),
        };
        if slot.replace(array).is_some() {
            return Err(Error::Format(format!("duplicate array '{name}'")));
        }
    }

    match (data, target) {
        (Some(data), Some(target)) => Ok(Sample {
            data: data.try_into()?,
            target: target.try_into()?,
        }),
        _ => Err(Error::Format("container must hold 'data' and 'target'".into())),
    }
}
