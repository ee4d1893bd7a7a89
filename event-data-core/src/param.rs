//! Parameters that are either fixed or sampled from a range
//!
//! Randomized transforms accept a [`Param`] for each tunable value. A range is
//! resolved once per call into a concrete scalar, which transforms expose via
//! their `get_params` method so a caller can pre-sample and replay.

use std::fmt;

use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fixed value or an inclusive `(min, max)` range to sample uniformly from
///
/// Deserializes from either a scalar or a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param<T> {
    /// Always resolves to this value
    Fixed(T),

    /// Resolves to a uniform sample from `[min, max]`
    Range(T, T),
}

impl<T> Param<T>
where
    T: SampleUniform + PartialOrd + Copy + fmt::Debug,
{
    /// Create a range parameter, rejecting reversed bounds
    pub fn range(min: T, max: T) -> Result<Self> {
        let param = Param::Range(min, max);
        param.validate()?;
        Ok(param)
    }

    /// Check that a range is well-formed
    pub fn validate(&self) -> Result<()> {
        match self {
            Param::Fixed(_) => Ok(()),
            Param::Range(min, max) if min <= max => Ok(()),
            Param::Range(min, max) => Err(Error::config(format!(
                "range lower bound {min:?} exceeds upper bound {max:?}"
            ))),
        }
    }

    /// Check that every value the parameter can take lies in `[lo, hi]`
    pub fn validate_within(&self, name: &str, lo: T, hi: T) -> Result<()> {
        self.validate()?;
        let (min, max) = self.bounds();
        if min < lo || max > hi {
            return Err(Error::config(format!(
                "{name} must lie within [{lo:?}, {hi:?}], got {self:?}"
            )));
        }
        Ok(())
    }

    /// Smallest and largest value the parameter can resolve to
    pub fn bounds(&self) -> (T, T) {
        match *self {
            Param::Fixed(v) => (v, v),
            Param::Range(min, max) => (min, max),
        }
    }

    /// Resolve to a concrete value
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        match *self {
            Param::Fixed(v) => v,
            Param::Range(min, max) if min >= max => min,
            Param::Range(min, max) => rng.gen_range(min..=max),
        }
    }
}

impl<T> From<T> for Param<T> {
    fn from(value: T) -> Self {
        Param::Fixed(value)
    }
}

impl<T> From<(T, T)> for Param<T> {
    fn from((min, max): (T, T)) -> Self {
        Param::Range(min, max)
    }
}

impl<T: fmt::Display> fmt::Display for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Fixed(v) => write!(f, "{v}"),
            Param::Range(min, max) => write!(f, "({min}, {max})"),
        }
    }
}
