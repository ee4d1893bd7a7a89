//! Transform trait and the `Compose` pipeline

use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::error::Result;
use crate::representation::Representation;

/// A pure operation on a [`Representation`]
///
/// Implementations never mutate their input and always return a new value,
/// including on identity branches. Randomized transforms draw every random
/// number from the injected `rng`, so a seeded generator replays a call exactly.
pub trait Transform: Send + Sync {
    /// Type name used for introspection
    fn name(&self) -> &'static str;

    /// Name plus parameters, as rendered inside a [`Compose`]
    fn describe(&self) -> String {
        self.name().to_string()
    }

    /// Apply the transform
    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation>;

    /// Apply the transform with thread-local entropy
    fn forward(&self, data: &Representation) -> Result<Representation> {
        self.apply(data, &mut rand::thread_rng())
    }
}

impl<T: Transform + ?Sized> Transform for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        (**self).apply(data, rng)
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        (**self).apply(data, rng)
    }
}

/// An ordered, immutable chain of transforms applied left to right
///
/// A `Compose` is itself a [`Transform`] and nests transparently.
#[derive(Clone, Default)]
pub struct Compose {
    /// The transforms in this chain
    transforms: Vec<Arc<dyn Transform>>,
}

impl Compose {
    /// Create a new transform chain
    pub fn new(transforms: Vec<Arc<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// Get a reference to the transforms in this chain
    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Names of the stages in order
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }
}

impl Transform for Compose {
    fn name(&self) -> &'static str {
        "Compose"
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let Some((first, rest)) = self.transforms.split_first() else {
            return Ok(data.clone());
        };

        tracing::trace!(stage = first.name(), input = data.kind(), "compose stage");
        let mut current = first.apply(data, rng)?;
        for transform in rest {
            tracing::trace!(stage = transform.name(), input = current.kind(), "compose stage");
            current = transform.apply(&current, rng)?;
        }

        Ok(current)
    }
}

impl fmt::Display for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compose(")?;
        for transform in &self.transforms {
            for line in transform.describe().lines() {
                writeln!(f, "    {line}")?;
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Arc<dyn Transform>> for Compose {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Transform>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
