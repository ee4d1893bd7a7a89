use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use event_data_core::{Param, Representation, Result, SensorSize, Transform};

use crate::functional;

/// Add uniformly distributed background events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformNoise {
    /// Sensor bounds for the noise coordinates
    pub sensor_size: SensorSize,
    /// Number of noise events, or a range to draw it from
    pub n: Param<i64>,
}

impl UniformNoise {
    /// Create a noise source
    pub fn new(sensor_size: SensorSize, n: impl Into<Param<i64>>) -> Result<Self> {
        sensor_size.validate()?;
        let n = n.into();
        n.validate_within("n", 0, i64::MAX)?;
        Ok(Self { sensor_size, n })
    }

    /// Draw the number of noise events for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.n.resolve(rng).max(0) as usize
    }
}

impl Transform for UniformNoise {
    fn name(&self) -> &'static str {
        "UniformNoise"
    }

    fn describe(&self) -> String {
        format!("UniformNoise(sensor_size={}, n={})", self.sensor_size, self.n)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.n.validate_within("n", 0, i64::MAX)?;
        let n = self.get_params(rng);
        Ok(functional::uniform_noise(events, self.sensor_size, n, rng).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use event_data_core::EventStream;
    use std::collections::HashMap;

    #[test]
    fn test_noise_keeps_originals_in_order() {
        let (orig, size) = random_input();
        let noise = UniformNoise::new(size, (100, 1000)).unwrap();
        let n = noise.get_params(&mut rng());
        let out = noise.apply(&orig.clone().into(), &mut rng()).unwrap();
        let events = out.as_events().unwrap();

        assert_eq!(events.len(), orig.len() + n);
        assert!(events.is_time_sorted());

        // Every original event survives the merge
        let mut counts: HashMap<_, i64> = HashMap::new();
        for e in events {
            *counts.entry(*e).or_default() += 1;
        }
        for e in &orig {
            let count = counts.get_mut(e).unwrap();
            *count -= 1;
            assert!(*count >= 0);
        }
    }

    #[test]
    fn test_noise_on_empty_input() {
        let noise = UniformNoise::new(SensorSize::new(10, 10, 2), 50).unwrap();
        let out = noise.apply(&EventStream::new().into(), &mut rng()).unwrap();
        assert!(out.as_events().unwrap().is_empty());
        assert!(UniformNoise::new(SensorSize::new(10, 10, 2), -5).is_err());
    }
}
