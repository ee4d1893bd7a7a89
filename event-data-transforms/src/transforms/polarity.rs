use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use event_data_core::{Representation, Result, Transform};

use super::check_probability;
use crate::functional;

/// Invert binary polarities with probability `p`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomFlipPolarity {
    /// Flip probability
    pub p: f64,
}

impl RandomFlipPolarity {
    /// Create a polarity flip
    pub fn new(p: f64) -> Result<Self> {
        check_probability("p", p)?;
        Ok(Self { p })
    }

    /// Whether a call flips
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.p)
    }
}

impl Transform for RandomFlipPolarity {
    fn name(&self) -> &'static str {
        "RandomFlipPolarity"
    }

    fn describe(&self) -> String {
        format!("RandomFlipPolarity(p={})", self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_probability("p", self.p)?;
        if self.get_params(rng) {
            Ok(functional::flip_polarity(events).into())
        } else {
            Ok(events.clone().into())
        }
    }
}

/// Collapse all polarities to 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePolarities;

impl Transform for MergePolarities {
    fn name(&self) -> &'static str {
        "MergePolarities"
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        Ok(functional::merge_polarities(events).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};

    #[test]
    fn test_flip_polarity_edges() {
        let (orig, _) = random_input();
        let input = Representation::from(orig.clone());

        let always = RandomFlipPolarity::new(1.0).unwrap();
        let out = always.apply(&input, &mut rng()).unwrap();
        assert_eq!(out.as_events().unwrap(), &functional::flip_polarity(&orig));

        let never = RandomFlipPolarity::new(0.0).unwrap();
        assert_eq!(never.apply(&input, &mut rng()).unwrap(), input);
        assert!(RandomFlipPolarity::new(-0.1).is_err());
    }

    #[test]
    fn test_merge_polarities_input_untouched() {
        let (orig, _) = random_input();
        let input = Representation::from(orig.clone());
        let out = MergePolarities.apply(&input, &mut rng()).unwrap();
        assert!(out.as_events().unwrap().iter().all(|e| e.p == 0));
        assert_eq!(input.as_events().unwrap(), &orig);
        assert_eq!(MergePolarities.describe(), "MergePolarities");
    }
}
