use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, Param, Representation, Result, Transform};

use super::check_probability;
use crate::functional;

/// Add Gaussian noise to timestamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeJitter {
    /// Standard deviation of the offset
    pub std: f64,
    /// Drop events whose timestamp becomes negative
    pub clip_negative: bool,
    /// Re-sort the output by time
    pub sort_timestamps: bool,
}

impl TimeJitter {
    /// Create a time jitter
    pub fn new(std: f64, clip_negative: bool, sort_timestamps: bool) -> Result<Self> {
        check_std(std)?;
        Ok(Self {
            std,
            clip_negative,
            sort_timestamps,
        })
    }
}

fn check_std(std: f64) -> Result<()> {
    if std >= 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("std must be non-negative, got {std}")))
    }
}

impl Transform for TimeJitter {
    fn name(&self) -> &'static str {
        "TimeJitter"
    }

    fn describe(&self) -> String {
        format!(
            "TimeJitter(std={}, clip_negative={}, sort_timestamps={})",
            self.std, self.clip_negative, self.sort_timestamps
        )
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_std(self.std)?;
        functional::time_jitter(events, self.std, self.clip_negative, self.sort_timestamps, rng)
            .map(Representation::from)
    }
}

/// Linear remapping of timestamps: `t -> floor(t * coefficient + offset)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSkew {
    /// Multiplier, or a range to draw it from
    pub coefficient: Param<f64>,
    /// Additive offset, or a range to draw it from
    #[serde(default = "zero_offset")]
    pub offset: Param<f64>,
}

fn zero_offset() -> Param<f64> {
    Param::Fixed(0.0)
}

impl TimeSkew {
    /// Create a skew; coefficients must be non-negative to preserve order
    pub fn new(coefficient: impl Into<Param<f64>>, offset: impl Into<Param<f64>>) -> Result<Self> {
        let skew = Self {
            coefficient: coefficient.into(),
            offset: offset.into(),
        };
        skew.check()?;
        Ok(skew)
    }

    fn check(&self) -> Result<()> {
        self.coefficient.validate_within("coefficient", 0.0, f64::INFINITY)?;
        self.offset.validate()
    }

    /// Draw `(coefficient, offset)` for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        (self.coefficient.resolve(rng), self.offset.resolve(rng))
    }
}

impl Transform for TimeSkew {
    fn name(&self) -> &'static str {
        "TimeSkew"
    }

    fn describe(&self) -> String {
        format!("TimeSkew(coefficient={}, offset={})", self.coefficient, self.offset)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.check()?;
        let (coefficient, offset) = self.get_params(rng);
        Ok(functional::time_skew(events, coefficient, offset).into())
    }
}

/// Play the recording backwards with probability `p`
///
/// Also accepts frames, reversing their bin and polarity axes, and images,
/// reversing their polarity axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomTimeReversal {
    /// Reversal probability
    pub p: f64,
}

impl RandomTimeReversal {
    /// Create a time reversal
    pub fn new(p: f64) -> Result<Self> {
        check_probability("p", p)?;
        Ok(Self { p })
    }

    /// Whether a call reverses
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.p)
    }
}

impl Transform for RandomTimeReversal {
    fn name(&self) -> &'static str {
        "RandomTimeReversal"
    }

    fn describe(&self) -> String {
        format!("RandomTimeReversal(p={})", self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        if matches!(data, Representation::Surfaces(_)) {
            return Err(data.unsupported(self.name()));
        }
        check_probability("p", self.p)?;
        if !self.get_params(rng) {
            return Ok(data.clone());
        }

        Ok(match data {
            Representation::Events(events) => functional::time_reversal(events).into(),
            Representation::Frames(frames) => functional::time_reversal_frames(frames).into(),
            Representation::Image(image) => functional::time_reversal_image(image).into(),
            Representation::Surfaces(_) => return Err(data.unsupported(self.name())),
        })
    }
}

/// Keep only events within `[min, max]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropTime {
    /// Inclusive lower bound, if any
    pub min: Option<i64>,
    /// Inclusive upper bound, if any
    pub max: Option<i64>,
}

impl CropTime {
    /// Create a time crop
    pub fn new(min: Option<i64>, max: Option<i64>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(Error::config(format!("min time {lo} exceeds max time {hi}")));
            }
        }
        Ok(Self { min, max })
    }
}

impl Transform for CropTime {
    fn name(&self) -> &'static str {
        "CropTime"
    }

    fn describe(&self) -> String {
        format!("CropTime(min={:?}, max={:?})", self.min, self.max)
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        Ok(functional::crop_time(events, self.min, self.max).into())
    }
}

/// Shift timestamps so the recording starts at 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAlignment;

impl Transform for TimeAlignment {
    fn name(&self) -> &'static str {
        "TimeAlignment"
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        Ok(functional::time_alignment(events).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use ndarray::{Array3, Array4};
    use proptest::prelude::*;

    #[test]
    fn test_time_skew_rejects_negative_coefficient() {
        assert!(TimeSkew::new(-0.5, 0.0).unwrap_err().is_configuration());
        assert!(TimeSkew::new((-1.0, 2.0), 0.0).is_err());
        assert!(TimeSkew::new((0.8, 1.2), (-10.0, 10.0)).is_ok());
    }

    #[test]
    fn test_time_skew_replays_params() {
        let (orig, _) = random_input();
        let skew = TimeSkew::new((0.5, 2.0), (0.0, 100.0)).unwrap();

        let (c, o) = skew.get_params(&mut rng());
        let out = skew.apply(&orig.clone().into(), &mut rng()).unwrap();
        assert_eq!(out.as_events().unwrap(), &functional::time_skew(&orig, c, o));
    }

    #[test]
    fn test_time_reversal_dense_inputs() {
        let reversal = RandomTimeReversal::new(1.0).unwrap();
        let frames = Array4::from_shape_fn((2, 2, 1, 1), |(b, p, _, _)| (b * 2 + p) as i64);
        let out = reversal.apply(&frames.into(), &mut rng()).unwrap();
        assert_eq!(out.as_frames().unwrap().iter().copied().collect::<Vec<_>>(), vec![3, 2, 1, 0]);

        let image = Array3::from_shape_fn((2, 1, 1), |(p, _, _)| p as i64);
        let out = reversal.apply(&image.into(), &mut rng()).unwrap();
        assert_eq!(out.as_image().unwrap().iter().copied().collect::<Vec<_>>(), vec![1, 0]);

        let surfaces = Representation::from(Array4::<f64>::zeros((1, 1, 1, 1)));
        assert!(reversal.apply(&surfaces, &mut rng()).is_err());
    }

    #[test]
    fn test_crop_time_bounds() {
        assert!(CropTime::new(Some(10), Some(5)).is_err());
        assert_eq!(
            CropTime::new(Some(0), None).unwrap().describe(),
            "CropTime(min=Some(0), max=None)"
        );
    }

    proptest! {
        #[test]
        fn prop_time_skew_formula(
            coefficient in 0.0f64..10.0,
            offset in -1e5f64..1e5,
            ts in proptest::collection::vec(0i64..1_000_000, 0..200),
        ) {
            let mut ts = ts;
            ts.sort_unstable();
            let events: event_data_core::EventStream =
                ts.iter().map(|&t| event_data_core::Event::new(0, 0, t, 1)).collect();

            let skew = TimeSkew::new(coefficient, offset).unwrap();
            let out = skew.apply(&events.clone().into(), &mut rng()).unwrap();
            let out = out.as_events().unwrap();

            prop_assert_eq!(out.len(), events.len());
            prop_assert!(out.is_time_sorted());
            for (a, b) in events.iter().zip(out.iter()) {
                prop_assert_eq!(b.t, (a.t as f64 * coefficient + offset).floor() as i64);
                prop_assert!(b.t as f64 >= a.t as f64 * coefficient + offset - 1.0);
            }
        }
    }
}
