use rand::RngCore;
use serde::{Deserialize, Serialize};

use event_data_core::{Error, EventStream, Representation, Result, SensorSize, Transform};

use crate::functional::{self, Decay, SliceStrategy};

/// Framing options, mirroring the named arguments of [`ToFrame`]
///
/// Exactly one of the four slicing options must be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame length in time units
    pub time_window: Option<f64>,
    /// Events per frame
    pub event_count: Option<usize>,
    /// Number of frames of equal duration
    pub n_time_bins: Option<usize>,
    /// Number of frames of equal event count
    pub n_event_bins: Option<usize>,
    /// Overlap between consecutive frames: time units, events, or a fraction
    /// of the bin for the bin strategies
    pub overlap: f64,
    /// Keep a trailing partial frame (window strategies only)
    pub include_incomplete: bool,
}

impl FrameConfig {
    /// Slice by time window
    #[must_use]
    pub fn time_window(mut self, window: f64) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Slice by event count
    #[must_use]
    pub fn event_count(mut self, count: usize) -> Self {
        self.event_count = Some(count);
        self
    }

    /// Slice into time bins
    #[must_use]
    pub fn n_time_bins(mut self, bins: usize) -> Self {
        self.n_time_bins = Some(bins);
        self
    }

    /// Slice into event bins
    #[must_use]
    pub fn n_event_bins(mut self, bins: usize) -> Self {
        self.n_event_bins = Some(bins);
        self
    }

    /// Set the overlap
    #[must_use]
    pub fn overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    /// Keep a trailing partial frame
    #[must_use]
    pub fn include_incomplete(mut self, include: bool) -> Self {
        self.include_incomplete = include;
        self
    }

    /// The single slicing strategy selected by this config
    pub fn strategy(&self) -> Result<SliceStrategy> {
        let selected: Vec<SliceStrategy> = [
            self.time_window.map(SliceStrategy::TimeWindow),
            self.event_count.map(SliceStrategy::EventCount),
            self.n_time_bins.map(SliceStrategy::TimeBins),
            self.n_event_bins.map(SliceStrategy::EventBins),
        ]
        .into_iter()
        .flatten()
        .collect();

        match selected.as_slice() {
            [strategy] => Ok(*strategy),
            [] => Err(Error::config(
                "one of time_window, event_count, n_time_bins or n_event_bins is required",
            )),
            _ => Err(Error::config(
                "time_window, event_count, n_time_bins and n_event_bins are mutually exclusive",
            )),
        }
    }
}

/// Accumulate events into `[frame, polarity, height, width]` counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToFrame {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// How frames are cut
    pub strategy: SliceStrategy,
    /// Overlap between frames
    pub overlap: f64,
    /// Keep a trailing partial frame
    pub include_incomplete: bool,
}

impl ToFrame {
    /// Create a framer from a config selecting exactly one strategy
    pub fn new(sensor_size: SensorSize, config: FrameConfig) -> Result<Self> {
        sensor_size.validate()?;
        let to_frame = Self {
            sensor_size,
            strategy: config.strategy()?,
            overlap: config.overlap,
            include_incomplete: config.include_incomplete,
        };
        to_frame.check()?;
        Ok(to_frame)
    }

    fn check(&self) -> Result<()> {
        if let SliceStrategy::EventCount(0)
        | SliceStrategy::TimeBins(0)
        | SliceStrategy::EventBins(0) = self.strategy
        {
            return Err(Error::config(format!("{:?} must be positive", self.strategy)));
        }
        // Slicing an empty stream runs only the parameter checks
        self.strategy
            .slice(&EventStream::new(), self.overlap, self.include_incomplete)
            .map(|_| ())
    }
}

impl Transform for ToFrame {
    fn name(&self) -> &'static str {
        "ToFrame"
    }

    fn describe(&self) -> String {
        format!(
            "ToFrame(sensor_size={}, strategy={:?}, overlap={}, include_incomplete={})",
            self.sensor_size, self.strategy, self.overlap, self.include_incomplete
        )
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.check()?;
        functional::to_frame(
            events,
            self.sensor_size,
            self.strategy,
            self.overlap,
            self.include_incomplete,
        )
        .map(Representation::from)
    }
}

/// Collapse the whole recording into `[polarity, height, width]` counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToImage {
    /// Sensor bounds
    pub sensor_size: SensorSize,
}

impl ToImage {
    /// Create an image builder
    pub fn new(sensor_size: SensorSize) -> Result<Self> {
        sensor_size.validate()?;
        Ok(Self { sensor_size })
    }
}

impl Transform for ToImage {
    fn name(&self) -> &'static str {
        "ToImage"
    }

    fn describe(&self) -> String {
        format!("ToImage(sensor_size={})", self.sensor_size)
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        functional::to_image(events, self.sensor_size).map(Representation::from)
    }
}

/// Build decayed recency maps around events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToTimesurface {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Odd `(width, height)` of the local window; the whole sensor when unset
    #[serde(default)]
    pub surface_dimensions: Option<(usize, usize)>,
    /// Decay constant
    pub tau: f64,
    /// Minimum spacing between emitted surfaces; 0 emits one per event
    #[serde(default)]
    pub delta_t: f64,
    /// Decay function
    #[serde(default)]
    pub decay: Decay,
}

impl ToTimesurface {
    /// Create a time surface builder
    pub fn new(
        sensor_size: SensorSize,
        surface_dimensions: Option<(usize, usize)>,
        tau: f64,
        delta_t: f64,
        decay: Decay,
    ) -> Result<Self> {
        sensor_size.validate()?;
        functional::to_timesurface::check_timesurface_config(surface_dimensions, tau, delta_t)?;
        Ok(Self {
            sensor_size,
            surface_dimensions,
            tau,
            delta_t,
            decay,
        })
    }
}

impl Transform for ToTimesurface {
    fn name(&self) -> &'static str {
        "ToTimesurface"
    }

    fn describe(&self) -> String {
        format!(
            "ToTimesurface(sensor_size={}, surface_dimensions={:?}, tau={}, delta_t={}, decay={})",
            self.sensor_size, self.surface_dimensions, self.tau, self.delta_t, self.decay
        )
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        functional::to_timesurface(
            events,
            self.sensor_size,
            self.surface_dimensions,
            self.tau,
            self.delta_t,
            self.decay,
        )
        .map(Representation::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use test_case::test_case;

    #[test_case(FrameConfig::default() ; "no strategy")]
    #[test_case(FrameConfig::default().time_window(1000.0).event_count(100) ; "two strategies")]
    #[test_case(FrameConfig::default().n_time_bins(3).n_event_bins(3) ; "two bin strategies")]
    #[test_case(FrameConfig::default().time_window(100.0).overlap(100.0) ; "overlap equals window")]
    #[test_case(FrameConfig::default().n_event_bins(4).overlap(1.0) ; "bin overlap of one")]
    #[test_case(FrameConfig::default().n_time_bins(0) ; "zero bins")]
    fn test_invalid_frame_config(config: FrameConfig) {
        let size = SensorSize::new(34, 34, 2);
        assert!(ToFrame::new(size, config).unwrap_err().is_configuration());
    }

    #[test]
    fn test_frame_config_from_json() {
        let config: FrameConfig = serde_json::from_str(r#"{"n_event_bins": 5, "overlap": 0.2}"#).unwrap();
        assert_eq!(config.strategy().unwrap(), SliceStrategy::EventBins(5));
        assert_eq!(config.overlap, 0.2);
    }

    #[test]
    fn test_to_frame_empty_shape() {
        let size = SensorSize::new(34, 34, 2);
        let to_frame = ToFrame::new(size, FrameConfig::default().n_time_bins(4)).unwrap();
        let out = to_frame.apply(&EventStream::new().into(), &mut rng()).unwrap();
        assert_eq!(out.shape(), vec![4, 2, 34, 34]);
    }

    #[test]
    fn test_to_image_rejects_dense_input() {
        let (orig, size) = random_input();
        let to_image = ToImage::new(size).unwrap();
        let image = to_image.apply(&orig.into(), &mut rng()).unwrap();
        assert!(to_image.apply(&image, &mut rng()).is_err());
    }

    #[test]
    fn test_linear_surfaces_are_non_negative() {
        let (orig, size) = random_input();
        let orig: EventStream = orig.iter().take(200).copied().collect();
        let builder = ToTimesurface::new(size, Some((7, 7)), 500.0, 0.0, Decay::Lin).unwrap();
        let out = builder.apply(&orig.into(), &mut rng()).unwrap();
        assert_eq!(out.shape(), vec![200, 2, 7, 7]);
        assert!(out.as_surfaces().unwrap().iter().all(|&v| v >= 0.0));

        assert!(ToTimesurface::new(size, Some((2, 3)), 500.0, 0.0, Decay::Lin).is_err());
    }
}
