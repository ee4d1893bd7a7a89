use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, Param, Representation, Result, SensorSize, Transform};

use super::check_ratio;
use crate::functional;

/// Remove a random fraction of events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    /// Fraction of events to drop, or a range to draw it from
    pub p: Param<f64>,
}

impl DropEvent {
    /// Create an event drop
    pub fn new(p: impl Into<Param<f64>>) -> Result<Self> {
        let p = p.into();
        check_ratio("p", &p)?;
        Ok(Self { p })
    }

    /// Draw the drop fraction for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.p.resolve(rng)
    }
}

impl Transform for DropEvent {
    fn name(&self) -> &'static str {
        "DropEvent"
    }

    fn describe(&self) -> String {
        format!("DropEvent(p={})", self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_ratio("p", &self.p)?;
        let p = self.get_params(rng);
        Ok(functional::drop_event(events, p, rng).into())
    }
}

/// Remove every event inside a random time interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropEventByTime {
    /// Interval length as a fraction of the recording
    pub duration_ratio: Param<f64>,
}

impl DropEventByTime {
    /// Create a time-interval drop
    pub fn new(duration_ratio: impl Into<Param<f64>>) -> Result<Self> {
        let duration_ratio = duration_ratio.into();
        check_ratio("duration_ratio", &duration_ratio)?;
        Ok(Self { duration_ratio })
    }

    /// Draw the interval ratio for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.duration_ratio.resolve(rng)
    }
}

impl Transform for DropEventByTime {
    fn name(&self) -> &'static str {
        "DropEventByTime"
    }

    fn describe(&self) -> String {
        format!("DropEventByTime(duration_ratio={})", self.duration_ratio)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_ratio("duration_ratio", &self.duration_ratio)?;
        let ratio = self.get_params(rng);
        Ok(functional::drop_by_time(events, ratio, rng).into())
    }
}

/// Remove every event inside a random box on the sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropEventByArea {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Box side as a fraction of the sensor side
    pub area_ratio: Param<f64>,
}

impl DropEventByArea {
    /// Create an area drop
    pub fn new(sensor_size: SensorSize, area_ratio: impl Into<Param<f64>>) -> Result<Self> {
        sensor_size.validate()?;
        let area_ratio = area_ratio.into();
        check_ratio("area_ratio", &area_ratio)?;
        Ok(Self {
            sensor_size,
            area_ratio,
        })
    }

    /// Draw the area ratio for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.area_ratio.resolve(rng)
    }
}

impl Transform for DropEventByArea {
    fn name(&self) -> &'static str {
        "DropEventByArea"
    }

    fn describe(&self) -> String {
        format!(
            "DropEventByArea(sensor_size={}, area_ratio={})",
            self.sensor_size, self.area_ratio
        )
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_ratio("area_ratio", &self.area_ratio)?;
        let ratio = self.get_params(rng);
        Ok(functional::drop_by_area(events, self.sensor_size, ratio, rng).into())
    }
}

/// Remove listed pixels, or pixels firing above a frequency
///
/// On event streams the frequency is in Hz with microsecond timestamps. On
/// images and frames it is a total count per pixel, summed over every
/// leading axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropPixel {
    /// Explicit `(x, y)` pixels to remove
    #[serde(default)]
    pub coordinates: Option<Vec<(i64, i64)>>,
    /// Hot pixel threshold
    #[serde(default)]
    pub hot_pixel_frequency: Option<f64>,
    /// Sensor bounds for hot pixel detection; inferred when missing
    #[serde(default)]
    pub sensor_size: Option<SensorSize>,
}

impl DropPixel {
    /// Drop the listed pixels
    pub fn coordinates(coordinates: Vec<(i64, i64)>) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::default()
        }
    }

    /// Drop pixels firing above `frequency`
    pub fn hot_pixels(frequency: f64) -> Result<Self> {
        let drop = Self {
            hot_pixel_frequency: Some(frequency),
            ..Self::default()
        };
        drop.check()?;
        Ok(drop)
    }

    /// Use an explicit sensor size for hot pixel detection
    #[must_use]
    pub fn with_sensor_size(mut self, sensor_size: SensorSize) -> Self {
        self.sensor_size = Some(sensor_size);
        self
    }

    fn check(&self) -> Result<()> {
        match (&self.coordinates, self.hot_pixel_frequency) {
            (Some(_), Some(_)) => Err(Error::config(
                "coordinates and hot_pixel_frequency are mutually exclusive",
            )),
            (None, Some(freq)) if !(freq >= 0.0) => Err(Error::config(format!(
                "hot pixel frequency must be non-negative, got {freq}"
            ))),
            _ => Ok(()),
        }
    }
}

impl Transform for DropPixel {
    fn name(&self) -> &'static str {
        "DropPixel"
    }

    fn describe(&self) -> String {
        let sensor_size = self
            .sensor_size
            .map_or_else(|| "None".to_string(), |s| s.to_string());
        format!(
            "DropPixel(coordinates={:?}, hot_pixel_frequency={:?}, sensor_size={sensor_size})",
            self.coordinates, self.hot_pixel_frequency
        )
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        self.check()?;
        let explicit = self.coordinates.as_deref();

        match data {
            Representation::Events(events) => {
                let pixels = match (explicit, self.hot_pixel_frequency) {
                    (Some(pixels), _) => pixels.to_vec(),
                    (None, Some(freq)) => {
                        let size = self.sensor_size.unwrap_or_else(|| SensorSize::infer(events));
                        functional::identify_hot_pixels(events, size, freq)
                    }
                    (None, None) => return Ok(data.clone()),
                };
                Ok(functional::drop_pixel(events, &pixels).into())
            }
            Representation::Frames(frames) => {
                let mut frames = frames.clone();
                let pixels = match (explicit, self.hot_pixel_frequency) {
                    (Some(pixels), _) => pixels.to_vec(),
                    (None, Some(freq)) => functional::identify_hot_pixels_dense(&frames, freq),
                    (None, None) => Vec::new(),
                };
                functional::drop_pixel_dense(&mut frames, &pixels);
                Ok(frames.into())
            }
            Representation::Image(image) => {
                let mut image = image.clone();
                let pixels = match (explicit, self.hot_pixel_frequency) {
                    (Some(pixels), _) => pixels.to_vec(),
                    (None, Some(freq)) => functional::identify_hot_pixels_dense(&image, freq),
                    (None, None) => Vec::new(),
                };
                functional::drop_pixel_dense(&mut image, &pixels);
                Ok(image.into())
            }
            Representation::Surfaces(_) => Err(data.unsupported(self.name())),
        }
    }
}

/// Remove a random fraction of sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomDropPixel {
    /// Fraction of pixels to drop, or a range to draw it from
    pub p: Param<f64>,
    /// Sensor bounds; required for event streams
    #[serde(default)]
    pub sensor_size: Option<SensorSize>,
}

impl RandomDropPixel {
    /// Create a random pixel drop
    pub fn new(p: impl Into<Param<f64>>, sensor_size: Option<SensorSize>) -> Result<Self> {
        let p = p.into();
        check_ratio("p", &p)?;
        if let Some(size) = sensor_size {
            size.validate()?;
        }
        Ok(Self { p, sensor_size })
    }

    /// Draw the pixel fraction for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.p.resolve(rng)
    }
}

impl Transform for RandomDropPixel {
    fn name(&self) -> &'static str {
        "RandomDropPixel"
    }

    fn describe(&self) -> String {
        let sensor_size = self
            .sensor_size
            .map_or_else(|| "None".to_string(), |s| s.to_string());
        format!("RandomDropPixel(p={}, sensor_size={sensor_size})", self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        check_ratio("p", &self.p)?;
        let (width, height) = match data {
            Representation::Events(_) => {
                let size = self.sensor_size.ok_or_else(|| {
                    Error::config("RandomDropPixel needs a sensor size for event streams")
                })?;
                (size.width, size.height)
            }
            Representation::Frames(frames) => (frames.shape()[3], frames.shape()[2]),
            Representation::Image(image) => (image.shape()[2], image.shape()[1]),
            Representation::Surfaces(_) => return Err(data.unsupported(self.name())),
        };

        let p = self.get_params(rng);
        let pixels = functional::random_pixels(width, height, p, rng);
        Ok(match data {
            Representation::Events(events) => functional::drop_pixel(events, &pixels).into(),
            Representation::Frames(frames) => {
                let mut frames = frames.clone();
                functional::drop_pixel_dense(&mut frames, &pixels);
                frames.into()
            }
            Representation::Image(image) => {
                let mut image = image.clone();
                functional::drop_pixel_dense(&mut image, &pixels);
                image.into()
            }
            Representation::Surfaces(_) => return Err(data.unsupported(self.name())),
        })
    }
}

/// Keep every `n`-th event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decimation {
    /// Decimation factor
    pub n: usize,
}

impl Decimation {
    /// Create a decimation; `n` must be positive
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::config("decimation factor must be positive"));
        }
        Ok(Self { n })
    }
}

impl Transform for Decimation {
    fn name(&self) -> &'static str {
        "Decimation"
    }

    fn describe(&self) -> String {
        format!("Decimation(n={})", self.n)
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        functional::decimation(events, self.n).map(Representation::from)
    }
}

/// Drop events without recent activity in their neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denoise {
    /// Support window in time units
    pub filter_time: i64,
}

impl Denoise {
    /// Create a denoise filter
    pub fn new(filter_time: i64) -> Result<Self> {
        if filter_time <= 0 {
            return Err(Error::config(format!("filter time must be positive, got {filter_time}")));
        }
        Ok(Self { filter_time })
    }
}

impl Transform for Denoise {
    fn name(&self) -> &'static str {
        "Denoise"
    }

    fn describe(&self) -> String {
        format!("Denoise(filter_time={})", self.filter_time)
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        Ok(functional::denoise(events, self.filter_time).into())
    }
}

/// Suppress events arriving too soon after the last kept event at a pixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefractoryPeriod {
    /// Refractory period in time units, or a range to draw it from
    pub delta: Param<i64>,
}

impl RefractoryPeriod {
    /// Create a refractory filter
    pub fn new(delta: impl Into<Param<i64>>) -> Result<Self> {
        let delta = delta.into();
        delta.validate_within("delta", 0, i64::MAX)?;
        Ok(Self { delta })
    }

    /// Draw the refractory period for one call
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.delta.resolve(rng)
    }
}

impl Transform for RefractoryPeriod {
    fn name(&self) -> &'static str {
        "RefractoryPeriod"
    }

    fn describe(&self) -> String {
        format!("RefractoryPeriod(delta={})", self.delta)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.delta.validate_within("delta", 0, i64::MAX)?;
        let delta = self.get_params(rng);
        Ok(functional::refractory_period(events, delta).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use event_data_core::{Event, EventStream};
    use ndarray::{Array3, Array4};
    use test_case::test_case;

    #[test_case(0.2)]
    #[test_case(0.5)]
    fn test_drop_event_preserves_order(p: f64) {
        let (orig, _) = random_input();
        let drop = DropEvent::new(p).unwrap();
        let out = drop.apply(&orig.clone().into(), &mut rng()).unwrap();
        let events = out.as_events().unwrap();

        assert_eq!(events.len(), orig.len() - (p * orig.len() as f64).round() as usize);
        // Survivors form a subsequence of the input
        let mut source = orig.iter();
        assert!(events.iter().all(|e| source.any(|o| o == e)));
    }

    #[test]
    fn test_drop_event_range_rejects_out_of_unit_interval() {
        assert!(DropEvent::new((0.1, 1.5)).is_err());
        assert!(DropEventByTime::new(-0.1).is_err());
        assert!(DropEventByArea::new(SensorSize::new(10, 10, 2), (0.2, 0.9)).is_ok());
    }

    #[test]
    fn test_drop_pixel_configuration() {
        let both = DropPixel {
            coordinates: Some(vec![(0, 0)]),
            hot_pixel_frequency: Some(10.0),
            sensor_size: None,
        };
        let (orig, _) = random_input();
        assert!(both.apply(&orig.clone().into(), &mut rng()).unwrap_err().is_configuration());

        let neither = DropPixel::default();
        let input = Representation::from(orig);
        assert_eq!(neither.apply(&input, &mut rng()).unwrap(), input);
    }

    #[test]
    fn test_drop_pixel_on_dense_inputs() {
        let drop = DropPixel::coordinates(vec![(1, 0)]);
        let frames = Array4::<i64>::ones((2, 2, 2, 3));
        let out = drop.apply(&frames.into(), &mut rng()).unwrap();
        assert_eq!(out.as_frames().unwrap().sum(), 24 - 4);

        let mut image = Array3::<i64>::ones((2, 2, 3));
        image[[0, 1, 2]] = 100;
        let hot = DropPixel::hot_pixels(10.0).unwrap();
        let out = hot.apply(&image.into(), &mut rng()).unwrap();
        let out = out.as_image().unwrap();
        assert_eq!(out[[0, 1, 2]], 0);
        assert_eq!(out[[1, 1, 2]], 0);
        assert_eq!(out.sum(), 12 - 2);
    }

    #[test]
    fn test_drop_hot_pixels_with_inferred_sensor() {
        let mut events: Vec<Event> = (0..100).map(|t| Event::new(2, 2, t * 10, 0)).collect();
        events.push(Event::new(0, 0, 500, 1));
        let mut events = EventStream::from(events);
        events.sort_by_time();

        // 990 us recording; threshold 10 kHz allows ~9.9 events per pixel
        let out = DropPixel::hot_pixels(10_000.0)
            .unwrap()
            .apply(&events.into(), &mut rng())
            .unwrap();
        assert_eq!(out.as_events().unwrap().as_slice(), &[Event::new(0, 0, 500, 1)]);
    }

    #[test]
    fn test_random_drop_pixel() {
        let (orig, size) = random_input();
        let missing_size = RandomDropPixel::new(0.1, None).unwrap();
        assert!(missing_size.apply(&orig.clone().into(), &mut rng()).is_err());

        let drop = RandomDropPixel::new(0.1, Some(size)).unwrap();
        let out = drop.apply(&orig.clone().into(), &mut rng()).unwrap();
        let pixels: std::collections::HashSet<_> =
            out.as_events().unwrap().iter().map(Event::pixel).collect();
        assert!(out.as_events().unwrap().len() < orig.len());
        assert!(pixels.len() <= size.num_pixels() - 2000);

        let frames = Array4::<i64>::ones((3, 2, 10, 10));
        let out = drop.apply(&frames.into(), &mut rng()).unwrap();
        assert_eq!(out.as_frames().unwrap().sum(), 3 * 2 * (100 - 10));
    }

    #[test]
    fn test_refractory_period_range() {
        let (orig, _) = random_input();
        let filter = RefractoryPeriod::new((1000, 50_000)).unwrap();
        let delta = filter.get_params(&mut rng());
        let out = filter.apply(&orig.clone().into(), &mut rng()).unwrap();
        assert_eq!(out.as_events().unwrap(), &functional::refractory_period(&orig, delta));
        assert!(RefractoryPeriod::new(-1).is_err());
    }

    #[test]
    fn test_describe_renders_params() {
        assert_eq!(DropEvent::new((0.1, 0.3)).unwrap().describe(), "DropEvent(p=(0.1, 0.3))");
        assert_eq!(Decimation::new(4).unwrap().describe(), "Decimation(n=4)");
        assert!(Decimation::new(0).is_err());
        assert!(Denoise::new(0).is_err());
    }
}
