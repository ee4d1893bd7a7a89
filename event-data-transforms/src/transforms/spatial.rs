use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, Representation, Result, SensorSize, Transform};

use super::check_probability;
use crate::functional::{self, DownsamplingMethod};

/// Shift events by correlated 2D Gaussian noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialJitter {
    /// Sensor bounds, used when clipping outliers
    pub sensor_size: SensorSize,
    /// Variance along x
    pub var_x: f64,
    /// Variance along y
    pub var_y: f64,
    /// Covariance between x and y
    pub sigma_xy: f64,
    /// Drop events jittered off the sensor
    pub clip_outliers: bool,
}

impl SpatialJitter {
    /// Create a jitter with the given covariance
    pub fn new(
        sensor_size: SensorSize,
        var_x: f64,
        var_y: f64,
        sigma_xy: f64,
        clip_outliers: bool,
    ) -> Result<Self> {
        sensor_size.validate()?;
        functional::spatial::jitter_factor(var_x, var_y, sigma_xy)?;
        Ok(Self {
            sensor_size,
            var_x,
            var_y,
            sigma_xy,
            clip_outliers,
        })
    }
}

impl Transform for SpatialJitter {
    fn name(&self) -> &'static str {
        "SpatialJitter"
    }

    fn describe(&self) -> String {
        format!(
            "SpatialJitter(sensor_size={}, var_x={}, var_y={}, sigma_xy={}, clip_outliers={})",
            self.sensor_size, self.var_x, self.var_y, self.sigma_xy, self.clip_outliers
        )
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        functional::spatial_jitter(
            events,
            self.sensor_size,
            self.var_x,
            self.var_y,
            self.sigma_xy,
            self.clip_outliers,
            rng,
        )
        .map(Representation::from)
    }
}

/// Mirror events horizontally with probability `p`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomFlipLR {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Flip probability
    pub p: f64,
}

impl RandomFlipLR {
    /// Create a horizontal flip
    pub fn new(sensor_size: SensorSize, p: f64) -> Result<Self> {
        sensor_size.validate()?;
        check_probability("p", p)?;
        Ok(Self { sensor_size, p })
    }

    /// Whether a call flips
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.p)
    }
}

impl Transform for RandomFlipLR {
    fn name(&self) -> &'static str {
        "RandomFlipLR"
    }

    fn describe(&self) -> String {
        format!("RandomFlipLR(sensor_size={}, p={})", self.sensor_size, self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_probability("p", self.p)?;
        if self.get_params(rng) {
            Ok(functional::flip_lr(events, self.sensor_size.width).into())
        } else {
            Ok(events.clone().into())
        }
    }
}

/// Mirror events vertically with probability `p`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomFlipUD {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Flip probability
    pub p: f64,
}

impl RandomFlipUD {
    /// Create a vertical flip
    pub fn new(sensor_size: SensorSize, p: f64) -> Result<Self> {
        sensor_size.validate()?;
        check_probability("p", p)?;
        Ok(Self { sensor_size, p })
    }

    /// Whether a call flips
    pub fn get_params<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.p)
    }
}

impl Transform for RandomFlipUD {
    fn name(&self) -> &'static str {
        "RandomFlipUD"
    }

    fn describe(&self) -> String {
        format!("RandomFlipUD(sensor_size={}, p={})", self.sensor_size, self.p)
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        check_probability("p", self.p)?;
        if self.get_params(rng) {
            Ok(functional::flip_ud(events, self.sensor_size.height).into())
        } else {
            Ok(events.clone().into())
        }
    }
}

/// Crop a fixed window from the middle of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterCrop {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Window `(width, height)`
    pub size: (usize, usize),
}

impl CenterCrop {
    /// Create a centre crop
    pub fn new(sensor_size: SensorSize, size: (usize, usize)) -> Result<Self> {
        sensor_size.validate()?;
        Ok(Self { sensor_size, size })
    }
}

impl Transform for CenterCrop {
    fn name(&self) -> &'static str {
        "CenterCrop"
    }

    fn describe(&self) -> String {
        format!("CenterCrop(sensor_size={}, size={:?})", self.sensor_size, self.size)
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        Ok(functional::center_crop(events, self.sensor_size, self.size).into())
    }
}

/// Crop a window at a uniformly random position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomCrop {
    /// Sensor bounds
    pub sensor_size: SensorSize,
    /// Window `(width, height)`
    pub target_size: (usize, usize),
}

impl RandomCrop {
    /// Create a random crop; the window must fit on the sensor
    pub fn new(sensor_size: SensorSize, target_size: (usize, usize)) -> Result<Self> {
        sensor_size.validate()?;
        if target_size.0 > sensor_size.width || target_size.1 > sensor_size.height {
            return Err(Error::config(format!(
                "crop size {target_size:?} exceeds sensor size {sensor_size}"
            )));
        }
        Ok(Self {
            sensor_size,
            target_size,
        })
    }
}

impl Transform for RandomCrop {
    fn name(&self) -> &'static str {
        "RandomCrop"
    }

    fn describe(&self) -> String {
        format!(
            "RandomCrop(sensor_size={}, target_size={:?})",
            self.sensor_size, self.target_size
        )
    }

    fn apply(&self, data: &Representation, rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        functional::random_crop(events, self.sensor_size, self.target_size, rng).map(Representation::from)
    }
}

/// Scale timestamps and coordinates by constant factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Downsample {
    /// Multiplier applied to timestamps
    pub time_factor: f64,
    /// Multipliers applied to `(x, y)`
    pub spatial_factor: (f64, f64),
}

impl Downsample {
    /// Create a downsampler from explicit factors
    pub fn new(time_factor: f64, spatial_factor: (f64, f64)) -> Result<Self> {
        let downsample = Self {
            time_factor,
            spatial_factor,
        };
        downsample.check()?;
        Ok(downsample)
    }

    /// Create a downsampler that maps `sensor_size` onto `target_size`
    pub fn with_target_size(
        sensor_size: SensorSize,
        target_size: (usize, usize),
        time_factor: f64,
    ) -> Result<Self> {
        sensor_size.validate()?;
        Self::new(
            time_factor,
            (
                target_size.0 as f64 / sensor_size.width as f64,
                target_size.1 as f64 / sensor_size.height as f64,
            ),
        )
    }

    fn check(&self) -> Result<()> {
        let (sx, sy) = self.spatial_factor;
        if !(self.time_factor > 0.0 && sx > 0.0 && sy > 0.0) {
            return Err(Error::config(format!(
                "downsample factors must be positive, got time={} spatial={:?}",
                self.time_factor, self.spatial_factor
            )));
        }
        Ok(())
    }
}

impl Transform for Downsample {
    fn name(&self) -> &'static str {
        "Downsample"
    }

    fn describe(&self) -> String {
        format!(
            "Downsample(time_factor={}, spatial_factor={:?})",
            self.time_factor, self.spatial_factor
        )
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.check()?;
        Ok(functional::downsample(events, self.time_factor, self.spatial_factor).into())
    }
}

/// Downsample onto a coarser grid with integrate-and-fire neurons
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventDownsampling {
    /// Input sensor bounds
    pub sensor_size: SensorSize,
    /// Output grid `(width, height)`
    pub target_size: (usize, usize),
    /// Integration window
    pub dt: f64,
    /// Firing rule
    #[serde(default)]
    pub method: DownsamplingMethod,
    /// Minimum absolute activity for a bin to fire
    #[serde(default)]
    pub noise_threshold: i64,
    /// Number of sub-windows the differentiator slides over
    #[serde(default = "default_time_bins")]
    pub differentiator_time_bins: usize,
}

fn default_time_bins() -> usize {
    2
}

impl EventDownsampling {
    /// Create an integrator with no noise threshold
    pub fn new(
        sensor_size: SensorSize,
        target_size: (usize, usize),
        dt: f64,
        method: DownsamplingMethod,
    ) -> Result<Self> {
        let downsampling = Self {
            sensor_size,
            target_size,
            dt,
            method,
            noise_threshold: 0,
            differentiator_time_bins: default_time_bins(),
        };
        downsampling.check()?;
        Ok(downsampling)
    }

    /// Set the firing threshold
    #[must_use]
    pub fn noise_threshold(mut self, threshold: i64) -> Self {
        self.noise_threshold = threshold;
        self
    }

    /// Set the number of differentiator sub-windows
    #[must_use]
    pub fn differentiator_time_bins(mut self, bins: usize) -> Self {
        self.differentiator_time_bins = bins;
        self
    }

    fn check(&self) -> Result<()> {
        self.sensor_size.validate()?;
        if self.noise_threshold < 0 {
            return Err(Error::config(format!(
                "noise threshold must be non-negative, got {}",
                self.noise_threshold
            )));
        }
        if self.differentiator_time_bins == 0 {
            return Err(Error::config("differentiator time bins must be positive"));
        }
        if !(self.dt > 0.0) {
            return Err(Error::config(format!("dt must be positive, got {}", self.dt)));
        }
        Ok(())
    }
}

impl Transform for EventDownsampling {
    fn name(&self) -> &'static str {
        "EventDownsampling"
    }

    fn describe(&self) -> String {
        format!(
            "EventDownsampling(sensor_size={}, target_size={:?}, dt={}, method={}, noise_threshold={}, differentiator_time_bins={})",
            self.sensor_size,
            self.target_size,
            self.dt,
            self.method,
            self.noise_threshold,
            self.differentiator_time_bins
        )
    }

    fn apply(&self, data: &Representation, _rng: &mut dyn RngCore) -> Result<Representation> {
        let events = data.expect_events(self.name())?;
        self.check()?;
        let downsampled = match self.method {
            DownsamplingMethod::Integrator => functional::integrator_downsample(
                events,
                self.sensor_size,
                self.target_size,
                self.dt,
                self.noise_threshold,
            )?,
            DownsamplingMethod::Differentiator => functional::differentiator_downsample(
                events,
                self.sensor_size,
                self.target_size,
                self.dt,
                self.differentiator_time_bins,
                self.noise_threshold,
            )?,
        };
        Ok(downsampled.into())
    }
}
