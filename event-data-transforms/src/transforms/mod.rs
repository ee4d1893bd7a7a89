//! Configurable transforms implementing [`event_data_core::Transform`]
//!
//! Each struct validates its parameters in `new` and again when applied, so
//! deserialized configurations are checked too. Randomized transforms expose
//! `get_params` to draw the concrete values a single call would use.

mod drop;
mod noise;
mod polarity;
mod representations;
mod spatial;
mod temporal;

pub use drop::{
    Decimation, Denoise, DropEvent, DropEventByArea, DropEventByTime, DropPixel, RandomDropPixel,
    RefractoryPeriod,
};
pub use noise::UniformNoise;
pub use polarity::{MergePolarities, RandomFlipPolarity};
pub use representations::{FrameConfig, ToFrame, ToImage, ToTimesurface};
pub use spatial::{
    CenterCrop, Downsample, EventDownsampling, RandomCrop, RandomFlipLR, RandomFlipUD,
    SpatialJitter,
};
pub use temporal::{CropTime, RandomTimeReversal, TimeAlignment, TimeJitter, TimeSkew};

use event_data_core::{Error, Param, Result};

/// Reject probabilities outside `[0, 1]`
pub(crate) fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::config(format!("{name} must lie within [0, 1], got {p}")))
    }
}

/// Reject ratio parameters that can resolve outside `[0, 1]`
pub(crate) fn check_ratio(name: &str, param: &Param<f64>) -> Result<()> {
    param.validate_within(name, 0.0, 1.0)
}
