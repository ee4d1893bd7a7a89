//! Pure transform kernels
//!
//! Every function here takes its input by reference and returns a new value.
//! Randomized kernels take the random number generator as an argument so
//! callers control seeding.

pub mod drop;
pub mod event_downsampling;
pub mod noise;
pub mod polarity;
pub mod slicers;
pub mod spatial;
pub mod temporal;
pub mod to_frame;
pub mod to_timesurface;

pub use drop::{
    decimation, denoise, drop_event, drop_pixel, drop_pixel_dense, identify_hot_pixels,
    identify_hot_pixels_dense, random_pixels, refractory_period,
};
pub use event_downsampling::{differentiator_downsample, integrator_downsample, DownsamplingMethod};
pub use noise::uniform_noise;
pub use polarity::{flip_polarity, merge_polarities};
pub use slicers::{slice_by_count, slice_by_event_bins, slice_by_time, slice_by_time_bins};
pub use spatial::{
    center_crop, crop, downsample, drop_by_area, flip_lr, flip_ud, random_crop, spatial_jitter,
};
pub use temporal::{
    crop_time, drop_by_time, time_alignment, time_jitter, time_reversal, time_reversal_frames,
    time_reversal_image, time_skew,
};
pub use to_frame::{to_frame, to_image, SliceStrategy};
pub use to_timesurface::{to_timesurface, Decay};
