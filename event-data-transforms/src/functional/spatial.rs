//! Transforms that move, mirror or crop events on the sensor grid

use rand::Rng;
use rand_distr::StandardNormal;

use event_data_core::{Error, Event, EventStream, Result, SensorSize};

/// Lower-triangular factor `[l11, l21, l22]` of the jitter covariance
/// `[[var_x, sigma_xy], [sigma_xy, var_y]]`
pub fn jitter_factor(var_x: f64, var_y: f64, sigma_xy: f64) -> Result<[f64; 3]> {
    if !(var_x >= 0.0 && var_y >= 0.0) || !sigma_xy.is_finite() {
        return Err(Error::config(format!(
            "jitter variances must be non-negative, got var_x={var_x}, var_y={var_y}"
        )));
    }

    let l11 = var_x.sqrt();
    let l21 = if l11 > 0.0 {
        sigma_xy / l11
    } else if sigma_xy == 0.0 {
        0.0
    } else {
        return Err(Error::config("sigma_xy must be 0 when var_x is 0"));
    };

    let remainder = var_y - l21 * l21;
    if remainder < -1e-9 {
        return Err(Error::config(format!(
            "covariance [[{var_x}, {sigma_xy}], [{sigma_xy}, {var_y}]] is not positive semi-definite"
        )));
    }

    Ok([l11, l21, remainder.max(0.0).sqrt()])
}

/// Shift every event by correlated Gaussian noise, rounding to whole pixels
///
/// With `clip_outliers`, events that leave the sensor are dropped; otherwise
/// they are kept with out-of-range coordinates.
pub fn spatial_jitter<R: Rng + ?Sized>(
    events: &EventStream,
    sensor_size: SensorSize,
    var_x: f64,
    var_y: f64,
    sigma_xy: f64,
    clip_outliers: bool,
    rng: &mut R,
) -> Result<EventStream> {
    let [l11, l21, l22] = jitter_factor(var_x, var_y, sigma_xy)?;

    let mut jittered = EventStream::with_capacity(events.len());
    for event in events {
        let z1: f64 = rng.sample(StandardNormal);
        let z2: f64 = rng.sample(StandardNormal);
        let x = event.x + (l11 * z1).round() as i64;
        let y = event.y + (l21 * z1 + l22 * z2).round() as i64;

        if clip_outliers && !sensor_size.contains_pixel(x, y) {
            continue;
        }
        jittered.push(Event { x, y, ..*event });
    }

    Ok(jittered)
}

/// Mirror events horizontally: `x -> width - 1 - x`
pub fn flip_lr(events: &EventStream, width: usize) -> EventStream {
    let last = width as i64 - 1;
    events
        .iter()
        .map(|e| Event { x: last - e.x, ..*e })
        .collect()
}

/// Mirror events vertically: `y -> height - 1 - y`
pub fn flip_ud(events: &EventStream, height: usize) -> EventStream {
    let last = height as i64 - 1;
    events
        .iter()
        .map(|e| Event { y: last - e.y, ..*e })
        .collect()
}

/// Keep the events inside a `size` window whose top-left corner is `origin`,
/// translated into the window's coordinate system
pub fn crop(events: &EventStream, origin: (i64, i64), size: (usize, usize)) -> EventStream {
    let (x0, y0) = origin;
    let (w, h) = (size.0 as i64, size.1 as i64);
    events
        .iter()
        .filter(|e| e.x >= x0 && e.x < x0 + w && e.y >= y0 && e.y < y0 + h)
        .map(|e| Event {
            x: e.x - x0,
            y: e.y - y0,
            ..*e
        })
        .collect()
}

/// Crop a `size` window from the middle of the sensor
///
/// A window larger than the sensor is anchored at the origin.
pub fn center_crop(events: &EventStream, sensor_size: SensorSize, size: (usize, usize)) -> EventStream {
    let x0 = ((sensor_size.width as i64 - size.0 as i64) / 2).max(0);
    let y0 = ((sensor_size.height as i64 - size.1 as i64) / 2).max(0);
    crop(events, (x0, y0), size)
}

/// Crop a `target_size` window placed uniformly at random on the sensor
pub fn random_crop<R: Rng + ?Sized>(
    events: &EventStream,
    sensor_size: SensorSize,
    target_size: (usize, usize),
    rng: &mut R,
) -> Result<EventStream> {
    if target_size.0 > sensor_size.width || target_size.1 > sensor_size.height {
        return Err(Error::config(format!(
            "crop size {target_size:?} exceeds sensor size {}x{}",
            sensor_size.width, sensor_size.height
        )));
    }
    let x0 = rng.gen_range(0..=sensor_size.width - target_size.0) as i64;
    let y0 = rng.gen_range(0..=sensor_size.height - target_size.1) as i64;
    Ok(crop(events, (x0, y0), target_size))
}

/// Scale timestamps by `time_factor` and coordinates by `spatial_factor`
///
/// Timestamps are truncated and coordinates floored to integers.
pub fn downsample(events: &EventStream, time_factor: f64, spatial_factor: (f64, f64)) -> EventStream {
    let (sx, sy) = spatial_factor;
    events
        .iter()
        .map(|e| Event {
            x: (e.x as f64 * sx).floor() as i64,
            y: (e.y as f64 * sy).floor() as i64,
            t: (e.t as f64 * time_factor) as i64,
            p: e.p,
        })
        .collect()
}

/// Remove all events inside a randomly placed box covering `area_ratio` of
/// the sensor along each axis
pub fn drop_by_area<R: Rng + ?Sized>(
    events: &EventStream,
    sensor_size: SensorSize,
    area_ratio: f64,
    rng: &mut R,
) -> EventStream {
    let cut_w = (area_ratio * sensor_size.width as f64) as usize;
    let cut_h = (area_ratio * sensor_size.height as f64) as usize;
    let x0 = rng.gen_range(0..=sensor_size.width.saturating_sub(cut_w)) as i64;
    let y0 = rng.gen_range(0..=sensor_size.height.saturating_sub(cut_h)) as i64;
    let (x1, y1) = (x0 + cut_w as i64, y0 + cut_h as i64);

    events
        .iter()
        .filter(|e| !(e.x >= x0 && e.x < x1 && e.y >= y0 && e.y < y1))
        .copied()
        .collect()
}
