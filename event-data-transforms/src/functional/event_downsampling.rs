//! Spatio-temporal event downsampling with integrate-and-fire style neurons
//!
//! The sensor is tiled onto a coarser `target_size` grid and each target
//! pixel accumulates signed activity (+1 for positive polarity, -1 otherwise)
//! over fixed time windows. The integrator fires on the window total; the
//! differentiator fires on changes in a sliding sum of sub-window activity.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use event_data_core::{Error, Event, EventStream, Result, SensorSize};

/// How window activity is turned into output events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsamplingMethod {
    /// Fire on the signed total of each window
    #[default]
    Integrator,

    /// Fire when a sliding sum of sub-window activity crosses the threshold
    Differentiator,
}

impl fmt::Display for DownsamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownsamplingMethod::Integrator => write!(f, "integrator"),
            DownsamplingMethod::Differentiator => write!(f, "differentiator"),
        }
    }
}

impl FromStr for DownsamplingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "integrator" => Ok(DownsamplingMethod::Integrator),
            "differentiator" => Ok(DownsamplingMethod::Differentiator),
            other => Err(Error::config(format!("unknown downsampling method: {other}"))),
        }
    }
}

/// Signed activity of one target pixel within one window
#[derive(Debug, Clone, Copy)]
struct BinActivity {
    x: i64,
    y: i64,
    sum: i64,
    last_t: i64,
}

/// Group events into windows of length `window` and accumulate per target
/// pixel; windows are returned in time order, bins in order of first
/// activation
fn windowed_activity(
    events: &EventStream,
    sensor_size: SensorSize,
    target_size: (usize, usize),
    window: f64,
) -> BTreeMap<i64, Vec<BinActivity>> {
    let mut windows: BTreeMap<i64, Vec<BinActivity>> = BTreeMap::new();
    let mut slots: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let Some(t0) = events.min_t() else {
        return windows;
    };

    let (sw, sh) = (sensor_size.width as i64, sensor_size.height as i64);
    let (tw, th) = (target_size.0 as i64, target_size.1 as i64);

    for e in events.iter().filter(|e| sensor_size.contains_pixel(e.x, e.y)) {
        let w = ((e.t - t0) as f64 / window).floor() as i64;
        let (x, y) = (e.x * tw / sw, e.y * th / sh);
        let delta = if e.p > 0 { 1 } else { -1 };

        let bins = windows.entry(w).or_default();
        let slot = *slots.entry((w, x, y)).or_insert_with(|| {
            bins.push(BinActivity {
                x,
                y,
                sum: 0,
                last_t: e.t,
            });
            bins.len() - 1
        });
        let bin = &mut bins[slot];
        bin.sum += delta;
        bin.last_t = bin.last_t.max(e.t);
    }

    windows
}

fn check_config(sensor_size: SensorSize, target_size: (usize, usize), dt: f64) -> Result<()> {
    sensor_size.validate()?;
    if target_size.0 == 0 || target_size.1 == 0 {
        return Err(Error::config(format!("target size must be positive, got {target_size:?}")));
    }
    if !(dt > 0.0) {
        return Err(Error::config(format!("dt must be positive, got {dt}")));
    }
    Ok(())
}

fn fire(x: i64, y: i64, t: i64, sum: i64) -> Event {
    Event::new(x, y, t, i64::from(sum > 0))
}

/// Integrate signed activity per target pixel over windows of `dt`
///
/// A bin fires once per window when its total is non-zero and its magnitude
/// reaches `noise_threshold`. The event carries the bin's last timestamp
/// within the window.
pub fn integrator_downsample(
    events: &EventStream,
    sensor_size: SensorSize,
    target_size: (usize, usize),
    dt: f64,
    noise_threshold: i64,
) -> Result<EventStream> {
    check_config(sensor_size, target_size, dt)?;

    let mut out: EventStream = windowed_activity(events, sensor_size, target_size, dt)
        .into_values()
        .flatten()
        .filter(|bin| bin.sum != 0 && bin.sum.abs() >= noise_threshold)
        .map(|bin| fire(bin.x, bin.y, bin.last_t, bin.sum))
        .collect();
    out.sort_by_time();
    Ok(out)
}

/// Fire on changes of a sliding sum over the last `time_bins` sub-windows of
/// length `dt / time_bins`
///
/// An active bin fires when the sliding sum rises to `noise_threshold` from
/// below, or flips sign while at or above it.
pub fn differentiator_downsample(
    events: &EventStream,
    sensor_size: SensorSize,
    target_size: (usize, usize),
    dt: f64,
    time_bins: usize,
    noise_threshold: i64,
) -> Result<EventStream> {
    check_config(sensor_size, target_size, dt)?;
    if time_bins == 0 {
        return Err(Error::config("differentiator time bins must be positive"));
    }

    let span = time_bins as i64;
    let mut history: HashMap<(i64, i64), VecDeque<(i64, i64)>> = HashMap::new();
    let mut out = EventStream::new();

    let sub_window = dt / time_bins as f64;
    for (w, bins) in windowed_activity(events, sensor_size, target_size, sub_window) {
        for bin in bins {
            let buffer = history.entry((bin.x, bin.y)).or_default();
            while buffer.front().is_some_and(|&(old, _)| old <= w - span) {
                buffer.pop_front();
            }

            let previous: i64 = buffer.iter().map(|&(_, sum)| sum).sum();
            buffer.push_back((w, bin.sum));
            let current = previous + bin.sum;

            let above = current != 0 && current.abs() >= noise_threshold;
            let was_above = previous != 0 && previous.abs() >= noise_threshold;
            let flipped = previous.signum() != current.signum();
            if above && (!was_above || flipped) {
                out.push(fire(bin.x, bin.y, bin.last_t, current));
            }
        }
    }

    out.sort_by_time();
    Ok(out)
}
