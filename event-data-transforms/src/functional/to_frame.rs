//! Accumulate events into dense count tensors

use std::ops::Range;

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, Event, EventStream, Result, SensorSize};

use super::slicers::{slice_by_count, slice_by_event_bins, slice_by_time, slice_by_time_bins};

/// How a stream is partitioned into frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStrategy {
    /// Fixed-length time windows
    TimeWindow(f64),

    /// Fixed number of events per frame
    EventCount(usize),

    /// Fixed number of frames of equal duration
    TimeBins(usize),

    /// Fixed number of frames of equal event count
    EventBins(usize),
}

impl SliceStrategy {
    /// Number of frames produced for an empty recording
    pub fn empty_frames(&self) -> usize {
        match *self {
            SliceStrategy::TimeBins(n) | SliceStrategy::EventBins(n) => n.max(1),
            SliceStrategy::TimeWindow(_) | SliceStrategy::EventCount(_) => 1,
        }
    }

    /// Index ranges of the frames for `events`
    pub fn slice(&self, events: &EventStream, overlap: f64, include_incomplete: bool) -> Result<Vec<Range<usize>>> {
        match *self {
            SliceStrategy::TimeWindow(window) => slice_by_time(events, window, overlap, include_incomplete),
            SliceStrategy::EventCount(count) => {
                if overlap < 0.0 || overlap.fract() != 0.0 {
                    return Err(Error::config(format!(
                        "event count overlap must be a whole number of events, got {overlap}"
                    )));
                }
                slice_by_count(events, count, overlap as usize, include_incomplete)
            }
            SliceStrategy::TimeBins(n) => slice_by_time_bins(events, n, overlap),
            SliceStrategy::EventBins(n) => slice_by_event_bins(events, n, overlap),
        }
    }
}

/// Polarity index of `event` in a dense tensor; single-polarity sensors fold
/// every event onto index 0
fn polarity_index(event: &Event, sensor_size: SensorSize) -> i64 {
    if sensor_size.polarities == 1 {
        0
    } else {
        event.p
    }
}

fn checked_index(event: &Event, sensor_size: SensorSize) -> Result<(usize, usize, usize)> {
    let p = polarity_index(event, sensor_size);
    let in_grid = sensor_size.contains_pixel(event.x, event.y)
        && (0..sensor_size.polarities as i64).contains(&p);
    if !in_grid {
        return Err(Error::EventOutOfBounds {
            x: event.x,
            y: event.y,
            p: event.p,
        });
    }
    Ok((p as usize, event.y as usize, event.x as usize))
}

/// Count events per `[polarity, height, width]` cell
pub fn to_image(events: &EventStream, sensor_size: SensorSize) -> Result<Array3<i64>> {
    sensor_size.validate()?;
    let mut image = Array3::zeros((sensor_size.polarities, sensor_size.height, sensor_size.width));
    for event in events {
        let (p, y, x) = checked_index(event, sensor_size)?;
        image[[p, y, x]] += 1;
    }
    Ok(image)
}

/// Count events per `[frame, polarity, height, width]` cell, with frames cut
/// according to `strategy`
pub fn to_frame(
    events: &EventStream,
    sensor_size: SensorSize,
    strategy: SliceStrategy,
    overlap: f64,
    include_incomplete: bool,
) -> Result<Array4<i64>> {
    sensor_size.validate()?;
    let dims = (sensor_size.polarities, sensor_size.height, sensor_size.width);

    // Slicing validates the strategy even when there is nothing to slice
    let slices = strategy.slice(events, overlap, include_incomplete)?;
    if events.is_empty() {
        let n = strategy.empty_frames();
        return Ok(Array4::zeros((n, dims.0, dims.1, dims.2)));
    }

    tracing::trace!(frames = slices.len(), events = events.len(), "framing events");
    let mut frames = Array4::zeros((slices.len(), dims.0, dims.1, dims.2));
    let events = events.as_slice();
    for (i, range) in slices.into_iter().enumerate() {
        for event in &events[range] {
            let (p, y, x) = checked_index(event, sensor_size)?;
            frames[[i, p, y, x]] += 1;
        }
    }
    Ok(frames)
}
