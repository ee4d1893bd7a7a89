//! Event removal: random drops, hot pixels and activity filters

use std::collections::{HashMap, HashSet};

use ndarray::{Array, ArrayD, Axis, Dimension, Slice};
use rand::seq::index;
use rand::Rng;

use event_data_core::{Error, EventStream, Result, SensorSize};

/// Remove exactly `round(drop_probability * n)` events chosen uniformly
/// without replacement; survivors keep their relative order
pub fn drop_event<R: Rng + ?Sized>(
    events: &EventStream,
    drop_probability: f64,
    rng: &mut R,
) -> EventStream {
    let n = events.len();
    let n_dropped = ((drop_probability * n as f64).round() as usize).min(n);

    let mut keep = vec![true; n];
    for i in index::sample(rng, n, n_dropped).iter() {
        keep[i] = false;
    }

    events
        .iter()
        .zip(keep)
        .filter_map(|(e, keep)| keep.then_some(*e))
        .collect()
}

/// Remove every event located at one of `pixels`
pub fn drop_pixel(events: &EventStream, pixels: &[(i64, i64)]) -> EventStream {
    let pixels: HashSet<_> = pixels.iter().copied().collect();
    events
        .iter()
        .filter(|e| !pixels.contains(&e.pixel()))
        .copied()
        .collect()
}

/// Pixels firing more often than `hot_pixel_frequency` (Hz, timestamps in
/// microseconds) over the duration of the recording
///
/// Events outside the sensor grid are ignored.
pub fn identify_hot_pixels(
    events: &EventStream,
    sensor_size: SensorSize,
    hot_pixel_frequency: f64,
) -> Vec<(i64, i64)> {
    let total_time = events.duration() as f64;
    let max_occurrence = hot_pixel_frequency * total_time * 1e-6;

    let mut counts: HashMap<(i64, i64), usize> = HashMap::new();
    for e in events.iter().filter(|e| sensor_size.contains_pixel(e.x, e.y)) {
        *counts.entry(e.pixel()).or_default() += 1;
    }

    let mut hot: Vec<_> = counts
        .into_iter()
        .filter(|&(_, count)| count as f64 > max_occurrence)
        .map(|(pixel, _)| pixel)
        .collect();
    hot.sort_unstable();
    tracing::trace!(hot_pixels = hot.len(), threshold = max_occurrence, "identified hot pixels");
    hot
}

/// Pixels of a dense array whose total count, summed over every leading axis,
/// exceeds `max_count`
///
/// The last two axes of `array` are `[height, width]`.
pub fn identify_hot_pixels_dense<D: Dimension>(array: &Array<i64, D>, max_count: f64) -> Vec<(i64, i64)> {
    let mut totals: ArrayD<i64> = array.view().into_dyn().to_owned();
    while totals.ndim() > 2 {
        totals = totals.sum_axis(Axis(0));
    }

    totals
        .indexed_iter()
        .filter(|&(_, &count)| count as f64 > max_count)
        .map(|(idx, _)| (idx[1] as i64, idx[0] as i64))
        .collect()
}

/// Zero every listed pixel across all leading axes of a dense array
///
/// Pixels outside the array are ignored.
pub fn drop_pixel_dense<A, D>(array: &mut Array<A, D>, pixels: &[(i64, i64)])
where
    A: Clone + Default,
    D: Dimension,
{
    let ndim = array.ndim();
    if ndim < 2 {
        return;
    }
    let (height, width) = (array.shape()[ndim - 2] as i64, array.shape()[ndim - 1] as i64);

    for &(x, y) in pixels {
        if !(0..width).contains(&x) || !(0..height).contains(&y) {
            continue;
        }
        let (x, y) = (x as usize, y as usize);
        array
            .slice_each_axis_mut(|ax| match ax.axis.index() {
                i if i == ndim - 1 => Slice::from(x..x + 1),
                i if i == ndim - 2 => Slice::from(y..y + 1),
                _ => Slice::from(..),
            })
            .fill(A::default());
    }
}

/// Choose `round(fraction * width * height)` distinct pixels uniformly
pub fn random_pixels<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    fraction: f64,
    rng: &mut R,
) -> Vec<(i64, i64)> {
    let n_pixels = width * height;
    let amount = ((fraction * n_pixels as f64).round() as usize).min(n_pixels);
    index::sample(rng, n_pixels, amount)
        .iter()
        .map(|i| ((i % width) as i64, (i / width) as i64))
        .collect()
}

/// Keep every `n`-th event: positions `n-1, 2n-1, ...` of the stream
pub fn decimation(events: &EventStream, n: usize) -> Result<EventStream> {
    if n == 0 {
        return Err(Error::config("decimation factor must be positive"));
    }
    Ok(events.iter().skip(n - 1).step_by(n).copied().collect())
}

/// Keep an event only if no event at the same pixel was kept within the
/// preceding `refractory_period` time units (strictly more must elapse)
pub fn refractory_period(events: &EventStream, refractory_period: i64) -> EventStream {
    let mut last_kept: HashMap<(i64, i64), i64> = HashMap::new();
    events
        .iter()
        .filter(|e| match last_kept.get(&e.pixel()) {
            Some(&last) if e.t <= last + refractory_period => false,
            _ => {
                last_kept.insert(e.pixel(), e.t);
                true
            }
        })
        .copied()
        .collect()
}

const NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Drop events that have no support from their 4-neighbours within
/// `filter_time`
///
/// An event is kept when some neighbouring pixel fired less than
/// `filter_time` before it. Pixels never seen give no support.
pub fn denoise(events: &EventStream, filter_time: i64) -> EventStream {
    let mut last_seen: HashMap<(i64, i64), i64> = HashMap::new();
    let mut kept = EventStream::with_capacity(events.len());

    for e in events {
        let supported = NEIGHBOURS.iter().any(|&(dx, dy)| {
            last_seen
                .get(&(e.x + dx, e.y + dy))
                .is_some_and(|&t| e.t - t < filter_time)
        });
        last_seen.insert(e.pixel(), e.t);
        if supported {
            kept.push(*e);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use event_data_core::Event;
    use ndarray::{Array3, Array4};
    use test_case::test_case;

    #[test_case(0.2)]
    #[test_case(0.5)]
    #[test_case(0.75)]
    fn test_drop_event(p: f64) {
        let (orig, _) = random_input();
        let events = drop_event(&orig, p, &mut rng());
        let expected = orig.len() - (p * orig.len() as f64).round() as usize;
        assert_eq!(events.len(), expected);
        assert!(events.is_time_sorted());
    }

    #[test]
    fn test_drop_event_edges() {
        let (orig, _) = random_input();
        assert_eq!(drop_event(&orig, 0.0, &mut rng()), orig);
        assert!(drop_event(&orig, 1.0, &mut rng()).is_empty());
    }

    #[test]
    fn test_identify_and_drop_hot_pixels() {
        let size = SensorSize::new(10, 10, 2);
        let mut events: Vec<Event> = (0..1000).map(|t| Event::new(3, 4, t * 1000, 1)).collect();
        events.extend((0..10).map(|t| Event::new(7, 1, t * 90_000, 0)));
        let mut events = EventStream::from(events);
        events.sort_by_time();

        // ~1 s recording: pixel (3, 4) fires at 1 kHz, (7, 1) at 10 Hz
        let hot = identify_hot_pixels(&events, size, 100.0);
        assert_eq!(hot, vec![(3, 4)]);

        let cleaned = drop_pixel(&events, &hot);
        assert_eq!(cleaned.len(), 10);
        assert!(cleaned.iter().all(|e| e.pixel() == (7, 1)));
    }

    #[test]
    fn test_drop_pixel_dense() {
        let mut frames = Array4::<i64>::ones((3, 2, 4, 5));
        frames[[0, 1, 2, 3]] = 50;
        let hot = identify_hot_pixels_dense(&frames, 10.0);
        assert_eq!(hot, vec![(3, 2)]);

        drop_pixel_dense(&mut frames, &hot);
        assert_eq!(frames.sum(), 3 * 2 * 4 * 5 - 3 * 2);
        assert!(frames.slice(ndarray::s![.., .., 2, 3]).iter().all(|&v| v == 0));

        let mut image = Array3::<i64>::ones((2, 4, 5));
        drop_pixel_dense(&mut image, &[(0, 0), (4, 3), (99, 0)]);
        assert_eq!(image.sum(), 2 * 4 * 5 - 2 * 2);
    }

    #[test]
    fn test_random_pixels() {
        let pixels = random_pixels(20, 10, 0.25, &mut rng());
        assert_eq!(pixels.len(), 50);
        let unique: HashSet<_> = pixels.iter().collect();
        assert_eq!(unique.len(), 50);
        assert!(pixels.iter().all(|&(x, y)| (0..20).contains(&x) && (0..10).contains(&y)));
    }

    #[test_case(1)]
    #[test_case(3)]
    #[test_case(10)]
    fn test_decimation(n: usize) {
        let (orig, _) = random_input();
        let events = decimation(&orig, n).unwrap();
        assert_eq!(events.len(), orig.len() / n);
        assert_eq!(events[0], orig[n - 1]);
        assert!(decimation(&orig, 0).is_err());
    }

    #[test]
    fn test_refractory_period() {
        let events: EventStream = vec![
            Event::new(0, 0, 0, 1),
            Event::new(0, 0, 50, 1),
            Event::new(1, 0, 60, 1),
            Event::new(0, 0, 100, 0),
            Event::new(0, 0, 101, 0),
        ]
        .into();
        let kept = refractory_period(&events, 100);
        assert_eq!(kept.ts(), vec![0, 60, 101]);
    }

    #[test_case(5_000)]
    #[test_case(50_000)]
    fn test_denoise(filter_time: i64) {
        let (orig, _) = random_input();
        let events = denoise(&orig, filter_time);
        assert!(events.len() < orig.len());
        assert!(events.len() > 0);
        assert!(events.is_time_sorted());
    }

    #[test]
    fn test_denoise_requires_recent_neighbour() {
        let events: EventStream = vec![
            Event::new(5, 5, 0, 1),
            Event::new(6, 5, 10, 1),
            Event::new(9, 9, 20, 1),
            Event::new(5, 5, 500, 1),
        ]
        .into();
        let kept = denoise(&events, 100);
        assert_eq!(kept.as_slice(), &[Event::new(6, 5, 10, 1)]);
    }
}
