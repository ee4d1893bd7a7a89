//! Transforms acting on event timestamps

use ndarray::{s, Array3, Array4};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use event_data_core::{Error, Event, EventStream, Result};

/// Add zero-mean Gaussian noise with standard deviation `std` to every
/// timestamp, rounded to integers
///
/// With `clip_negative`, events whose jittered timestamp is negative are
/// removed. With `sort_timestamps`, the output is re-sorted by time.
pub fn time_jitter<R: Rng + ?Sized>(
    events: &EventStream,
    std: f64,
    clip_negative: bool,
    sort_timestamps: bool,
    rng: &mut R,
) -> Result<EventStream> {
    let normal = Normal::new(0.0, std)
        .map_err(|err| Error::config(format!("invalid jitter std {std}: {err}")))?;

    let mut jittered: EventStream = events
        .iter()
        .map(|e| Event {
            t: e.t + normal.sample(rng).round() as i64,
            ..*e
        })
        .filter(|e| !clip_negative || e.t >= 0)
        .collect();

    if sort_timestamps {
        jittered.sort_by_time();
    }
    Ok(jittered)
}

/// Linear time remapping `t -> floor(t * coefficient + offset)`
pub fn time_skew(events: &EventStream, coefficient: f64, offset: f64) -> EventStream {
    events
        .iter()
        .map(|e| Event {
            t: (e.t as f64 * coefficient + offset).floor() as i64,
            ..*e
        })
        .collect()
}

/// Play the recording backwards
///
/// Event order is reversed, each timestamp becomes `max_t - t` and
/// polarities are inverted.
pub fn time_reversal(events: &EventStream) -> EventStream {
    let Some(max_t) = events.max_t() else {
        return EventStream::new();
    };
    events
        .iter()
        .rev()
        .map(|e| Event {
            t: max_t - e.t,
            p: i64::from(e.p == 0),
            ..*e
        })
        .collect()
}

/// Reverse a `[bin, polarity, height, width]` frame stack along both the time
/// and polarity axes
pub fn time_reversal_frames<A: Clone>(frames: &Array4<A>) -> Array4<A> {
    frames.slice(s![..;-1, ..;-1, .., ..]).to_owned()
}

/// Reverse the polarity axis of a `[polarity, height, width]` image
pub fn time_reversal_image<A: Clone>(image: &Array3<A>) -> Array3<A> {
    image.slice(s![..;-1, .., ..]).to_owned()
}

/// Keep events with `min_time <= t <= max_time`; a missing bound is open
pub fn crop_time(events: &EventStream, min_time: Option<i64>, max_time: Option<i64>) -> EventStream {
    events
        .iter()
        .filter(|e| min_time.map_or(true, |lo| e.t >= lo) && max_time.map_or(true, |hi| e.t <= hi))
        .copied()
        .collect()
}

/// Shift timestamps so the first event occurs at time 0
pub fn time_alignment(events: &EventStream) -> EventStream {
    let Some(t0) = events.first_t() else {
        return EventStream::new();
    };
    events
        .iter()
        .map(|e| Event { t: e.t - t0, ..*e })
        .collect()
}

/// Remove every event inside a random closed interval whose length is
/// `duration_ratio` of the recording
pub fn drop_by_time<R: Rng + ?Sized>(
    events: &EventStream,
    duration_ratio: f64,
    rng: &mut R,
) -> EventStream {
    let (Some(t_start), Some(t_end)) = (events.min_t(), events.max_t()) else {
        return EventStream::new();
    };

    let (t_start, t_end) = (t_start as f64, t_end as f64);
    let duration = (t_end - t_start) * duration_ratio;
    let latest_start = t_end - duration;
    let drop_start = if latest_start > t_start {
        rng.gen_range(t_start..latest_start)
    } else {
        t_start
    };
    let drop_end = drop_start + duration;

    events
        .iter()
        .filter(|e| {
            let t = e.t as f64;
            t < drop_start || t > drop_end
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use ndarray::Array;
    use test_case::test_case;

    #[test_case(10.0, true, true)]
    #[test_case(50.0, false, true)]
    #[test_case(100.0, true, false)]
    fn test_time_jitter(std: f64, clip_negative: bool, sort_timestamps: bool) {
        let (orig, _) = random_input();
        let events = time_jitter(&orig, std, clip_negative, sort_timestamps, &mut rng()).unwrap();

        if clip_negative {
            assert!(events.iter().all(|e| e.t >= 0));
        } else {
            assert_eq!(events.len(), orig.len());
            assert_eq!(events.xs(), orig.xs());
            assert_eq!(events.ps(), orig.ps());
        }
        if sort_timestamps {
            assert!(events.is_time_sorted());
        }
        assert_ne!(events.ts(), orig.ts());
    }

    #[test]
    fn test_time_jitter_rejects_negative_std() {
        let (orig, _) = random_input();
        assert!(time_jitter(&orig, -1.0, false, false, &mut rng())
            .unwrap_err()
            .is_configuration());
    }

    #[test_case(3.1, 0.0)]
    #[test_case(0.7, -10.0)]
    #[test_case(2.7, 1.0)]
    fn test_time_skew(coefficient: f64, offset: f64) {
        let (orig, _) = random_input();
        let events = time_skew(&orig, coefficient, offset);
        assert_eq!(events.len(), orig.len());
        assert!(events.is_time_sorted());
        for (a, b) in orig.iter().zip(events.iter()) {
            assert_eq!(b.t, (a.t as f64 * coefficient + offset).floor() as i64);
        }
    }

    #[test]
    fn test_time_reversal() {
        let (orig, _) = random_input();
        let reversed = time_reversal(&orig);
        let max_t = orig.max_t().unwrap();

        assert_eq!(reversed.len(), orig.len());
        assert!(reversed.is_time_sorted());
        for (a, b) in orig.iter().rev().zip(reversed.iter()) {
            assert_eq!(b.t, max_t - a.t);
            assert_eq!(b.p, i64::from(a.p == 0));
            assert_eq!(b.pixel(), a.pixel());
        }
        assert!(time_reversal(&EventStream::new()).is_empty());
    }

    #[test]
    fn test_time_reversal_frames() {
        let frames = Array::from_shape_fn((3, 2, 4, 5), |(b, p, y, x)| (b * 1000 + p * 100 + y * 10 + x) as i64);
        let reversed = time_reversal_frames(&frames);
        assert_eq!(reversed.shape(), frames.shape());
        assert_eq!(reversed[[0, 0, 1, 2]], frames[[2, 1, 1, 2]]);
        assert_eq!(reversed[[2, 1, 3, 4]], frames[[0, 0, 3, 4]]);

        let image = frames.index_axis(ndarray::Axis(0), 0).to_owned();
        let flipped = time_reversal_image(&image);
        assert_eq!(flipped[[0, 3, 1]], image[[1, 3, 1]]);
    }

    #[test_case(Some(1000), Some(100_000))]
    #[test_case(None, Some(5000))]
    #[test_case(Some(900_000), None)]
    fn test_crop_time(min_time: Option<i64>, max_time: Option<i64>) {
        let (orig, _) = random_input();
        let events = crop_time(&orig, min_time, max_time);
        let lo = min_time.unwrap_or(i64::MIN);
        let hi = max_time.unwrap_or(i64::MAX);
        assert!(events.iter().all(|e| e.t >= lo && e.t <= hi));
        assert_eq!(
            events.len(),
            orig.iter().filter(|e| e.t >= lo && e.t <= hi).count()
        );
    }

    #[test]
    fn test_time_alignment() {
        let events: EventStream = vec![Event::new(0, 0, 500, 1), Event::new(1, 0, 700, 0)].into();
        let aligned = time_alignment(&events);
        assert_eq!(aligned.ts(), vec![0, 200]);
    }

    #[test_case(0.2)]
    #[test_case(0.5)]
    #[test_case(0.75)]
    fn test_drop_by_time(duration_ratio: f64) {
        let (orig, _) = random_input();
        let events = drop_by_time(&orig, duration_ratio, &mut rng());
        assert!(events.len() < orig.len());

        let duration = (orig.max_t().unwrap() - orig.min_t().unwrap()) as f64 * duration_ratio;
        let ts = events.ts();
        let largest_gap = ts.windows(2).map(|w| w[1] - w[0]).max().unwrap();
        assert!(largest_gap as f64 >= duration);
    }
}
