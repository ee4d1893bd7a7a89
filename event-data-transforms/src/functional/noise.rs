//! Synthetic background activity

use rand::Rng;

use event_data_core::{Event, EventStream, SensorSize};

/// Merge `n` uniformly random events into the stream
///
/// Noise coordinates are drawn over the full sensor and timestamps over the
/// recording's `[min_t, max_t]`. The result is stably sorted by time, so an
/// original event precedes a noise event with the same timestamp. An empty
/// stream gets no noise.
pub fn uniform_noise<R: Rng + ?Sized>(
    events: &EventStream,
    sensor_size: SensorSize,
    n: usize,
    rng: &mut R,
) -> EventStream {
    let (Some(t_min), Some(t_max)) = (events.min_t(), events.max_t()) else {
        return EventStream::new();
    };

    let width = sensor_size.width.max(1) as i64;
    let height = sensor_size.height.max(1) as i64;
    let polarities = sensor_size.polarities.max(1) as i64;

    let mut merged = EventStream::with_capacity(events.len() + n);
    for e in events {
        merged.push(*e);
    }
    for _ in 0..n {
        merged.push(Event {
            x: rng.gen_range(0..width),
            y: rng.gen_range(0..height),
            t: rng.gen_range(t_min..=t_max),
            p: rng.gen_range(0..polarities),
        });
    }
    merged.sort_by_time();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_input, rng};
    use test_case::test_case;

    #[test_case(0)]
    #[test_case(100)]
    #[test_case(5_000)]
    fn test_uniform_noise(n: usize) {
        let (orig, size) = random_input();
        let noisy = uniform_noise(&orig, size, n, &mut rng());

        assert_eq!(noisy.len(), orig.len() + n);
        assert!(noisy.is_time_sorted());
        assert!(noisy.iter().all(|e| size.contains(e)));
        assert_eq!(noisy.min_t(), orig.min_t());
        assert_eq!(noisy.max_t(), orig.max_t());
    }

    #[test]
    fn test_uniform_noise_on_empty_stream() {
        let size = SensorSize::new(10, 10, 2);
        assert!(uniform_noise(&EventStream::new(), size, 100, &mut rng()).is_empty());
    }
}
