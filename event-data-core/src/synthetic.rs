//! Synthetic recordings for tests, benchmarks and demos

use rand::Rng;

use crate::event::{Event, EventStream, SensorSize};

/// Upper bound (exclusive) of generated timestamps
pub const MAX_TIMESTAMP: i64 = 1_000_000;

/// Generate `n_events` uniformly random events on the sensor grid, sorted by
/// timestamp, with timestamps in `[0, MAX_TIMESTAMP)`
pub fn random_events<R: Rng + ?Sized>(
    sensor_size: SensorSize,
    n_events: usize,
    rng: &mut R,
) -> EventStream {
    let width = sensor_size.width.max(1) as i64;
    let height = sensor_size.height.max(1) as i64;
    let polarities = sensor_size.polarities.max(1) as i64;

    let mut events: EventStream = (0..n_events)
        .map(|_| Event {
            x: rng.gen_range(0..width),
            y: rng.gen_range(0..height),
            t: rng.gen_range(0..MAX_TIMESTAMP),
            p: rng.gen_range(0..polarities),
        })
        .collect();
    events.sort_by_time();
    events
}
