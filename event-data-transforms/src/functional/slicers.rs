//! Partition a time-sorted stream into (possibly overlapping) index ranges

use std::ops::Range;

use event_data_core::{Error, EventStream, Result};

fn slice_count(span: f64, window: f64, stride: f64, include_incomplete: bool) -> usize {
    let steps = (span - window) / stride;
    let steps = if include_incomplete { steps.ceil() } else { steps.floor() };
    (steps.max(0.0) as usize) + 1
}

fn ranges_for_windows(events: &EventStream, windows: impl Iterator<Item = (f64, f64)>) -> Vec<Range<usize>> {
    let events = events.as_slice();
    windows
        .map(|(start, end)| {
            let lo = events.partition_point(|e| (e.t as f64) < start);
            let hi = events.partition_point(|e| (e.t as f64) < end);
            lo..hi.max(lo)
        })
        .collect()
}

/// Slice into windows of `time_window` whose starts advance by
/// `time_window - overlap`
///
/// Windows are half-open `[start, start + time_window)`. A trailing partial
/// window is kept only with `include_incomplete`.
pub fn slice_by_time(
    events: &EventStream,
    time_window: f64,
    overlap: f64,
    include_incomplete: bool,
) -> Result<Vec<Range<usize>>> {
    if !(time_window > 0.0) {
        return Err(Error::config(format!("time window must be positive, got {time_window}")));
    }
    if !(0.0..time_window).contains(&overlap) {
        return Err(Error::config(format!(
            "overlap {overlap} must lie in [0, time window {time_window})"
        )));
    }
    let (Some(first), Some(last)) = (events.first_t(), events.last_t()) else {
        return Ok(Vec::new());
    };

    let stride = time_window - overlap;
    let first = first as f64;
    let n = slice_count(last as f64 - first, time_window, stride, include_incomplete);
    let windows = (0..n).map(|i| {
        let start = first + i as f64 * stride;
        (start, start + time_window)
    });
    Ok(ranges_for_windows(events, windows))
}

/// Slice into chunks of `event_count` events whose starts advance by
/// `event_count - overlap`
pub fn slice_by_count(
    events: &EventStream,
    event_count: usize,
    overlap: usize,
    include_incomplete: bool,
) -> Result<Vec<Range<usize>>> {
    if event_count == 0 {
        return Err(Error::config("event count must be positive"));
    }
    if overlap >= event_count {
        return Err(Error::config(format!(
            "overlap {overlap} must be smaller than event count {event_count}"
        )));
    }
    let n_events = events.len();
    if n_events == 0 {
        return Ok(Vec::new());
    }

    let count = event_count.min(n_events);
    let stride = (count - overlap.min(count - 1)) as f64;
    let n = slice_count(n_events as f64, count as f64, stride, include_incomplete);
    let stride = stride as usize;
    Ok((0..n)
        .map(|i| {
            let start = i * stride;
            start..(start + count).min(n_events)
        })
        .collect())
}

/// Slice the recording's duration into `n_bins` equal windows, each widened
/// by `overlap` (a fraction of the bin length)
///
/// The last window is closed so the final event is always included.
pub fn slice_by_time_bins(events: &EventStream, n_bins: usize, overlap: f64) -> Result<Vec<Range<usize>>> {
    check_bins(n_bins, overlap)?;
    let (Some(first), Some(last)) = (events.first_t(), events.last_t()) else {
        return Ok(Vec::new());
    };

    let bin_length = (last - first) as f64 / n_bins as f64;
    let window = bin_length * (1.0 + overlap);
    let stride = window * (1.0 - overlap);
    let first = first as f64;
    let windows = (0..n_bins).map(|i| {
        let start = first + i as f64 * stride;
        (start, start + window)
    });

    let mut ranges = ranges_for_windows(events, windows);
    if let Some(tail) = ranges.last_mut() {
        let slice = events.as_slice();
        tail.end = slice.partition_point(|e| e.t <= last).max(tail.start);
    }
    Ok(ranges)
}

/// Slice into `n_bins` chunks of equal event count, each widened by
/// `overlap` (a fraction of the chunk length)
///
/// The last chunk extends to the end of the stream.
pub fn slice_by_event_bins(events: &EventStream, n_bins: usize, overlap: f64) -> Result<Vec<Range<usize>>> {
    check_bins(n_bins, overlap)?;
    let n_events = events.len();
    if n_events == 0 {
        return Ok(Vec::new());
    }

    let count = ((n_events / n_bins) as f64 * (1.0 + overlap)) as usize;
    let stride = (count as f64 * (1.0 - overlap)) as usize;
    Ok((0..n_bins)
        .map(|i| {
            let start = (i * stride).min(n_events);
            let end = if i + 1 == n_bins { n_events } else { (start + count).min(n_events) };
            start..end
        })
        .collect())
}

fn check_bins(n_bins: usize, overlap: f64) -> Result<()> {
    if n_bins == 0 {
        return Err(Error::config("number of bins must be positive"));
    }
    if !(0.0..1.0).contains(&overlap) {
        return Err(Error::config(format!("bin overlap {overlap} must lie in [0, 1)")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_data_core::Event;
    use test_case::test_case;

    fn ticks(n: i64) -> EventStream {
        (0..n).map(|t| Event::new(0, 0, t * 10, 0)).collect()
    }

    #[test_case(0.0, false, vec![0..5, 5..10] ; "disjoint")]
    #[test_case(0.0, true, vec![0..5, 5..10, 10..12] ; "disjoint with tail")]
    #[test_case(20.0, false, vec![0..5, 3..8, 6..11] ; "overlapping")]
    fn test_slice_by_time(overlap: f64, include_incomplete: bool, expected: Vec<Range<usize>>) {
        // Timestamps 0, 10, ..., 110
        let slices = slice_by_time(&ticks(12), 50.0, overlap, include_incomplete).unwrap();
        assert_eq!(slices, expected);
    }

    #[test_case(0, false, vec![0..4, 4..8] ; "disjoint")]
    #[test_case(0, true, vec![0..4, 4..8, 8..10] ; "disjoint with tail")]
    #[test_case(2, false, vec![0..4, 2..6, 4..8, 6..10] ; "overlapping")]
    fn test_slice_by_count(overlap: usize, include_incomplete: bool, expected: Vec<Range<usize>>) {
        let slices = slice_by_count(&ticks(10), 4, overlap, include_incomplete).unwrap();
        assert_eq!(slices, expected);
    }

    #[test]
    fn test_bins_cover_every_event() {
        let events = ticks(101);
        let by_time = slice_by_time_bins(&events, 7, 0.0).unwrap();
        assert_eq!(by_time.len(), 7);
        assert_eq!(by_time.iter().map(ExactSizeIterator::len).sum::<usize>(), 101);

        let by_count = slice_by_event_bins(&events, 7, 0.0).unwrap();
        assert_eq!(by_count.len(), 7);
        assert_eq!(by_count[0], 0..14);
        assert_eq!(by_count.iter().map(ExactSizeIterator::len).sum::<usize>(), 101);
    }

    #[test]
    fn test_invalid_overlap_and_empty_input() {
        assert!(slice_by_time(&ticks(5), 10.0, 10.0, false).is_err());
        assert!(slice_by_count(&ticks(5), 3, 3, false).is_err());
        assert!(slice_by_event_bins(&ticks(5), 2, 1.0).is_err());
        assert!(slice_by_time_bins(&ticks(5), 0, 0.0).is_err());
        assert!(slice_by_time(&EventStream::new(), 10.0, 0.0, false).unwrap().is_empty());
    }
}
