//! Event stream model shared by every transform and builder
//!
//! An [`EventStream`] is an owned, ordered sequence of [`Event`]s recorded by a
//! sensor bounded by a [`SensorSize`]. Streams are ordered by non-decreasing
//! timestamp unless a transform documents otherwise.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single sensor activation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Column, in `[0, width)`
    pub x: i64,

    /// Row, in `[0, height)`; always 0 for one-dimensional sensors
    pub y: i64,

    /// Timestamp in sensor units (microseconds for camera recordings)
    pub t: i64,

    /// Polarity or channel id, in `[0, polarities)`
    pub p: i64,
}

impl Event {
    /// Create a new event
    pub const fn new(x: i64, y: i64, t: i64, p: i64) -> Self {
        Self { x, y, t, p }
    }

    /// Spatial coordinate of this event
    pub const fn pixel(&self) -> (i64, i64) {
        (self.x, self.y)
    }
}

/// Bounding dimensions of a sensor grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorSize {
    /// Number of columns
    pub width: usize,

    /// Number of rows (1 for one-dimensional sensors)
    pub height: usize,

    /// Number of polarities or channels
    pub polarities: usize,
}

impl SensorSize {
    /// Create a new sensor size
    pub const fn new(width: usize, height: usize, polarities: usize) -> Self {
        Self {
            width,
            height,
            polarities,
        }
    }

    /// Number of pixels on the spatial grid
    pub const fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether the spatial coordinate lies on the grid
    pub fn contains_pixel(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.width as u64 && (y as u64) < self.height as u64
    }

    /// Whether the event lies on the grid and uses a valid polarity
    pub fn contains(&self, event: &Event) -> bool {
        self.contains_pixel(event.x, event.y)
            && event.p >= 0
            && (event.p as u64) < self.polarities as u64
    }

    /// Smallest sensor size that contains every event of the stream
    pub fn infer(events: &EventStream) -> Self {
        let mut size = Self::new(0, 0, 0);
        for event in events.iter() {
            size.width = size.width.max((event.x.max(0) + 1) as usize);
            size.height = size.height.max((event.y.max(0) + 1) as usize);
            size.polarities = size.polarities.max((event.p.max(0) + 1) as usize);
        }
        size
    }

    /// Reject degenerate sizes
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.polarities == 0 {
            return Err(Error::config(format!(
                "sensor size must be non-zero in every dimension, got {self:?}"
            )));
        }
        Ok(())
    }
}

impl From<(usize, usize, usize)> for SensorSize {
    fn from((width, height, polarities): (usize, usize, usize)) -> Self {
        Self::new(width, height, polarities)
    }
}

impl fmt::Display for SensorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.width, self.height, self.polarities)
    }
}

/// An ordered, variable-length sequence of events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStream {
    /// The events in arrival order
    events: Vec<Event>,
}

impl EventStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Create an empty stream with a pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Wrap an existing vector of events
    pub fn from_vec(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the stream holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Borrow the events as a slice
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over the events
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Append an event
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Consume the stream, returning the underlying vector
    pub fn into_vec(self) -> Vec<Event> {
        self.events
    }

    /// Timestamp of the first event
    pub fn first_t(&self) -> Option<i64> {
        self.events.first().map(|e| e.t)
    }

    /// Timestamp of the last event
    pub fn last_t(&self) -> Option<i64> {
        self.events.last().map(|e| e.t)
    }

    /// Smallest timestamp
    pub fn min_t(&self) -> Option<i64> {
        self.events.iter().map(|e| e.t).min()
    }

    /// Largest timestamp
    pub fn max_t(&self) -> Option<i64> {
        self.events.iter().map(|e| e.t).max()
    }

    /// Span between the smallest and largest timestamp (0 when empty)
    pub fn duration(&self) -> i64 {
        match (self.min_t(), self.max_t()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    /// Whether timestamps are non-decreasing
    pub fn is_time_sorted(&self) -> bool {
        self.events.windows(2).all(|w| w[0].t <= w[1].t)
    }

    /// Stable sort by timestamp
    pub fn sort_by_time(&mut self) {
        self.events.sort_by_key(|e| e.t);
    }

    /// Column values
    pub fn xs(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.x).collect()
    }

    /// Row values
    pub fn ys(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.y).collect()
    }

    /// Timestamps
    pub fn ts(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.t).collect()
    }

    /// Polarities
    pub fn ps(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.p).collect()
    }

    /// Approximate heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        self.events.capacity() * std::mem::size_of::<Event>()
    }
}

impl Index<usize> for EventStream {
    type Output = Event;

    fn index(&self, index: usize) -> &Event {
        &self.events[index]
    }
}

impl From<Vec<Event>> for EventStream {
    fn from(events: Vec<Event>) -> Self {
        Self::from_vec(events)
    }
}

impl FromIterator<Event> for EventStream {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EventStream {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
