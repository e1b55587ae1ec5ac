//! Relay counters.
//!
//! A [`RelayMetrics`] is created by whoever builds the
//! [`Registry`](crate::Registry) and passed in, so two registries (or two
//! tests) never share counters.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// A named signed counter. Used both for monotonic totals and for gauges
/// that go up and down.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    value: AtomicI64,
}

impl Gauge {
    /// Creates a gauge starting at zero.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicI64::new(0),
        }
    }

    /// Adds `n` (which may be negative).
    pub fn add(&self, n: i64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn dec(&self) {
        self.add(-1);
    }

    /// Returns the current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.get())
    }
}

/// Counters maintained by the room layer.
#[derive(Debug)]
pub struct RelayMetrics {
    /// Room ids produced by the generator.
    pub generated_room_ids: Gauge,
    /// Rooms currently held by the registry.
    pub stored_rooms: Gauge,
    /// Queues currently attached to a room.
    pub active_subscribers: Gauge,
    /// Queues closed because they could not keep up.
    pub evicted_subscribers: Gauge,
    /// Queue teardowns actually performed (double closes don't count).
    pub closed_queues: Gauge,
    /// Messages taken off a room's inbound channel.
    pub dispatched_messages: Gauge,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            generated_room_ids: Gauge::new("/room/generated_room_ids"),
            stored_rooms: Gauge::new("/room/stored_rooms"),
            active_subscribers: Gauge::new("/room/active_subscribers"),
            evicted_subscribers: Gauge::new("/room/evicted_subscribers"),
            closed_queues: Gauge::new("/room/closed_queues"),
            dispatched_messages: Gauge::new("/room/dispatched_messages"),
        }
    }

    /// All counters.
    pub fn gauges(&self) -> [&Gauge; 6] {
        [
            &self.generated_room_ids,
            &self.stored_rooms,
            &self.active_subscribers,
            &self.evicted_subscribers,
            &self.closed_queues,
            &self.dispatched_messages,
        ]
    }

    /// Returns one `name: value` line per counter, sorted by name.
    pub fn summary(&self) -> Vec<String> {
        let mut gauges = self.gauges();
        gauges.sort_by_key(|g| g.name());
        gauges.iter().map(|g| g.to_string()).collect()
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
