//! Connection counters and the combined statistics view.

use std::sync::Arc;

use fogrelay_room::{Gauge, Registry};
use serde::Serialize;

/// Counters maintained by the connection handlers.
#[derive(Debug)]
pub struct ServerStats {
    /// Game masters currently connected.
    pub connected_masters: Gauge,
    /// Players currently connected.
    pub connected_players: Gauge,
    /// Game master connections ever accepted.
    pub total_masters: Gauge,
    /// Player connections ever accepted.
    pub total_players: Gauge,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            connected_masters: Gauge::new("/api/connected_masters"),
            connected_players: Gauge::new("/api/connected_players"),
            total_masters: Gauge::new("/api/total_masters"),
            total_players: Gauge::new("/api/total_players"),
        }
    }

    pub fn gauges(&self) -> [&Gauge; 4] {
        [
            &self.connected_masters,
            &self.connected_players,
            &self.total_masters,
            &self.total_players,
        ]
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time usage numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub generated_ids: i64,
    pub stored_rooms: i64,
    pub connected_masters: i64,
    pub connected_players: i64,
    pub total_masters: i64,
    pub total_players: i64,
}

/// A cloneable view over the server and room counters, usable after the
/// server itself has been moved into its accept loop.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    registry: Registry,
    stats: Arc<ServerStats>,
}

impl StatsReporter {
    pub(crate) fn new(registry: Registry, stats: Arc<ServerStats>) -> Self {
        Self { registry, stats }
    }

    /// Every counter as a `name: value` line, sorted by name.
    pub fn summary(&self) -> Vec<String> {
        let metrics = self.registry.metrics();
        let mut gauges: Vec<&Gauge> = metrics
            .gauges()
            .into_iter()
            .chain(self.stats.gauges())
            .collect();
        gauges.sort_by_key(|g| g.name());
        gauges.iter().map(|g| g.to_string()).collect()
    }

    pub fn snapshot(&self) -> Statistics {
        let metrics = self.registry.metrics();
        Statistics {
            generated_ids: metrics.generated_room_ids.get(),
            stored_rooms: metrics.stored_rooms.get(),
            connected_masters: self.stats.connected_masters.get(),
            connected_players: self.stats.connected_players.get(),
            total_masters: self.stats.total_masters.get(),
            total_players: self.stats.total_players.get(),
        }
    }
}

/// Counts one connection for as long as it is alive.
///
/// Bumps the total and connected counters on creation and releases the
/// connected count on drop, so every exit path of a handler is covered.
pub(crate) struct ConnectionGuard<'a> {
    connected: &'a Gauge,
}

impl<'a> ConnectionGuard<'a> {
    pub(crate) fn master(stats: &'a ServerStats) -> Self {
        Self::enter(&stats.total_masters, &stats.connected_masters)
    }

    pub(crate) fn player(stats: &'a ServerStats) -> Self {
        Self::enter(&stats.total_players, &stats.connected_players)
    }

    fn enter(total: &Gauge, connected: &'a Gauge) -> Self {
        total.inc();
        connected.inc();
        Self { connected }
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.connected.dec();
    }
}
