//! Least-loaded bridge selection over freshness-scored statistics.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Last known statistics of one bridge.
#[derive(Clone, Copy, Debug)]
pub struct BridgeStats {
    pub upload_bitrate: f64,
    pub download_bitrate: f64,
    pub cpu: f64,
    pub participant_count: u64,
    /// When these statistics were received.
    pub updated_at: Instant,
}

impl BridgeStats {
    fn load(&self) -> f64 {
        self.upload_bitrate + self.download_bitrate
    }
}

/// Statistics table picking the least-loaded live bridge for new rooms.
///
/// A bridge is live iff its statistics are younger than the liveness
/// window. Once a room has picked a bridge the choice is memoized on the
/// room itself; this table only answers first allocations.
#[derive(Debug, Default)]
pub struct BridgeSelector {
    stats: HashMap<String, BridgeStats>,
}

impl BridgeSelector {
    /// Creates an empty [`BridgeSelector`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the statistics of `bridge`.
    pub fn observe(&mut self, bridge: String, stats: BridgeStats) {
        self.stats.insert(bridge, stats);
    }

    /// Removes a bridge from consideration, e.g. after a failed
    /// allocation round-trip.
    pub fn evict(&mut self, bridge: &str) {
        self.stats.remove(bridge);
    }

    /// Picks the live bridge minimizing `upload + download` bitrate, with
    /// ties broken by participant count, then bridge id. Falls back to
    /// `default` when no bridge is live.
    pub fn select(&self, liveness: Duration, default: &str) -> String {
        let now = Instant::now();
        self.stats
            .iter()
            .filter(|(_, s)| now.duration_since(s.updated_at) < liveness)
            .min_by(|(id_a, a), (id_b, b)| {
                a.load()
                    .total_cmp(&b.load())
                    .then_with(|| {
                        a.participant_count.cmp(&b.participant_count)
                    })
                    .then_with(|| id_a.cmp(id_b))
            })
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| default.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(up: f64, down: f64, participants: u64, age: Duration) -> BridgeStats {
        BridgeStats {
            upload_bitrate: up,
            download_bitrate: down,
            cpu: 0.25,
            participant_count: participants,
            updated_at: Instant::now() - age,
        }
    }

    const LIVENESS: Duration = Duration::from_secs(60);

    #[test]
    fn empty_table_falls_back_to_default() {
        let selector = BridgeSelector::new();
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "fallback.example.com"
        );
    }

    #[test]
    fn picks_least_loaded_live_bridge() {
        let mut selector = BridgeSelector::new();
        selector.observe(
            "busy.example.com".to_owned(),
            stats(500.0, 500.0, 10, Duration::from_secs(1)),
        );
        selector.observe(
            "calm.example.com".to_owned(),
            stats(100.0, 50.0, 3, Duration::from_secs(1)),
        );
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "calm.example.com"
        );
    }

    #[test]
    fn stale_bridges_are_not_considered() {
        let mut selector = BridgeSelector::new();
        selector.observe(
            "stale.example.com".to_owned(),
            stats(0.0, 0.0, 0, Duration::from_secs(120)),
        );
        selector.observe(
            "live.example.com".to_owned(),
            stats(900.0, 900.0, 50, Duration::from_secs(5)),
        );
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "live.example.com"
        );
    }

    #[test]
    fn ties_break_by_participants_then_id() {
        let mut selector = BridgeSelector::new();
        selector.observe(
            "b.example.com".to_owned(),
            stats(100.0, 100.0, 5, Duration::from_secs(1)),
        );
        selector.observe(
            "a.example.com".to_owned(),
            stats(150.0, 50.0, 5, Duration::from_secs(1)),
        );
        selector.observe(
            "c.example.com".to_owned(),
            stats(100.0, 100.0, 2, Duration::from_secs(1)),
        );
        // equal load everywhere: c wins on participants, then a beats b.
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "c.example.com"
        );

        selector.evict("c.example.com");
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "a.example.com"
        );
    }

    #[test]
    fn eviction_restores_fallback() {
        let mut selector = BridgeSelector::new();
        selector.observe(
            "only.example.com".to_owned(),
            stats(1.0, 1.0, 1, Duration::from_secs(1)),
        );
        selector.evict("only.example.com");
        assert_eq!(
            selector.select(LIVENESS, "fallback.example.com"),
            "fallback.example.com"
        );
    }
}
