//! Per-identifier check history.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Timestamps of the checks one identifier made within the trailing window.
///
/// Timestamps are kept in ascending order, so eviction only ever pops from
/// the front.
#[derive(Debug, Default, Clone)]
pub struct CheckHistory {
    timestamps: VecDeque<Instant>,
}

impl CheckHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp more than `window` older than `now`.
    ///
    /// A timestamp exactly `window` old is kept. Returns the number evicted.
    pub fn evict(&mut self, now: Instant, window: Duration) -> usize {
        let mut evicted = 0;
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) <= window {
                break;
            }
            self.timestamps.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Append a check made at `now`.
    pub fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
    }

    /// Number of checks currently stored.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The most recent check, if any.
    pub fn newest(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }

    /// Whether no check has been recorded for more than `idle_after`.
    pub fn is_idle(&self, now: Instant, idle_after: Duration) -> bool {
        match self.newest() {
            Some(newest) => now.saturating_duration_since(newest) > idle_after,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_at(base: Instant, offsets_ms: &[u64]) -> CheckHistory {
        let mut history = CheckHistory::new();
        for offset in offsets_ms {
            history.record(base + Duration::from_millis(*offset));
        }
        history
    }

    #[test]
    fn test_evict_stops_at_first_fresh_entry() {
        let base = Instant::now();
        let mut history = history_at(base, &[0, 100, 200, 900]);

        let now = base + Duration::from_millis(1150);
        let evicted = history.evict(now, Duration::from_secs(1));

        assert_eq!(evicted, 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_evict_keeps_entry_exactly_window_old() {
        let base = Instant::now();
        let mut history = history_at(base, &[0]);

        assert_eq!(history.evict(base + Duration::from_secs(1), Duration::from_secs(1)), 0);
        assert_eq!(history.len(), 1);

        assert_eq!(
            history.evict(base + Duration::from_millis(1001), Duration::from_secs(1)),
            1
        );
        assert!(history.is_empty());
    }

    #[test]
    fn test_evict_empty_history() {
        let mut history = CheckHistory::new();
        assert_eq!(history.evict(Instant::now(), Duration::from_secs(1)), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_newest_and_idle() {
        let base = Instant::now();
        let history = history_at(base, &[0, 500]);

        assert_eq!(history.newest(), Some(base + Duration::from_millis(500)));
        assert!(!history.is_idle(base + Duration::from_millis(1500), Duration::from_secs(1)));
        assert!(history.is_idle(base + Duration::from_millis(1501), Duration::from_secs(1)));
        assert!(CheckHistory::new().is_idle(base, Duration::from_secs(1)));
    }
}
