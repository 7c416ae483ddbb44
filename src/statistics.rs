//! Request counting and process uptime tracking.
//!
//! The counter is a plain atomic and uptime is derived from a
//! [`std::time::Instant`] captured at construction, since there is exactly
//! one `Statistics` per process and it never needs to be reset mid-run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks the total number of requests served and how long the server has
/// been running.
#[derive(Debug)]
pub struct Statistics {
    traffic: AtomicU64,
    started_at: Instant,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    /// Start tracking statistics, beginning the uptime clock now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traffic: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record that a request was served.
    pub fn notify_request(&self) {
        self.traffic.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of requests served so far.
    #[must_use]
    pub fn page_traffic(&self) -> u64 {
        self.traffic.load(Ordering::Relaxed)
    }

    /// How long the server has been running.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Render the uptime the way a human reads it: the largest units first,
    /// dropping any unit that would read as zero.
    #[must_use]
    pub fn uptime_human(&self) -> String {
        let mut millis = self.uptime().as_millis();
        let mut parts = Vec::new();

        const UNITS: &[(u128, &str)] = &[
            (604_800_000, "week"),
            (86_400_000, "day"),
            (3_600_000, "hour"),
            (60_000, "minute"),
            (1_000, "second"),
        ];

        for &(unit_millis, name) in UNITS {
            if millis >= unit_millis {
                let amount = millis / unit_millis;
                millis -= amount * unit_millis;
                parts.push(format!("{amount} {name}{}", if amount == 1 { "" } else { "s" }));
            }
        }

        if millis > 0 || parts.is_empty() {
            parts.push(format!(
                "{millis} millisecond{}",
                if millis == 1 { "" } else { "s" }
            ));
        }

        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_request_increments_traffic() {
        let stats = Statistics::new();
        assert_eq!(stats.page_traffic(), 0);
        stats.notify_request();
        stats.notify_request();
        assert_eq!(stats.page_traffic(), 2);
    }

    #[test]
    fn uptime_human_is_never_empty() {
        let stats = Statistics::new();
        assert!(!stats.uptime_human().is_empty());
    }
}
