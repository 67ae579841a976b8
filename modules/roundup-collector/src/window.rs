use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Recency window `[cutoff, now)`, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub cutoff: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl TimeWindow {
    pub fn ending_at(now: DateTime<Utc>, length: Duration) -> Self {
        let cutoff = TimeDelta::from_std(length)
            .ok()
            .and_then(|delta| now.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { cutoff, now }
    }

    /// Posts older than the cutoff are out. Timestamps past `now` (clock skew)
    /// are kept.
    pub fn admits(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.cutoff
    }
}
