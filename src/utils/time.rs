//! Time-window helpers for historical queries.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Unix timestamps for the standard comparison windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaTimestamps {
    pub one_day: i64,
    pub two_day: i64,
    pub week: i64,
}

/// Timestamps at -24h, -48h and -7d from `now`.
pub fn delta_timestamps(now: DateTime<Utc>) -> DeltaTimestamps {
    let now = now.timestamp();
    DeltaTimestamps {
        one_day: now - 86_400,
        two_day: now - 2 * 86_400,
        week: now - 7 * 86_400,
    }
}

/// Sampling timestamps for a price series: `start` rounded down to the hour,
/// stepped by `interval_secs` up to `now` (exclusive).
pub fn interval_timestamps(
    start: DateTime<Utc>,
    interval_secs: u64,
    now: DateTime<Utc>,
) -> Vec<i64> {
    let rounded = start
        .duration_trunc(TimeDelta::hours(1))
        .unwrap_or(start)
        .timestamp();
    let end = now.timestamp();
    let step = interval_secs.max(1) as i64;

    let mut timestamps = Vec::new();
    let mut ts = rounded;
    while ts < end {
        timestamps.push(ts);
        ts += step;
    }
    timestamps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn delta_timestamps_are_window_offsets() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let deltas = delta_timestamps(now);
        assert_eq!(deltas.one_day, 1_700_000_000 - 86_400);
        assert_eq!(deltas.two_day, 1_700_000_000 - 172_800);
        assert_eq!(deltas.week, 1_700_000_000 - 604_800);
    }

    #[test]
    fn interval_timestamps_step_from_hour_boundary() {
        let start = Utc.timestamp_opt(3_600 + 120, 0).unwrap();
        let now = Utc.timestamp_opt(3_600 * 4, 0).unwrap();
        let timestamps = interval_timestamps(start, 3_600, now);
        assert_eq!(timestamps, vec![3_600, 7_200, 10_800]);
    }
}
