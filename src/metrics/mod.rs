//! Pure derived-metric formulas.
//!
//! Every percentage and delta shown for a token, pool, or protocol aggregate
//! is computed here from plain numeric inputs, so the formulas can be tested
//! without any fetching machinery. Missing inputs always collapse to zero
//! change rather than an absent value.

/// Change over the most recent 24h window measured against the preceding one.
///
/// Given cumulative readings now, 24h ago and 48h ago, returns the absolute
/// 24h delta and the percent change of that delta relative to the prior
/// day's delta. Comparing window against window avoids double-counting that
/// a naive `(now - one_day) / one_day` percent would introduce on cumulative
/// counters.
pub fn two_window_change(now: f64, one_day: Option<f64>, two_day: Option<f64>) -> (f64, f64) {
    match (one_day, two_day) {
        (Some(one_day), Some(two_day)) => {
            let current_window = now - one_day;
            let previous_window = one_day - two_day;
            let pct = current_window / previous_window * 100.0;
            if pct.is_finite() {
                (current_window, pct)
            } else {
                (current_window, 0.0)
            }
        }
        _ => (now, 0.0),
    }
}

/// Plain percent change between two absolute readings. Non-finite results
/// (zero or missing previous value) collapse to 0.
pub fn percent_change(current: Option<f64>, previous: Option<f64>) -> f64 {
    match (current, previous) {
        (Some(current), Some(previous)) => {
            let pct = (current - previous) / previous * 100.0;
            if pct.is_finite() {
                pct
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Week-over window volume: cumulative now minus cumulative a week ago. Not
/// a percent. Falls back to the raw current value when the old reading is
/// missing.
pub fn week_delta(current: f64, week_old: Option<f64>) -> f64 {
    match week_old {
        Some(week_old) => current - week_old,
        None => current,
    }
}

/// 24h delta of a cumulative counter (tx count, cumulative fees). Falls back
/// to the raw current value when the old reading is missing.
pub fn window_delta(current: f64, one_day_old: Option<f64>) -> f64 {
    match one_day_old {
        Some(one_day_old) => current - one_day_old,
        None => current,
    }
}

/// Price in USD at a window: the protocol-native derived price multiplied by
/// the oracle price *at that same window*. The oracle itself moves between
/// windows, so a price percent change must recompute both sides with their
/// own oracle reading.
pub fn price_usd(derived_eth: f64, oracle_usd: f64) -> f64 {
    derived_eth * oracle_usd
}

/// Percent change between two USD prices, where a zero price on either side
/// means "unknown" and yields no change.
pub fn price_percent_change(current_usd: f64, previous_usd: f64) -> f64 {
    if current_usd != 0.0 && previous_usd != 0.0 {
        percent_change(Some(current_usd), Some(previous_usd))
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_window_change_compares_windows_not_totals() {
        // current=100, -24h=80, -48h=60: delta is 20 and the percent is
        // 20 / (80 - 60) = 100%, not the naive (100-80)/80 = 25%.
        let (delta, pct) = two_window_change(100.0, Some(80.0), Some(60.0));
        assert_eq!(delta, 20.0);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn two_window_change_with_only_current_reading() {
        let (delta, pct) = two_window_change(100.0, None, None);
        assert_eq!(delta, 100.0);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn two_window_change_flat_previous_window_is_zero_percent() {
        // previous window delta is 0, division is non-finite
        let (delta, pct) = two_window_change(100.0, Some(80.0), Some(80.0));
        assert_eq!(delta, 20.0);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn percent_change_handles_missing_and_zero_previous() {
        assert_eq!(percent_change(Some(110.0), Some(100.0)), 10.0);
        assert_eq!(percent_change(Some(110.0), Some(0.0)), 0.0);
        assert_eq!(percent_change(Some(110.0), None), 0.0);
        assert_eq!(percent_change(None, Some(100.0)), 0.0);
    }

    #[test]
    fn week_delta_is_plain_subtraction() {
        assert_eq!(week_delta(1000.0, Some(400.0)), 600.0);
        assert_eq!(week_delta(1000.0, None), 1000.0);
    }

    #[test]
    fn price_change_recomputes_each_window_with_its_oracle() {
        // derivedETH stays flat at 0.5 but the oracle moved 2000 -> 1000,
        // so the USD price still doubled.
        let now = price_usd(0.5, 2000.0);
        let one_day = price_usd(0.5, 1000.0);
        assert_eq!(price_percent_change(now, one_day), 100.0);
        assert_eq!(price_percent_change(0.0, one_day), 0.0);
        assert_eq!(price_percent_change(now, 0.0), 0.0);
    }
}
