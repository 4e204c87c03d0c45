use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PeriodError;
use crate::models::{Issue, StatsBucket};

pub const MAX_PERIOD_HOURS: u32 = 12;
pub const MAX_PERIOD_DAYS: u32 = 7;

/// Histogram resolutions the issues endpoint can attach to each issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsPeriod {
    /// `24h`: hourly buckets.
    Day,
    /// `14d`: daily buckets.
    Fortnight,
}

impl StatsPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsPeriod::Day => "24h",
            StatsPeriod::Fortnight => "14d",
        }
    }

    /// Index right after the most recent bucket taken into account.
    pub fn latest_index(self) -> usize {
        match self {
            StatsPeriod::Day => 24,
            StatsPeriod::Fortnight => 12,
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub stats_period: StatsPeriod,
    pub days: u32,
    pub hours: u32,
}

impl Period {
    /// Number of buckets in one comparison window.
    pub fn length(&self) -> u32 {
        if self.days > 0 {
            self.days
        } else {
            self.hours
        }
    }
}

static PERIOD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<value>\d+)(?P<unit>[hd])$").expect("Invalid regex pattern for period")
});

/// Decodes `<n>h` (1 to 12 hours) or `<n>d` (1 to 7 days).
///
/// A zero-length window has nothing to compare, so `0h` and `0d` are refused.
pub fn decode_period(period: &str) -> Result<Period, PeriodError> {
    let format_error = || PeriodError::Format(period.to_string());
    let captures = PERIOD_REGEX.captures(period).ok_or_else(format_error)?;
    let value: u32 = captures["value"].parse().map_err(|_| format_error())?;

    match &captures["unit"] {
        "h" if (1..=MAX_PERIOD_HOURS).contains(&value) => Ok(Period {
            stats_period: StatsPeriod::Day,
            days: 0,
            hours: value,
        }),
        "h" => Err(PeriodError::Hours { value }),
        "d" if (1..=MAX_PERIOD_DAYS).contains(&value) => Ok(Period {
            stats_period: StatsPeriod::Fortnight,
            days: value,
            hours: 0,
        }),
        _ => Err(PeriodError::Days { value }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrendLevel {
    Ignore = 0,
    Warn = 1,
    Alert = 2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub level: TrendLevel,
    pub ratio: Option<f64>,
    pub current_count: u64,
}

/// Compares the last `period_length` buckets with the ones right before.
pub fn compute_trend(
    stats_period: StatsPeriod,
    period_length: u32,
    threshold: f64,
    issue: &Issue,
) -> Trend {
    trend_from_buckets(
        issue.stats(stats_period.as_str()),
        stats_period.latest_index(),
        period_length as usize,
        threshold,
    )
}

pub fn trend_from_buckets(
    buckets: &[StatsBucket],
    latest_index: usize,
    period_length: usize,
    threshold: f64,
) -> Trend {
    let current_start = latest_index.saturating_sub(period_length);
    let old_start = current_start.saturating_sub(period_length);

    let current_count = window_sum(buckets, current_start, latest_index);
    let old_count = window_sum(buckets, old_start, current_start);

    let ratio = if old_count != 0 {
        Some(current_count as f64 / old_count as f64)
    } else {
        None
    };

    let level = match ratio {
        None if current_count > 0 => TrendLevel::Alert,
        None => TrendLevel::Ignore,
        Some(r) if r >= 2.0 * threshold => TrendLevel::Alert,
        Some(r) if r >= threshold => TrendLevel::Warn,
        Some(_) => TrendLevel::Ignore,
    };

    Trend {
        level,
        ratio,
        current_count,
    }
}

// Buckets the server did not send count as zero.
fn window_sum(buckets: &[StatsBucket], start: usize, end: usize) -> u64 {
    let end = end.min(buckets.len());
    if start >= end {
        return 0;
    }
    buckets[start..end].iter().map(|(_, count)| count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use proptest::prelude::*;

    fn hourly(counts: &[u64]) -> Vec<StatsBucket> {
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| (1_700_000_000 + 3600 * i as i64, *c))
            .collect()
    }

    fn day_series(old: &[u64], current: &[u64]) -> Vec<StatsBucket> {
        let mut counts = vec![0; 24 - old.len() - current.len()];
        counts.extend_from_slice(old);
        counts.extend_from_slice(current);
        hourly(&counts)
    }

    // ==================== Period Decoding ====================

    #[test]
    fn test_decode_hours() {
        assert_eq!(
            decode_period("12h").unwrap(),
            Period {
                stats_period: StatsPeriod::Day,
                days: 0,
                hours: 12
            }
        );
    }

    #[test]
    fn test_decode_days() {
        assert_eq!(
            decode_period("7d").unwrap(),
            Period {
                stats_period: StatsPeriod::Fortnight,
                days: 7,
                hours: 0
            }
        );
    }

    #[test]
    fn test_decode_out_of_range() {
        assert_eq!(decode_period("13h"), Err(PeriodError::Hours { value: 13 }));
        assert_eq!(decode_period("8d"), Err(PeriodError::Days { value: 8 }));
        assert_eq!(decode_period("0h"), Err(PeriodError::Hours { value: 0 }));
        assert_eq!(decode_period("0d"), Err(PeriodError::Days { value: 0 }));
    }

    #[test]
    fn test_out_of_range_messages() {
        let zero = decode_period("0h").unwrap_err().to_string();
        assert_eq!(zero, "Cannot compare 0h windows, use a period from 1h to 12h");
        let long = decode_period("9d").unwrap_err().to_string();
        assert_eq!(long, "Cannot compare 9d windows, use a period from 1d to 7d");
    }

    #[test]
    fn test_decode_bad_format() {
        for bad in ["3x", "", "h", "12", "-1h", "1.5d", " 3h", "3hd", "99999999999h"] {
            assert_eq!(
                decode_period(bad),
                Err(PeriodError::Format(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_period_length() {
        assert_eq!(decode_period("5h").unwrap().length(), 5);
        assert_eq!(decode_period("3d").unwrap().length(), 3);
    }

    #[test]
    fn test_stats_period_names() {
        assert_eq!(StatsPeriod::Day.to_string(), "24h");
        assert_eq!(StatsPeriod::Fortnight.to_string(), "14d");
    }

    // ==================== Trend Computation ====================

    #[test]
    fn test_equal_windows_warn_at_threshold() {
        let buckets = day_series(&[2, 2, 2], &[1, 2, 3]);
        let trend = trend_from_buckets(&buckets, 24, 3, 1.0);
        assert_eq!(trend.ratio, Some(1.0));
        assert_eq!(trend.current_count, 6);
        assert_eq!(trend.level, TrendLevel::Warn);
    }

    #[test]
    fn test_new_occurrences_alert() {
        let buckets = day_series(&[0, 0, 0], &[5, 0, 0]);
        let trend = trend_from_buckets(&buckets, 24, 3, 1.0);
        assert_eq!(trend.ratio, None);
        assert_eq!(trend.current_count, 5);
        assert_eq!(trend.level, TrendLevel::Alert);
    }

    #[test]
    fn test_nothing_happened_ignored() {
        let buckets = day_series(&[0, 0], &[0, 0]);
        let trend = trend_from_buckets(&buckets, 24, 2, 1.0);
        assert_eq!(trend.ratio, None);
        assert_eq!(trend.level, TrendLevel::Ignore);
    }

    #[test]
    fn test_doubling_alerts() {
        let buckets = day_series(&[1, 1], &[2, 2]);
        let trend = trend_from_buckets(&buckets, 24, 2, 1.0);
        assert_eq!(trend.ratio, Some(2.0));
        assert_eq!(trend.level, TrendLevel::Alert);
    }

    #[test]
    fn test_decrease_ignored() {
        let buckets = day_series(&[4, 4], &[1, 1]);
        let trend = trend_from_buckets(&buckets, 24, 2, 1.0);
        assert_eq!(trend.ratio, Some(0.25));
        assert_eq!(trend.level, TrendLevel::Ignore);
    }

    #[test]
    fn test_threshold_scales_levels() {
        let buckets = day_series(&[2], &[3]);
        assert_eq!(trend_from_buckets(&buckets, 24, 1, 1.5).level, TrendLevel::Warn);
        assert_eq!(trend_from_buckets(&buckets, 24, 1, 0.75).level, TrendLevel::Alert);
        assert_eq!(trend_from_buckets(&buckets, 24, 1, 2.0).level, TrendLevel::Ignore);
    }

    #[test]
    fn test_buckets_after_latest_index_ignored() {
        // A 14d series has more buckets than the window anchor.
        let mut counts = vec![0; 14];
        counts[10] = 1;
        counts[11] = 3;
        counts[12] = 100;
        counts[13] = 100;
        let trend = trend_from_buckets(&hourly(&counts), 12, 1, 1.0);
        assert_eq!(trend.current_count, 3);
        assert_eq!(trend.ratio, Some(3.0));
    }

    #[test]
    fn test_window_wider_than_series() {
        // 7 days against a 12 bucket anchor leaves a 5 bucket old window.
        let counts: Vec<u64> = (1..=12).collect();
        let trend = trend_from_buckets(&hourly(&counts), 12, 7, 1.0);
        assert_eq!(trend.current_count, (6..=12).sum::<u64>());
        assert_eq!(trend.ratio, Some(63.0 / 15.0));
    }

    #[test]
    fn test_short_series_counts_missing_as_zero() {
        let trend = trend_from_buckets(&hourly(&[1, 1]), 24, 3, 1.0);
        assert_eq!(trend.current_count, 0);
        assert_eq!(trend.level, TrendLevel::Ignore);
    }

    #[test]
    fn test_compute_trend_reads_requested_period() {
        let issue = fixtures::issue_with("1", |r| {
            r.stats
                .insert("24h".to_string(), day_series(&[2, 2, 2], &[1, 2, 3]));
            r.stats.insert("14d".to_string(), hourly(&[0; 12]));
        });
        let trend = compute_trend(StatsPeriod::Day, 3, 1.0, &issue);
        assert_eq!(trend.level, TrendLevel::Warn);

        let trend = compute_trend(StatsPeriod::Fortnight, 3, 1.0, &issue);
        assert_eq!(trend.level, TrendLevel::Ignore);
    }

    #[test]
    fn test_compute_trend_without_stats() {
        let issue = fixtures::issue("1");
        let trend = compute_trend(StatsPeriod::Day, 3, 1.0, &issue);
        assert_eq!(trend.level, TrendLevel::Ignore);
        assert_eq!(trend.current_count, 0);
    }

    #[test]
    fn test_level_ordering() {
        assert!(TrendLevel::Alert > TrendLevel::Warn);
        assert!(TrendLevel::Warn > TrendLevel::Ignore);
        assert_eq!(TrendLevel::Alert as u8, 2);
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_decode_valid_hours(value in 1u32..=12) {
            let period = decode_period(&format!("{}h", value)).unwrap();
            prop_assert_eq!(period.stats_period, StatsPeriod::Day);
            prop_assert_eq!(period.hours, value);
            prop_assert_eq!(period.days, 0);
        }

        #[test]
        fn prop_decode_valid_days(value in 1u32..=7) {
            let period = decode_period(&format!("{}d", value)).unwrap();
            prop_assert_eq!(period.stats_period, StatsPeriod::Fortnight);
            prop_assert_eq!(period.days, value);
        }

        #[test]
        fn prop_decode_never_panics(input in ".{0,20}") {
            let _ = decode_period(&input);
        }

        #[test]
        fn prop_level_matches_ratio(
            counts in proptest::collection::vec(0u64..50, 24),
            length in 1usize..=12,
            threshold in 0.1f64..5.0,
        ) {
            let trend = trend_from_buckets(&hourly(&counts), 24, length, threshold);
            let current: u64 = counts[24 - length..].iter().sum();
            prop_assert_eq!(trend.current_count, current);
            match trend.ratio {
                None => prop_assert_eq!(trend.level == TrendLevel::Alert, current > 0),
                Some(r) => {
                    prop_assert_eq!(trend.level == TrendLevel::Alert, r >= 2.0 * threshold);
                    prop_assert_eq!(trend.level == TrendLevel::Ignore, r < threshold);
                }
            }
        }
    }
}
