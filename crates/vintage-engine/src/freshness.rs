//! Freshness of the latest value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vintage_core::{CanonicalFrequency, Result, SeriesTable, Ticker};

/// Decides whether a ticker's latest value is a brand-new release.
///
/// A value is fresh when its release date lies within `window_days` of the as-of
/// date and its period is a first print. A period is a first print when alignment
/// saw at most one release for it; revisions of an already-published period are
/// not fresh. Daily series are judged on recency alone.
///
/// Tables read back from a store carry no release counts. For those the previous
/// snapshot decides instead: the period is a first print if the snapshot had no
/// value for it, and without a snapshot every recent value counts as one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    /// Maximum age in days of a fresh release.
    pub window_days: u32,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self { window_days: 7 }
    }
}

impl FreshnessPolicy {
    /// Creates a policy with the given recency window.
    #[must_use]
    pub const fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// Returns true if the latest value of `ticker` in `current` is a new release.
    ///
    /// # Errors
    /// Returns [`vintage_core::SeriesError::TickerNotFound`] if `current` lacks the ticker.
    pub fn is_new_release(
        &self,
        current: &SeriesTable,
        previous: Option<&SeriesTable>,
        ticker: &Ticker,
        as_of: NaiveDate,
    ) -> Result<bool> {
        let series = current.get(ticker)?;
        let Some(last) = series.last_valid_position() else {
            return Ok(false);
        };
        let latest = series.entries()[last];
        let Some(release) = latest.release_date else {
            return Ok(false);
        };
        let age = as_of.signed_duration_since(release).num_days();
        if age > i64::from(self.window_days) {
            return Ok(false);
        }
        if current.frequency() == CanonicalFrequency::Daily {
            return Ok(true);
        }
        if latest.releases > 0 {
            return Ok(latest.releases <= 1);
        }

        let Some(previous) = previous else {
            return Ok(true);
        };
        let Ok(before) = previous.get(ticker) else {
            return Ok(true);
        };
        Ok(before
            .get(latest.period)
            .and_then(|e| e.value)
            .is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vintage_core::{AlignedEntry, AlignedSeries, SeriesError};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn table(frequency: CanonicalFrequency, entries: Vec<AlignedEntry>) -> SeriesTable {
        let mut table = SeriesTable::new(frequency);
        table
            .put("PAYEMS", &AlignedSeries::from_entries(frequency, entries))
            .unwrap();
        table
    }

    #[test]
    fn test_release_count_decides_first_print() {
        let current = table(
            CanonicalFrequency::Monthly,
            vec![
                AlignedEntry::new(date(1, 1), Some(1.1), Some(date(3, 8))).with_releases(2),
                AlignedEntry::new(date(2, 1), Some(2.0), Some(date(3, 8))).with_releases(1),
            ],
        );
        let policy = FreshnessPolicy::default();
        let ticker = Ticker::new("PAYEMS");
        // The snapshot is ignored once counts are known, however often it is replaced
        assert!(policy.is_new_release(&current, None, &ticker, date(3, 14)).unwrap());
        assert!(policy.is_new_release(&current, Some(&current), &ticker, date(3, 14)).unwrap());
        assert!(!policy.is_new_release(&current, Some(&current), &ticker, date(3, 16)).unwrap());

        let revised = table(
            CanonicalFrequency::Monthly,
            vec![AlignedEntry::new(date(2, 1), Some(2.1), Some(date(4, 5))).with_releases(2)],
        );
        assert!(!policy.is_new_release(&revised, None, &ticker, date(4, 6)).unwrap());
    }

    #[test]
    fn test_first_print_within_window_is_fresh() {
        let previous = table(
            CanonicalFrequency::Monthly,
            vec![AlignedEntry::new(date(7, 1), Some(1.0), Some(date(8, 2)))],
        );
        let current = table(
            CanonicalFrequency::Monthly,
            vec![
                AlignedEntry::new(date(7, 1), Some(1.1), Some(date(9, 6))),
                AlignedEntry::new(date(8, 1), Some(2.0), Some(date(9, 6))),
            ],
        );
        let policy = FreshnessPolicy::default();
        let ticker = Ticker::new("PAYEMS");
        assert!(policy.is_new_release(&current, Some(&previous), &ticker, date(9, 10)).unwrap());
        // Too old
        assert!(!policy.is_new_release(&current, Some(&previous), &ticker, date(9, 20)).unwrap());
    }

    #[test]
    fn test_revision_is_not_fresh() {
        let previous = table(
            CanonicalFrequency::Quarterly,
            vec![AlignedEntry::new(date(4, 1), Some(3.0), Some(date(7, 25)))],
        );
        let current = table(
            CanonicalFrequency::Quarterly,
            vec![AlignedEntry::new(date(4, 1), Some(3.1), Some(date(8, 29)))],
        );
        let policy = FreshnessPolicy::default();
        assert!(
            !policy
                .is_new_release(&current, Some(&previous), &Ticker::new("PAYEMS"), date(8, 30))
                .unwrap()
        );
    }

    #[test]
    fn test_daily_only_checks_recency() {
        let snapshot = table(
            CanonicalFrequency::Daily,
            vec![AlignedEntry::new(date(9, 5), Some(4.2), Some(date(9, 5)))],
        );
        let policy = FreshnessPolicy::new(3);
        let ticker = Ticker::new("PAYEMS");
        assert!(policy.is_new_release(&snapshot, Some(&snapshot), &ticker, date(9, 6)).unwrap());
        assert!(!policy.is_new_release(&snapshot, Some(&snapshot), &ticker, date(9, 9)).unwrap());
    }

    #[test]
    fn test_without_previous_snapshot_recent_is_fresh() {
        let current = table(
            CanonicalFrequency::Monthly,
            vec![AlignedEntry::new(date(8, 1), Some(2.0), Some(date(9, 6)))],
        );
        let policy = FreshnessPolicy::default();
        assert!(policy.is_new_release(&current, None, &Ticker::new("PAYEMS"), date(9, 6)).unwrap());
    }

    #[test]
    fn test_unknown_ticker() {
        let current = SeriesTable::new(CanonicalFrequency::Monthly);
        let err = FreshnessPolicy::default()
            .is_new_release(&current, None, &Ticker::new("X"), date(9, 6))
            .unwrap_err();
        assert!(matches!(err, SeriesError::TickerNotFound(_)));
    }
}
