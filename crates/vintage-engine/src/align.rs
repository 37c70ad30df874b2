//! Period alignment of vintage observations.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;
use vintage_core::{AlignedEntry, AlignedSeries, CanonicalFrequency, Observation};

/// Aligns raw observations into one entry per canonical period.
///
/// Each observation is assigned to the period of `frequency` containing its subject
/// date. Within a period the observation with the latest release date is
/// authoritative, so later vintages supersede earlier ones regardless of input
/// order. Releases carrying a value take precedence over releases without one;
/// a period whose releases are all empty keeps the latest empty release.
///
/// Every entry records how many observations fell into its period, so a period
/// printed exactly once can be told apart from a revised one.
///
/// Non-finite values are treated as missing. An empty input yields an empty series.
#[must_use]
pub fn align(observations: &[Observation], frequency: CanonicalFrequency) -> AlignedSeries {
    let mut groups: BTreeMap<NaiveDate, (Observation, u32)> = BTreeMap::new();

    for obs in observations {
        let obs = Observation {
            value: obs.value.filter(|v| v.is_finite()),
            ..*obs
        };
        let period = frequency.period_start(obs.subject_date);
        match groups.get_mut(&period) {
            Some((current, count)) => {
                *count = count.saturating_add(1);
                if supersedes(&obs, current) {
                    *current = obs;
                }
            }
            None => {
                groups.insert(period, (obs, 1));
            }
        }
    }

    trace!(
        %frequency,
        observations = observations.len(),
        periods = groups.len(),
        "Aligned observations"
    );

    let entries = groups
        .into_iter()
        .map(|(period, (obs, count))| {
            AlignedEntry::new(period, obs.value, Some(obs.release_date)).with_releases(count)
        })
        .collect();
    AlignedSeries::from_entries(frequency, entries)
}

/// Returns true if `candidate` replaces `current` as the authoritative observation.
///
/// Ties on both presence and release date go to the candidate, so equal releases
/// resolve to the last one seen.
fn supersedes(candidate: &Observation, current: &Observation) -> bool {
    match (candidate.value.is_some(), current.value.is_some()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.release_date >= current.release_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        let series = align(&[], CanonicalFrequency::Monthly);
        assert!(series.is_empty());
        assert_eq!(series.frequency(), CanonicalFrequency::Monthly);
    }

    #[test]
    fn test_single_vintage_maps_one_to_one() {
        let observations = vec![
            Observation::new(date(2024, 3, 12), date(2024, 2, 1), Some(2.0)),
            Observation::new(date(2024, 2, 13), date(2024, 1, 1), Some(1.0)),
            Observation::new(date(2024, 4, 10), date(2024, 3, 1), Some(3.0)),
        ];
        let series = align(&observations, CanonicalFrequency::Monthly);

        let periods: Vec<_> = series.iter().map(|e| e.period).collect();
        assert_eq!(periods, vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]);
        assert_eq!(series.values(), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(series.entries()[0].release_date, Some(date(2024, 2, 13)));
    }

    #[test]
    fn test_latest_vintage_wins_regardless_of_order() {
        let observations = vec![
            Observation::new(date(2024, 5, 30), date(2024, 1, 1), Some(1.6)),
            Observation::new(date(2024, 3, 28), date(2024, 1, 1), Some(1.4)),
            Observation::new(date(2024, 4, 25), date(2024, 1, 1), Some(1.3)),
        ];
        let series = align(&observations, CanonicalFrequency::Quarterly);

        assert_eq!(series.len(), 1);
        let entry = series.entries()[0];
        assert_eq!(entry.period, date(2024, 1, 1));
        assert_eq!(entry.value, Some(1.6));
        assert_eq!(entry.release_date, Some(date(2024, 5, 30)));
        assert_eq!(entry.releases, 3);
    }

    #[test]
    fn test_release_counts_per_period() {
        let observations = vec![
            Observation::new(date(2024, 2, 2), date(2024, 1, 1), Some(157_000.0)),
            Observation::new(date(2024, 3, 8), date(2024, 1, 1), Some(157_100.0)),
            Observation::new(date(2024, 3, 8), date(2024, 2, 1), Some(157_300.0)),
        ];
        let series = align(&observations, CanonicalFrequency::Monthly);
        let counts: Vec<_> = series.iter().map(|e| e.releases).collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn test_subject_dates_floor_to_period_start() {
        let observations = vec![
            Observation::new(date(2024, 2, 1), date(2024, 1, 15), Some(1.0)),
            Observation::new(date(2024, 3, 1), date(2024, 1, 31), Some(2.0)),
        ];
        let series = align(&observations, CanonicalFrequency::Monthly);
        assert_eq!(series.len(), 1);
        assert_eq!(series.entries()[0].period, date(2024, 1, 1));
        assert_eq!(series.entries()[0].value, Some(2.0));
    }

    #[test]
    fn test_weekly_and_daily_periods() {
        let observations = vec![
            Observation::undated(date(2024, 8, 15), Some(230.0)),
            Observation::undated(date(2024, 8, 22), Some(232.0)),
        ];
        let weekly = align(&observations, CanonicalFrequency::Weekly);
        let periods: Vec<_> = weekly.iter().map(|e| e.period).collect();
        assert_eq!(periods, vec![date(2024, 8, 12), date(2024, 8, 19)]);

        let daily = align(&observations, CanonicalFrequency::Daily);
        assert_eq!(daily.entries()[0].period, date(2024, 8, 15));
    }

    #[test]
    fn test_empty_release_does_not_erase_value() {
        let observations = vec![
            Observation::new(date(2024, 2, 1), date(2024, 1, 1), Some(5.0)),
            Observation::new(date(2024, 3, 1), date(2024, 1, 1), None),
        ];
        let series = align(&observations, CanonicalFrequency::Monthly);
        assert_eq!(series.entries()[0].value, Some(5.0));
        assert_eq!(series.entries()[0].release_date, Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_non_finite_values_become_missing() {
        let observations = vec![Observation::new(
            date(2024, 2, 1),
            date(2024, 1, 1),
            Some(f64::NAN),
        )];
        let series = align(&observations, CanonicalFrequency::Monthly);
        assert_eq!(series.entries()[0].value, None);
        assert_eq!(series.entries()[0].release_date, Some(date(2024, 2, 1)));
    }
}
