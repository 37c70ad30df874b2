//! Observation source trait.
//!
//! This module defines [`ObservationSource`], the seam to the statistical-release
//! service. The core only requires the shape of what a source returns; transport,
//! credentials and retries belong to the implementation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{Observation, Ticker},
};

/// Source of raw released observations.
///
/// Implementations return whole observation sets per ticker; the aligner consumes
/// each set once.
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "alfred").
    fn name(&self) -> &str;

    /// Fetches every vintage of every observation of a ticker.
    async fn fetch_vintages(&self, ticker: &Ticker) -> Result<Vec<Observation>>;

    /// Fetches only the latest revision of each observation.
    ///
    /// Used for series without revision history at the source. The returned
    /// observations carry their subject date as release date.
    ///
    /// Default implementation collapses [`fetch_vintages`](Self::fetch_vintages) to the
    /// latest release per subject date.
    async fn fetch_latest(&self, ticker: &Ticker) -> Result<Vec<Observation>> {
        let mut latest: BTreeMap<_, Observation> = BTreeMap::new();
        for obs in self.fetch_vintages(ticker).await? {
            match latest.get(&obs.subject_date) {
                Some(existing) if existing.release_date > obs.release_date => {}
                _ => {
                    latest.insert(obs.subject_date, obs);
                }
            }
        }
        Ok(latest
            .into_values()
            .map(|obs| Observation::undated(obs.subject_date, obs.value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Debug)]
    struct Revised;

    #[async_trait]
    impl ObservationSource for Revised {
        fn name(&self) -> &str {
            "revised"
        }

        async fn fetch_vintages(&self, _ticker: &Ticker) -> Result<Vec<Observation>> {
            let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
            Ok(vec![
                Observation::new(d(3, 1), d(1, 1), Some(1.0)),
                Observation::new(d(4, 1), d(1, 1), Some(1.5)),
                Observation::new(d(4, 1), d(2, 1), Some(2.0)),
            ])
        }
    }

    #[tokio::test]
    async fn test_default_fetch_latest_keeps_last_revision() {
        let latest = Revised.fetch_latest(&Ticker::new("X")).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].value, Some(1.5));
        assert_eq!(latest[0].release_date, latest[0].subject_date);
        assert_eq!(latest[1].value, Some(2.0));
    }
}
