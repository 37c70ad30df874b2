//! Report rows assembled from levels and deltas.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vintage_core::{CanonicalFrequency, Ticker};
use vintage_engine::LagWindow;

use crate::registry::SeriesRegistry;

/// What a report row shows, parsed from its free-form units label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Units {
    /// The stored value itself.
    Level,
    /// The change over one aggregation period.
    Delta {
        /// Frequency over which the change is measured.
        aggregation: CanonicalFrequency,
        /// Percent change rather than absolute difference.
        is_percent: bool,
    },
}

impl Units {
    /// Parses a units label such as `"Y/Y % Delta"` or `"Trln $"`.
    ///
    /// A label is a delta when it mentions "delta" and names an aggregation after a
    /// slash (`M`, `Q`, `Y` or `A`; any other letter means monthly). A `%` makes it
    /// a percent change. Everything else is a level.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let lower = label.to_lowercase();
        if !lower.contains("delta") {
            return Self::Level;
        }
        let Some((_, after)) = lower.split_once('/') else {
            return Self::Level;
        };
        let aggregation = match after.trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('Q') => CanonicalFrequency::Quarterly,
            Some('Y' | 'A') => CanonicalFrequency::Annual,
            _ => CanonicalFrequency::Monthly,
        };
        Self::Delta {
            aggregation,
            is_percent: lower.contains('%'),
        }
    }
}

/// One indicator line of a report section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// Display name.
    pub name: String,
    /// Stored series.
    pub ticker: Ticker,
    /// Native frequency token of the series.
    pub frequency: String,
    /// Units label, parsed with [`Units::parse`].
    pub units: String,
}

impl IndicatorSpec {
    /// Creates an indicator line.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ticker: impl Into<Ticker>,
        frequency: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            frequency: frequency.into(),
            units: units.into(),
        }
    }
}

/// A titled group of indicators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section title.
    pub title: String,
    /// Indicators in display order.
    pub indicators: Vec<IndicatorSpec>,
}

/// Values of one indicator ready for rendering.
///
/// A row whose lookup failed carries the error message in `error` and no values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Display name.
    pub name: String,
    /// Units label.
    pub units: String,
    /// Period of the present value.
    pub period: Option<NaiveDate>,
    /// Release date of the present value.
    pub latest_release: Option<NaiveDate>,
    /// Present value.
    pub present: Option<f64>,
    /// Lags, nearest first.
    pub lags: Vec<Option<f64>>,
    /// The present value is a brand-new release.
    pub fresh: bool,
    /// Why the row could not be computed.
    pub error: Option<String>,
}

impl ReportRow {
    fn from_window(spec: &IndicatorSpec, window: &LagWindow, fresh: bool) -> Self {
        Self {
            name: spec.name.clone(),
            units: spec.units.clone(),
            period: window.latest_period,
            latest_release: window.latest_release,
            present: window.present(),
            lags: window.lags(),
            fresh,
            error: None,
        }
    }

    fn failed(spec: &IndicatorSpec, error: String, lag_depth: usize) -> Self {
        Self {
            name: spec.name.clone(),
            units: spec.units.clone(),
            period: None,
            latest_release: None,
            present: None,
            lags: vec![None; lag_depth],
            fresh: false,
            error: Some(error),
        }
    }

    /// Returns true if the row carries an error instead of values.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A section with its computed rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section title.
    pub title: String,
    /// One row per indicator, in input order.
    pub rows: Vec<ReportRow>,
}

/// Computes one row per indicator.
///
/// Errors stay local to their row. Freshness is judged against `as_of` and is
/// false whenever it cannot be determined.
#[must_use]
pub fn build_section(
    registry: &SeriesRegistry,
    indicators: &[IndicatorSpec],
    as_of: NaiveDate,
) -> Vec<ReportRow> {
    let lag_depth = registry.lag_depth();
    indicators
        .iter()
        .map(|spec| {
            let ticker = spec.ticker.as_str();
            let units = if registry.supports_delta(&spec.ticker) {
                Units::parse(&spec.units)
            } else {
                Units::Level
            };
            let window = match units {
                Units::Level => registry.get_level(ticker, &spec.frequency, lag_depth),
                Units::Delta {
                    aggregation,
                    is_percent,
                } => registry.get_delta(
                    ticker,
                    &spec.frequency,
                    aggregation.code(),
                    lag_depth,
                    is_percent,
                ),
            };
            match window {
                Ok(window) => {
                    let fresh = registry
                        .is_new_release(ticker, &spec.frequency, as_of)
                        .unwrap_or(false);
                    ReportRow::from_window(spec, &window, fresh)
                }
                Err(e) => {
                    if e.is_row_local() {
                        debug!(indicator = %spec.name, %ticker, error = %e, "Row failed");
                    } else {
                        warn!(indicator = %spec.name, %ticker, error = %e, "Row failed");
                    }
                    ReportRow::failed(spec, e.to_string(), lag_depth)
                }
            }
        })
        .collect()
}

/// Computes every section.
#[must_use]
pub fn build_report(
    registry: &SeriesRegistry,
    sections: &[ReportSection],
    as_of: NaiveDate,
) -> Vec<Section> {
    sections
        .iter()
        .map(|section| Section {
            title: section.title.clone(),
            rows: build_section(registry, &section.indicators, as_of),
        })
        .collect()
}
