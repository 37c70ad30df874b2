//! Core data types for vintage-aware series.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Ticker`] - Series identifier at the statistical-release service
//! - [`Observation`] - One released value for one subject date
//! - [`AlignedEntry`] / [`AlignedSeries`] - One row per canonical period
//! - [`DeltaSpec`] - How a delta is taken between two frequencies
//! - [`TickerProfile`] - Per-ticker capability flags

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::frequency::CanonicalFrequency;

/// A series identifier.
///
/// Tickers are trimmed and uppercased on creation, including when deserialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A single released value.
///
/// `subject_date` is the date the value describes; `release_date` is when this
/// vintage was published. Several observations may share a subject period when
/// the value was revised.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Publication date of this vintage.
    pub release_date: NaiveDate,
    /// Date the value describes.
    pub subject_date: NaiveDate,
    /// Released value, `None` when the release carries no number.
    pub value: Option<f64>,
}

impl Observation {
    /// Creates a new observation.
    #[must_use]
    pub const fn new(release_date: NaiveDate, subject_date: NaiveDate, value: Option<f64>) -> Self {
        Self {
            release_date,
            subject_date,
            value,
        }
    }

    /// Creates an observation for a source without revision history.
    ///
    /// The release date is unknown, so the subject date stands in for it.
    #[must_use]
    pub const fn undated(subject_date: NaiveDate, value: Option<f64>) -> Self {
        Self::new(subject_date, subject_date, value)
    }
}

/// One aligned row: the last-known value of a period and the release that supplied it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignedEntry {
    /// Start of the covered calendar interval.
    pub period: NaiveDate,
    /// Authoritative value for the period.
    pub value: Option<f64>,
    /// Release that produced `value`.
    pub release_date: Option<NaiveDate>,
    /// Number of releases seen for the period, 0 when not recorded.
    ///
    /// A period with exactly one release has only ever been printed once.
    #[serde(default)]
    pub releases: u32,
}

impl AlignedEntry {
    /// Creates a new aligned entry with no recorded release count.
    #[must_use]
    pub const fn new(period: NaiveDate, value: Option<f64>, release_date: Option<NaiveDate>) -> Self {
        Self {
            period,
            value,
            release_date,
            releases: 0,
        }
    }

    /// Sets the number of releases seen for the period.
    #[must_use]
    pub const fn with_releases(mut self, releases: u32) -> Self {
        self.releases = releases;
        self
    }

    /// Creates an entry with neither value nor release.
    #[must_use]
    pub const fn missing(period: NaiveDate) -> Self {
        Self::new(period, None, None)
    }
}

/// A series with one entry per distinct period, ordered by period ascending.
///
/// Deserialization goes through [`AlignedSeries::from_entries`], so the ordering
/// holds for series read back from JSON as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSeries")]
pub struct AlignedSeries {
    frequency: CanonicalFrequency,
    entries: Vec<AlignedEntry>,
}

#[derive(Deserialize)]
struct RawSeries {
    frequency: CanonicalFrequency,
    entries: Vec<AlignedEntry>,
}

impl From<RawSeries> for AlignedSeries {
    fn from(raw: RawSeries) -> Self {
        Self::from_entries(raw.frequency, raw.entries)
    }
}

impl AlignedSeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new(frequency: CanonicalFrequency) -> Self {
        Self {
            frequency,
            entries: Vec::new(),
        }
    }

    /// Creates a series from entries.
    ///
    /// Entries are sorted by period; when a period repeats, the entry appearing
    /// last in the input wins.
    #[must_use]
    pub fn from_entries(frequency: CanonicalFrequency, mut entries: Vec<AlignedEntry>) -> Self {
        entries.reverse();
        // Stable sort keeps the later input first within equal periods.
        entries.sort_by_key(|e| e.period);
        entries.dedup_by_key(|e| e.period);
        Self { frequency, entries }
    }

    /// Returns the frequency of the series.
    #[must_use]
    pub const fn frequency(&self) -> CanonicalFrequency {
        self.frequency
    }

    /// Returns the entries, ordered by period.
    #[must_use]
    pub fn entries(&self) -> &[AlignedEntry] {
        &self.entries
    }

    /// Returns the number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the series has no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &AlignedEntry> {
        self.entries.iter()
    }

    /// Returns the values, ordered by period.
    #[must_use]
    pub fn values(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Returns the position of the last entry carrying a value.
    #[must_use]
    pub fn last_valid_position(&self) -> Option<usize> {
        self.entries.iter().rposition(|e| e.value.is_some())
    }

    /// Returns the entry at `period`, if present.
    #[must_use]
    pub fn get(&self, period: NaiveDate) -> Option<&AlignedEntry> {
        self.entries
            .binary_search_by_key(&period, |e| e.period)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Returns true if every period is a period start of the series' frequency.
    ///
    /// Only such an index can be shifted by calendar offsets without silently
    /// pairing the wrong rows.
    #[must_use]
    pub fn is_calendar_aligned(&self) -> bool {
        self.entries
            .iter()
            .all(|e| self.frequency.is_period_start(e.period))
    }
}

impl IntoIterator for AlignedSeries {
    type Item = AlignedEntry;
    type IntoIter = std::vec::IntoIter<AlignedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// How a delta is taken: native frequency, aggregation frequency and units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaSpec {
    /// Frequency the series is stored at.
    pub native: CanonicalFrequency,
    /// Frequency over which the change is measured.
    pub aggregation: CanonicalFrequency,
    /// Percent change when true, absolute difference otherwise.
    pub is_percent: bool,
}

impl DeltaSpec {
    /// Creates a new delta spec.
    #[must_use]
    pub const fn new(
        native: CanonicalFrequency,
        aggregation: CanonicalFrequency,
        is_percent: bool,
    ) -> Self {
        Self {
            native,
            aggregation,
            is_percent,
        }
    }

    /// Creates a delta spec from frequency tokens.
    ///
    /// # Errors
    /// Returns [`crate::SeriesError::UnsupportedFrequency`] if either token is invalid.
    pub fn from_tokens(native: &str, aggregation: &str, is_percent: bool) -> Result<Self> {
        Ok(Self::new(
            CanonicalFrequency::normalize(native)?,
            CanonicalFrequency::normalize(aggregation)?,
            is_percent,
        ))
    }

    /// Returns true when native and aggregation frequencies coincide.
    #[must_use]
    pub fn is_period_over_period(&self) -> bool {
        self.native == self.aggregation
    }
}

/// Per-ticker capabilities.
///
/// Replaces hard-coded ticker lists: a ticker without revision history is fetched
/// through the latest-only path, and a ticker whose values are already rates of
/// change is always reported as a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerProfile {
    /// The ticker.
    pub ticker: Ticker,
    /// Native frequency of the series.
    pub frequency: CanonicalFrequency,
    /// The source publishes every vintage of this series.
    #[serde(default = "default_true")]
    pub supports_vintages: bool,
    /// Deltas are meaningful for this series.
    #[serde(default = "default_true")]
    pub supports_delta: bool,
}

const fn default_true() -> bool {
    true
}

impl TickerProfile {
    /// Creates a profile with every capability enabled.
    #[must_use]
    pub fn new(ticker: impl Into<Ticker>, frequency: CanonicalFrequency) -> Self {
        Self {
            ticker: ticker.into(),
            frequency,
            supports_vintages: true,
            supports_delta: true,
        }
    }

    /// Marks the series as lacking revision history at the source.
    #[must_use]
    pub fn without_vintages(mut self) -> Self {
        self.supports_vintages = false;
        self
    }

    /// Marks the series as level-only.
    #[must_use]
    pub fn without_delta(mut self) -> Self {
        self.supports_delta = false;
        self
    }
}
