//! Canonical frequency definitions.
//!
//! This module defines [`CanonicalFrequency`], the unit of periodization for every
//! aligned series, along with token normalization and calendar period flooring.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SeriesError};

/// Frequency at which a series is periodized.
///
/// Deserializes from any token [`CanonicalFrequency::normalize`] accepts, so
/// `"M"`, `"monthly"` and `"Monthly"` read the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum CanonicalFrequency {
    /// Calendar years, starting January 1.
    Annual,
    /// Calendar quarters, starting January, April, July and October 1.
    Quarterly,
    /// Calendar months, starting on the 1st.
    Monthly,
    /// Weeks, starting on Monday.
    Weekly,
    /// Calendar days.
    Daily,
}

impl CanonicalFrequency {
    /// Every canonical frequency, coarsest first.
    pub const ALL: [Self; 5] = [
        Self::Annual,
        Self::Quarterly,
        Self::Monthly,
        Self::Weekly,
        Self::Daily,
    ];

    /// Maps a user-supplied frequency token to its canonical frequency.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. Both the
    /// single-letter code and the usual full-word spellings are accepted.
    ///
    /// # Errors
    /// Returns [`SeriesError::UnsupportedFrequency`] naming the token when it matches
    /// no frequency.
    pub fn normalize(token: &str) -> Result<Self> {
        match token.trim().to_uppercase().as_str() {
            "A" | "Y" | "ANNUAL" | "ANNUALLY" | "YEAR" | "YEARLY" => Ok(Self::Annual),
            "Q" | "QUARTER" | "QUARTERLY" => Ok(Self::Quarterly),
            "M" | "MONTH" | "MONTHLY" => Ok(Self::Monthly),
            "W" | "WEEK" | "WEEKLY" => Ok(Self::Weekly),
            "D" | "DAY" | "DAILY" => Ok(Self::Daily),
            _ => Err(SeriesError::UnsupportedFrequency(token.to_string())),
        }
    }

    /// Single-letter code, used in persisted file and table names.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Annual => "A",
            Self::Quarterly => "Q",
            Self::Monthly => "M",
            Self::Weekly => "W",
            Self::Daily => "D",
        }
    }

    /// Returns the start of the calendar interval of this frequency containing `date`.
    #[must_use]
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        let floored = match self {
            Self::Annual => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            Self::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1)
            }
            Self::Monthly => date.with_day(1),
            Self::Weekly => date.checked_sub_days(Days::new(u64::from(
                date.weekday().num_days_from_monday(),
            ))),
            Self::Daily => Some(date),
        };
        // Flooring only fails at the very edge of chrono's supported range.
        floored.unwrap_or(date)
    }

    /// Returns true if `date` is already the start of one of this frequency's periods.
    #[must_use]
    pub fn is_period_start(&self, date: NaiveDate) -> bool {
        self.period_start(date) == date
    }
}

impl fmt::Display for CanonicalFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Annual => "Annual",
            Self::Quarterly => "Quarterly",
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Daily => "Daily",
        };
        f.write_str(name)
    }
}

impl FromStr for CanonicalFrequency {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for CanonicalFrequency {
    type Error = SeriesError;

    fn try_from(token: String) -> Result<Self> {
        Self::normalize(&token)
    }
}
