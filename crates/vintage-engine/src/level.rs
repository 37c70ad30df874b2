//! Level and lag extraction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vintage_core::{AlignedSeries, CanonicalFrequency, Result, SeriesTable, Ticker};

/// A trailing window of values ending at the most recent known value.
///
/// `values` always holds exactly `lag_depth + 1` entries, oldest first, left-padded
/// with `None` when history is short.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LagWindow {
    /// Release date of the most recent value.
    pub latest_release: Option<NaiveDate>,
    /// Period of the most recent value.
    pub latest_period: Option<NaiveDate>,
    /// Present value last, lags before it.
    pub values: Vec<Option<f64>>,
}

impl LagWindow {
    /// Creates a window of `lag_depth + 1` missing values.
    #[must_use]
    pub fn empty(lag_depth: usize) -> Self {
        Self {
            latest_release: None,
            latest_period: None,
            values: vec![None; lag_depth.saturating_add(1)],
        }
    }

    /// Returns the most recent value.
    #[must_use]
    pub fn present(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Returns the value `n` periods before the present (`lag(0)` is the present).
    #[must_use]
    pub fn lag(&self, n: usize) -> Option<f64> {
        self.values
            .len()
            .checked_sub(n + 1)
            .and_then(|i| self.values[i])
    }

    /// Returns the lags, nearest first, excluding the present.
    #[must_use]
    pub fn lags(&self) -> Vec<Option<f64>> {
        self.values.iter().rev().skip(1).copied().collect()
    }
}

/// Left-pads `values` with `None` to exactly `len` entries, keeping the newest.
pub(crate) fn pad_left(values: &[Option<f64>], len: usize) -> Vec<Option<f64>> {
    let tail = &values[values.len().saturating_sub(len)..];
    let mut padded = vec![None; len - tail.len()];
    padded.extend_from_slice(tail);
    padded
}

/// Returns the level window of a series.
///
/// The window ends at the last period carrying a value. For Daily series, missing
/// entries are dropped before windowing so non-trading days do not eat into the
/// requested depth.
#[must_use]
pub fn level_window(series: &AlignedSeries, lag_depth: usize) -> LagWindow {
    let Some(last) = series.last_valid_position() else {
        return LagWindow::empty(lag_depth);
    };
    let entries = &series.entries()[..=last];
    let latest = entries[last];

    let values: Vec<Option<f64>> = if series.frequency() == CanonicalFrequency::Daily {
        entries
            .iter()
            .filter(|e| e.value.is_some())
            .map(|e| e.value)
            .collect()
    } else {
        entries.iter().map(|e| e.value).collect()
    };

    LagWindow {
        latest_release: latest.release_date,
        latest_period: Some(latest.period),
        values: pad_left(&values, lag_depth.saturating_add(1)),
    }
}

/// Returns the most recent value of `ticker` and its `lag_depth` predecessors.
///
/// Short history is padded, never an error.
///
/// # Errors
/// Returns [`vintage_core::SeriesError::TickerNotFound`] if the table lacks the ticker.
pub fn get_level(table: &SeriesTable, ticker: &Ticker, lag_depth: usize) -> Result<LagWindow> {
    let series = table.get(ticker)?;
    Ok(level_window(&series, lag_depth))
}
