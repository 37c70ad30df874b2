//! Delta computation across native and aggregation frequencies.
//!
//! A delta compares each period's value with the value one aggregation period
//! earlier. When native and aggregation frequencies coincide that predecessor is
//! simply the previous row. Otherwise the series is shifted by a calendar offset
//! (12 months for monthly year-over-year, 52 weeks for weekly, ...) and values are
//! paired by date, so gaps in the index never pair the wrong periods. Indexes whose
//! periods are not calendar period starts fall back to a fixed row offset for the
//! few pairs where one is well defined.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::trace;
use vintage_core::{
    AlignedSeries, CanonicalFrequency, DeltaSpec, Result, SeriesError, SeriesTable, Ticker,
};

use crate::level::{LagWindow, pad_left};

/// Calendar distance of one aggregation period, in native terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarOffset {
    /// Whole calendar months.
    Months(u32),
    /// Whole weeks.
    Weeks(u32),
    /// Whole calendar years.
    Years(u32),
}

impl CalendarOffset {
    /// Returns the calendar offset for a native/aggregation pair, if defined.
    #[must_use]
    pub const fn between(native: CanonicalFrequency, aggregation: CanonicalFrequency) -> Option<Self> {
        use vintage_core::CanonicalFrequency::{Annual, Daily, Monthly, Quarterly, Weekly};
        match (native, aggregation) {
            (Monthly, Annual) => Some(Self::Months(12)),
            (Monthly, Quarterly) => Some(Self::Months(3)),
            (Quarterly, Annual) => Some(Self::Months(12)),
            (Weekly, Annual) => Some(Self::Weeks(52)),
            (Daily, Annual) => Some(Self::Years(1)),
            _ => None,
        }
    }

    /// Returns `date` moved back by this offset.
    ///
    /// Month arithmetic clamps to the end of shorter months, so Feb 29 minus one
    /// year is Feb 28.
    #[must_use]
    pub fn back_from(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::Months(n) => date.checked_sub_months(Months::new(n)),
            Self::Weeks(n) => date.checked_sub_days(Days::new(7 * u64::from(n))),
            Self::Years(n) => date.checked_sub_months(Months::new(12 * n)),
        }
    }
}

/// Fixed row offset for a native/aggregation pair, used when the index carries no
/// usable calendar.
#[must_use]
pub const fn row_offset(native: CanonicalFrequency, aggregation: CanonicalFrequency) -> Option<usize> {
    use vintage_core::CanonicalFrequency::{Annual, Monthly, Quarterly};
    match (native, aggregation) {
        (Monthly, Annual) => Some(12),
        (Monthly, Quarterly) => Some(3),
        (Quarterly, Annual) => Some(4),
        _ => None,
    }
}

/// How predecessors are located for a delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    /// Pair each period with the period a calendar offset earlier.
    Calendar(CalendarOffset),
    /// Pair each row with the row this many positions earlier.
    Rows(usize),
}

impl Shift {
    /// Chooses the shift for `spec` on an index that is (or is not) calendar aligned.
    ///
    /// # Errors
    /// Returns [`SeriesError::UnsupportedConversion`] when neither a calendar nor a
    /// row offset relates the two frequencies.
    pub fn resolve(spec: &DeltaSpec, calendar_aligned: bool) -> Result<Self> {
        if spec.is_period_over_period() {
            return Ok(Self::Rows(1));
        }
        let calendar = CalendarOffset::between(spec.native, spec.aggregation)
            .filter(|_| calendar_aligned)
            .map(Self::Calendar);
        calendar
            .or_else(|| row_offset(spec.native, spec.aggregation).map(Self::Rows))
            .ok_or_else(|| unsupported(spec))
    }
}

fn unsupported(spec: &DeltaSpec) -> SeriesError {
    SeriesError::UnsupportedConversion {
        native: spec.native,
        aggregation: spec.aggregation,
    }
}

/// Checks that some strategy can relate the two frequencies of `spec`.
///
/// Quarterly data can never be aggregated to months, nor can any coarser native
/// frequency be compared over a finer aggregation period.
///
/// # Errors
/// Returns [`SeriesError::UnsupportedConversion`] for pairs with no offset at all.
pub fn check_conversion(spec: &DeltaSpec) -> Result<()> {
    let defined = spec.is_period_over_period()
        || CalendarOffset::between(spec.native, spec.aggregation).is_some()
        || row_offset(spec.native, spec.aggregation).is_some();
    if defined { Ok(()) } else { Err(unsupported(spec)) }
}

/// Difference or percent change; missing whenever the result would not be a number.
fn change(current: Option<f64>, previous: Option<f64>, is_percent: bool) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    let delta = if is_percent {
        if previous == 0.0 {
            return None;
        }
        (current - previous) / previous
    } else {
        current - previous
    };
    delta.is_finite().then_some(delta)
}

/// Computes the delta of every period of `series`, aligned with its entries.
///
/// Periods without a predecessor are missing.
///
/// # Errors
/// Returns [`SeriesError::UnsupportedConversion`] if `spec` cannot be applied to
/// this series.
pub fn deltas(series: &AlignedSeries, spec: &DeltaSpec) -> Result<Vec<Option<f64>>> {
    check_conversion(spec)?;
    let shift = Shift::resolve(spec, series.is_calendar_aligned())?;
    trace!(?shift, native = %spec.native, aggregation = %spec.aggregation, "Computing deltas");

    let entries = series.entries();
    let result = match shift {
        Shift::Rows(n) => entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let previous = i.checked_sub(n).and_then(|j| entries[j].value);
                change(e.value, previous, spec.is_percent)
            })
            .collect(),
        Shift::Calendar(offset) => entries
            .iter()
            .map(|e| {
                let previous = offset
                    .back_from(e.period)
                    .and_then(|p| series.get(p))
                    .and_then(|prev| prev.value);
                change(e.value, previous, spec.is_percent)
            })
            .collect(),
    };
    Ok(result)
}

/// Returns the trailing delta window of a series.
///
/// The window ends at the last period carrying a value and holds exactly
/// `lag_depth + 1` deltas, oldest first.
///
/// # Errors
/// Returns [`SeriesError::UnsupportedConversion`] if `spec` cannot be applied.
pub fn delta_window(series: &AlignedSeries, spec: &DeltaSpec, lag_depth: usize) -> Result<LagWindow> {
    let all = deltas(series, spec)?;
    let Some(last) = series.last_valid_position() else {
        return Ok(LagWindow::empty(lag_depth));
    };
    let latest = series.entries()[last];
    Ok(LagWindow {
        latest_release: latest.release_date,
        latest_period: Some(latest.period),
        values: pad_left(&all[..=last], lag_depth.saturating_add(1)),
    })
}

/// Returns the trailing deltas of `ticker`.
///
/// The conversion is validated before the ticker is looked up, so an unsupported
/// pair fails the same way for every ticker.
///
/// # Errors
/// Returns [`SeriesError::UnsupportedConversion`] for unrelated frequencies, and
/// [`SeriesError::TickerNotFound`] if the table lacks the ticker.
pub fn get_delta(
    table: &SeriesTable,
    ticker: &Ticker,
    spec: &DeltaSpec,
    lag_depth: usize,
) -> Result<LagWindow> {
    check_conversion(spec)?;
    if table.frequency() != spec.native {
        return Err(SeriesError::InvalidParameter(format!(
            "{ticker} requested as {} from the {} table",
            spec.native,
            table.frequency()
        )));
    }
    let series = table.get(ticker)?;
    delta_window(&series, spec, lag_depth)
}
