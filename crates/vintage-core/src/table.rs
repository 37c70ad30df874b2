//! Two-table layout of aligned series.
//!
//! A [`SeriesTable`] holds every ticker of one canonical frequency as a pair of
//! parallel tables: values and release dates. Both share a single ascending period
//! index, which is the unit of persistence for every [`SeriesStore`](crate::SeriesStore).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, SeriesError};
use crate::frequency::CanonicalFrequency;
use crate::types::{AlignedEntry, AlignedSeries, Ticker};

/// One ticker's column in both the values and the dates table.
///
/// Release counts ride along with the dates. They are not part of the persisted
/// layout, so a column read back from a store has every count at 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawColumn")]
pub struct TableColumn {
    ticker: Ticker,
    values: Vec<Option<f64>>,
    dates: Vec<Option<NaiveDate>>,
    releases: Vec<u32>,
}

#[derive(Deserialize)]
struct RawColumn {
    ticker: Ticker,
    values: Vec<Option<f64>>,
    dates: Vec<Option<NaiveDate>>,
    #[serde(default)]
    releases: Option<Vec<u32>>,
}

impl TryFrom<RawColumn> for TableColumn {
    type Error = SeriesError;

    fn try_from(raw: RawColumn) -> Result<Self> {
        let column = Self::new(raw.ticker, raw.values, raw.dates)?;
        match raw.releases {
            Some(releases) => column.with_releases(releases),
            None => Ok(column),
        }
    }
}

impl TableColumn {
    /// Creates a column from parallel values and release dates.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the two vectors differ in length.
    pub fn new(
        ticker: impl Into<Ticker>,
        values: Vec<Option<f64>>,
        dates: Vec<Option<NaiveDate>>,
    ) -> Result<Self> {
        let ticker = ticker.into();
        if values.len() != dates.len() {
            return Err(SeriesError::InvalidParameter(format!(
                "column {ticker} has {} values but {} dates",
                values.len(),
                dates.len()
            )));
        }
        let releases = vec![0; values.len()];
        Ok(Self {
            ticker,
            values,
            dates,
            releases,
        })
    }

    /// Replaces the per-row release counts.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the counts differ in length from
    /// the values.
    pub fn with_releases(mut self, releases: Vec<u32>) -> Result<Self> {
        if releases.len() != self.values.len() {
            return Err(SeriesError::InvalidParameter(format!(
                "column {} has {} values but {} release counts",
                self.ticker,
                self.values.len(),
                releases.len()
            )));
        }
        self.releases = releases;
        Ok(self)
    }

    /// Returns the ticker of this column.
    #[must_use]
    pub const fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Returns the values, one per index row.
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Returns the release dates, one per index row.
    #[must_use]
    pub fn dates(&self) -> &[Option<NaiveDate>] {
        &self.dates
    }

    /// Returns the release counts, one per index row.
    #[must_use]
    pub fn releases(&self) -> &[u32] {
        &self.releases
    }

    fn reindex(&self, old_index: &[NaiveDate], new_index: &[NaiveDate]) -> Self {
        let mut values = vec![None; new_index.len()];
        let mut dates = vec![None; new_index.len()];
        let mut releases = vec![0; new_index.len()];
        for (row, period) in old_index.iter().enumerate() {
            if let Ok(pos) = new_index.binary_search(period) {
                values[pos] = self.values[row];
                dates[pos] = self.dates[row];
                releases[pos] = self.releases[row];
            }
        }
        Self {
            ticker: self.ticker.clone(),
            values,
            dates,
            releases,
        }
    }
}

/// Every ticker of one frequency, as values and dates sharing one period index.
///
/// Deserialization is checked like [`SeriesTable::from_columns`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct SeriesTable {
    frequency: CanonicalFrequency,
    index: Vec<NaiveDate>,
    columns: Vec<TableColumn>,
}

#[derive(Deserialize)]
struct RawTable {
    frequency: CanonicalFrequency,
    index: Vec<NaiveDate>,
    columns: Vec<TableColumn>,
}

impl TryFrom<RawTable> for SeriesTable {
    type Error = SeriesError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Self::from_columns(raw.frequency, raw.index, raw.columns)
    }
}

impl SeriesTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new(frequency: CanonicalFrequency) -> Self {
        Self {
            frequency,
            index: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Builds a table from aligned series in one pass.
    ///
    /// Column order follows the input order. The index is the union of every
    /// series' periods.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if a series has another frequency
    /// or a ticker appears twice.
    pub fn from_series<I>(frequency: CanonicalFrequency, series: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Ticker, AlignedSeries)>,
    {
        let series: Vec<(Ticker, AlignedSeries)> = series.into_iter().collect();
        let index: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, s)| s.iter().map(|e| e.period))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut table = Self {
            frequency,
            index,
            columns: Vec::with_capacity(series.len()),
        };
        for (ticker, s) in series {
            if table.contains(&ticker) {
                return Err(SeriesError::InvalidParameter(format!(
                    "duplicate ticker {ticker} in {frequency} table"
                )));
            }
            let column = table.column_for(&ticker, &s)?;
            table.columns.push(column);
        }
        Ok(table)
    }

    /// Assembles a table from an index and prebuilt columns, as read back from a store.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the index is not strictly
    /// ascending, a column length differs from the index, or a ticker repeats.
    pub fn from_columns(
        frequency: CanonicalFrequency,
        index: Vec<NaiveDate>,
        columns: Vec<TableColumn>,
    ) -> Result<Self> {
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SeriesError::InvalidParameter(format!(
                "{frequency} table index is not strictly ascending"
            )));
        }
        let mut table = Self {
            frequency,
            index,
            columns: Vec::with_capacity(columns.len()),
        };
        for column in columns {
            table.insert_column(column)?;
        }
        Ok(table)
    }

    /// Returns the frequency of the table.
    #[must_use]
    pub const fn frequency(&self) -> CanonicalFrequency {
        self.frequency
    }

    /// Returns the shared period index.
    #[must_use]
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Returns the columns in table order.
    #[must_use]
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Returns the tickers in table order.
    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.columns.iter().map(TableColumn::ticker)
    }

    /// Returns the number of index rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Returns the number of tickers.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no tickers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns true if the table holds `ticker`.
    #[must_use]
    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.column(ticker).is_some()
    }

    /// Returns the column of `ticker`, if present.
    #[must_use]
    pub fn column(&self, ticker: &Ticker) -> Option<&TableColumn> {
        self.columns.iter().find(|c| &c.ticker == ticker)
    }

    /// Returns the row of `period` in the index, if present.
    #[must_use]
    pub fn row_of(&self, period: NaiveDate) -> Option<usize> {
        self.index.binary_search(&period).ok()
    }

    /// Returns the series of `ticker` over the shared index.
    ///
    /// Periods where the ticker has no data appear as missing entries.
    ///
    /// # Errors
    /// Returns [`SeriesError::TickerNotFound`] if the ticker is absent.
    pub fn get(&self, ticker: &Ticker) -> Result<AlignedSeries> {
        let column = self
            .column(ticker)
            .ok_or_else(|| SeriesError::TickerNotFound(ticker.to_string()))?;
        let entries = self
            .index
            .iter()
            .zip(column.values.iter().zip(column.dates.iter()))
            .zip(column.releases.iter())
            .map(|((&period, (&value, &date)), &releases)| {
                AlignedEntry::new(period, value, date).with_releases(releases)
            })
            .collect();
        Ok(AlignedSeries::from_entries(self.frequency, entries))
    }

    /// Stores `series` under `ticker`, replacing any existing column.
    ///
    /// The index grows to the union of its periods and the series' periods, and
    /// every other column is reindexed so both tables keep sharing it.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the series has another frequency.
    pub fn put(&mut self, ticker: impl Into<Ticker>, series: &AlignedSeries) -> Result<()> {
        let ticker = ticker.into();
        if series.frequency() != self.frequency {
            return Err(SeriesError::InvalidParameter(format!(
                "{ticker} is {} but the table is {}",
                series.frequency(),
                self.frequency
            )));
        }
        let merged: Vec<NaiveDate> = self
            .index
            .iter()
            .copied()
            .chain(series.iter().map(|e| e.period))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if merged != self.index {
            self.columns = self
                .columns
                .iter()
                .map(|c| c.reindex(&self.index, &merged))
                .collect();
            self.index = merged;
        }

        let column = self.column_for(&ticker, series)?;
        match self.columns.iter_mut().find(|c| c.ticker == ticker) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Appends a column built against the current index.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the column length differs from
    /// the index or the ticker already exists.
    pub fn insert_column(&mut self, column: TableColumn) -> Result<()> {
        if column.values.len() != self.index.len() {
            return Err(SeriesError::InvalidParameter(format!(
                "column {} has {} rows but the {} index has {}",
                column.ticker,
                column.values.len(),
                self.frequency,
                self.index.len()
            )));
        }
        if self.contains(&column.ticker) {
            return Err(SeriesError::InvalidParameter(format!(
                "duplicate ticker {} in {} table",
                column.ticker, self.frequency
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Stores a column built against the current index, replacing a column of the
    /// same ticker in place.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] if the column length differs from
    /// the index.
    pub fn set_column(&mut self, column: TableColumn) -> Result<()> {
        match self.columns.iter().position(|c| c.ticker == column.ticker) {
            Some(pos) if column.values.len() == self.index.len() => {
                self.columns[pos] = column;
                Ok(())
            }
            _ => self.insert_column(column),
        }
    }

    fn column_for(&self, ticker: &Ticker, series: &AlignedSeries) -> Result<TableColumn> {
        if series.frequency() != self.frequency {
            return Err(SeriesError::InvalidParameter(format!(
                "{ticker} is {} but the table is {}",
                series.frequency(),
                self.frequency
            )));
        }
        let mut values = vec![None; self.index.len()];
        let mut dates = vec![None; self.index.len()];
        let mut releases = vec![0; self.index.len()];
        for entry in series.iter() {
            if let Some(row) = self.row_of(entry.period) {
                values[row] = entry.value;
                dates[row] = entry.release_date;
                releases[row] = entry.releases;
            }
        }
        Ok(TableColumn {
            ticker: ticker.clone(),
            values,
            dates,
            releases,
        })
    }
}
