//! CSV file store.
//!
//! Each frequency is persisted as two files in one directory:
//! `<code>_Values.csv` and `<code>_Dates.csv`, where `<code>` is the single
//! letter of [`CanonicalFrequency::code`]. Both files start with a `Time` column
//! holding ISO periods and carry one column per ticker. Missing cells are empty.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use vintage_core::{
    CanonicalFrequency, Result, SeriesError, SeriesStore, SeriesTable, TableColumn, Ticker,
};

/// Name of the index column in both files.
const INDEX_COLUMN: &str = "Time";

/// Days between 0001-01-01 and the Unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store that keeps one pair of CSV files per frequency in a directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns [`SeriesError::Store`] if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| SeriesError::Store(e.to_string()))?;
        Ok(Self { dir })
    }

    /// Returns the directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the values file of `frequency`.
    #[must_use]
    pub fn values_path(&self, frequency: CanonicalFrequency) -> PathBuf {
        self.dir.join(format!("{}_Values.csv", frequency.code()))
    }

    /// Path of the release dates file of `frequency`.
    #[must_use]
    pub fn dates_path(&self, frequency: CanonicalFrequency) -> PathBuf {
        self.dir.join(format!("{}_Dates.csv", frequency.code()))
    }
}

fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn date_column(name: &str, dates: impl Iterator<Item = Option<NaiveDate>>) -> Result<Column> {
    let days: Vec<Option<i32>> = dates.map(|d| d.map(to_epoch_days)).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| SeriesError::Store(e.to_string()))
}

fn values_frame(table: &SeriesTable) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(date_column(INDEX_COLUMN, table.index().iter().copied().map(Some))?);
    for column in table.columns() {
        columns.push(Column::new(
            column.ticker().as_str().into(),
            column.values().to_vec(),
        ));
    }
    DataFrame::new(columns).map_err(|e| SeriesError::Store(e.to_string()))
}

fn dates_frame(table: &SeriesTable) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(date_column(INDEX_COLUMN, table.index().iter().copied().map(Some))?);
    for column in table.columns() {
        columns.push(date_column(
            column.ticker().as_str(),
            column.dates().iter().copied(),
        )?);
    }
    DataFrame::new(columns).map_err(|e| SeriesError::Store(e.to_string()))
}

/// Writes `df` next to `path` and renames it into place.
fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let mut file = File::create(&tmp).map_err(|e| SeriesError::Store(e.to_string()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| SeriesError::Store(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| SeriesError::Store(e.to_string()))
}

/// Reads a file with every column as text.
fn read_frame(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| SeriesError::Store(e.to_string()))?
        .finish()
        .map_err(|e| SeriesError::Store(e.to_string()))
}

/// Parses every cell of a text column with `parse`, keeping empty cells missing.
fn parse_column<T>(
    df: &DataFrame,
    name: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Vec<Option<T>>> {
    let text = df
        .column(name)
        .map_err(|e| SeriesError::Parse(e.to_string()))?
        .str()
        .map_err(|e| SeriesError::Parse(e.to_string()))?;
    text.into_iter()
        .map(|cell| match cell.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some),
        })
        .collect()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| SeriesError::Parse(format!("invalid date '{s}': {e}")))
}

fn parse_value(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|e| SeriesError::Parse(format!("invalid value '{s}': {e}")))
}

/// Splits a frame into its index and the names of its ticker columns.
fn index_and_tickers(df: &DataFrame, path: &Path) -> Result<(Vec<NaiveDate>, Vec<String>)> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let Some((index_name, tickers)) = names.split_first() else {
        return Err(SeriesError::Parse(format!("{} has no columns", path.display())));
    };
    let index = parse_column(df, index_name, parse_date)?
        .into_iter()
        .map(|d| {
            d.ok_or_else(|| SeriesError::Parse(format!("{} has an empty period", path.display())))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((index, tickers.to_vec()))
}

#[async_trait]
impl SeriesStore for CsvStore {
    #[instrument(skip(self), fields(frequency = %frequency, dir = %self.dir.display()))]
    async fn load(&self, frequency: CanonicalFrequency) -> Result<Option<SeriesTable>> {
        let values_path = self.values_path(frequency);
        let dates_path = self.dates_path(frequency);
        match (values_path.exists(), dates_path.exists()) {
            (false, false) => {
                debug!("No stored {} table", frequency);
                return Ok(None);
            }
            (true, true) => {}
            _ => {
                return Err(SeriesError::Store(format!(
                    "{} table is missing one of {} and {}",
                    frequency,
                    values_path.display(),
                    dates_path.display()
                )));
            }
        }

        let values_df = read_frame(&values_path)?;
        let dates_df = read_frame(&dates_path)?;
        let (index, tickers) = index_and_tickers(&values_df, &values_path)?;
        let (dates_index, dates_tickers) = index_and_tickers(&dates_df, &dates_path)?;
        if index != dates_index || tickers != dates_tickers {
            return Err(SeriesError::Store(format!(
                "{} values and dates files do not share index and columns",
                frequency
            )));
        }

        let mut columns = Vec::with_capacity(tickers.len());
        for name in &tickers {
            let values = parse_column(&values_df, name, parse_value)?;
            let dates = parse_column(&dates_df, name, parse_date)?;
            columns.push(TableColumn::new(Ticker::new(name.as_str()), values, dates)?);
        }

        let table = SeriesTable::from_columns(frequency, index, columns)?;
        debug!("Loaded {} rows x {} tickers", table.height(), table.width());
        Ok(Some(table))
    }

    #[instrument(skip(self, table), fields(frequency = %table.frequency(), tickers = table.width()))]
    async fn save(&self, table: &SeriesTable) -> Result<()> {
        let frequency = table.frequency();
        let mut values = values_frame(table)?;
        let mut dates = dates_frame(table)?;
        write_frame(&mut values, &self.values_path(frequency))?;
        write_frame(&mut dates, &self.dates_path(frequency))?;
        debug!("Saved {} rows", table.height());
        Ok(())
    }

    #[instrument(skip(self), fields(frequency = %frequency))]
    async fn remove(&self, frequency: CanonicalFrequency) -> Result<bool> {
        let mut removed = false;
        for path in [self.values_path(frequency), self.dates_path(frequency)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove file");
                    return Err(SeriesError::Store(e.to_string()));
                }
            }
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        for frequency in CanonicalFrequency::ALL {
            self.remove(frequency).await?;
        }
        Ok(())
    }
}
