//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};
use vintage_core::{
    CanonicalFrequency, Result, SeriesError, SeriesStore, SeriesTable, TableColumn, Ticker,
};

fn store_err(e: impl std::fmt::Display) -> SeriesError {
    SeriesError::Store(e.to_string())
}

/// SQLite-based store for series tables.
///
/// Tables are kept in long format: one row per (frequency, period, ticker) in
/// `series_values` and `series_dates`. Column order and the period index live in
/// `series_columns` and `series_index`, so rows where every ticker is missing
/// survive a round trip. `series_tables` marks each saved frequency, empty tables
/// included.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store. Data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS series_tables (
                frequency TEXT PRIMARY KEY,
                saved_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS series_index (
                frequency TEXT NOT NULL,
                period TEXT NOT NULL,
                PRIMARY KEY (frequency, period)
            );
            CREATE TABLE IF NOT EXISTS series_columns (
                frequency TEXT NOT NULL,
                position INTEGER NOT NULL,
                ticker TEXT NOT NULL,
                PRIMARY KEY (frequency, ticker)
            );
            CREATE TABLE IF NOT EXISTS series_values (
                frequency TEXT NOT NULL,
                period TEXT NOT NULL,
                ticker TEXT NOT NULL,
                value REAL,
                PRIMARY KEY (frequency, period, ticker)
            );
            CREATE TABLE IF NOT EXISTS series_dates (
                frequency TEXT NOT NULL,
                period TEXT NOT NULL,
                ticker TEXT NOT NULL,
                release_date TEXT,
                PRIMARY KEY (frequency, period, ticker)
            );",
        )
        .map_err(store_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn delete_frequency(conn: &Connection, code: &str) -> Result<usize> {
        let mut deleted = 0;
        for table in [
            "series_tables",
            "series_index",
            "series_columns",
            "series_values",
            "series_dates",
        ] {
            deleted += conn
                .execute(&format!("DELETE FROM {table} WHERE frequency = ?1"), params![code])
                .map_err(store_err)?;
        }
        Ok(deleted)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SeriesError::Parse(format!("invalid date '{s}': {e}")))
}

#[async_trait]
impl SeriesStore for SqliteStore {
    #[instrument(skip(self), fields(frequency = %frequency))]
    async fn load(&self, frequency: CanonicalFrequency) -> Result<Option<SeriesTable>> {
        let code = frequency.code();
        let conn = self.conn.lock().map_err(store_err)?;

        let saved: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM series_tables WHERE frequency = ?1",
                params![code],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        if saved == 0 {
            debug!("No stored {} table", frequency);
            return Ok(None);
        }

        let mut stmt = conn
            .prepare("SELECT period FROM series_index WHERE frequency = ?1 ORDER BY period ASC")
            .map_err(store_err)?;
        let index = stmt
            .query_map(params![code], |row| row.get::<_, String>(0))
            .map_err(store_err)?
            .map(|r| r.map_err(store_err).and_then(|s| parse_date(&s)))
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn
            .prepare("SELECT ticker FROM series_columns WHERE frequency = ?1 ORDER BY position ASC")
            .map_err(store_err)?;
        let tickers = stmt
            .query_map(params![code], |row| row.get::<_, String>(0))
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        let rows: HashMap<NaiveDate, usize> =
            index.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        let mut values: HashMap<String, Vec<Option<f64>>> = tickers
            .iter()
            .map(|t| (t.clone(), vec![None; index.len()]))
            .collect();
        let mut dates: HashMap<String, Vec<Option<NaiveDate>>> = tickers
            .iter()
            .map(|t| (t.clone(), vec![None; index.len()]))
            .collect();

        let mut stmt = conn
            .prepare("SELECT period, ticker, value FROM series_values WHERE frequency = ?1")
            .map_err(store_err)?;
        let cells = stmt
            .query_map(params![code], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            })
            .map_err(store_err)?;
        for cell in cells {
            let (period, ticker, value) = cell.map_err(store_err)?;
            let row = rows.get(&parse_date(&period)?).copied();
            if let (Some(row), Some(column)) = (row, values.get_mut(&ticker)) {
                column[row] = value;
            }
        }

        let mut stmt = conn
            .prepare("SELECT period, ticker, release_date FROM series_dates WHERE frequency = ?1")
            .map_err(store_err)?;
        let cells = stmt
            .query_map(params![code], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(store_err)?;
        for cell in cells {
            let (period, ticker, release) = cell.map_err(store_err)?;
            let row = rows.get(&parse_date(&period)?).copied();
            if let (Some(row), Some(column)) = (row, dates.get_mut(&ticker)) {
                column[row] = release.as_deref().map(parse_date).transpose()?;
            }
        }

        let mut columns = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let column_values = values.remove(&ticker).unwrap_or_default();
            let column_dates = dates.remove(&ticker).unwrap_or_default();
            columns.push(TableColumn::new(Ticker::new(ticker), column_values, column_dates)?);
        }

        let table = SeriesTable::from_columns(frequency, index, columns)?;
        debug!("Loaded {} rows x {} tickers", table.height(), table.width());
        Ok(Some(table))
    }

    #[instrument(skip(self, table), fields(frequency = %table.frequency(), tickers = table.width()))]
    async fn save(&self, table: &SeriesTable) -> Result<()> {
        let code = table.frequency().code();
        let saved_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.unchecked_transaction().map_err(store_err)?;
        Self::delete_frequency(&tx, code)?;

        tx.execute(
            "INSERT INTO series_tables (frequency, saved_at) VALUES (?1, ?2)",
            params![code, saved_at],
        )
        .map_err(store_err)?;

        for period in table.index() {
            tx.execute(
                "INSERT INTO series_index (frequency, period) VALUES (?1, ?2)",
                params![code, period.to_string()],
            )
            .map_err(store_err)?;
        }

        for (position, column) in table.columns().iter().enumerate() {
            let ticker = column.ticker().as_str();
            tx.execute(
                "INSERT INTO series_columns (frequency, position, ticker) VALUES (?1, ?2, ?3)",
                params![code, position as i64, ticker],
            )
            .map_err(store_err)?;

            for (row, period) in table.index().iter().enumerate() {
                let period = period.to_string();
                if let Some(value) = column.values()[row] {
                    tx.execute(
                        "INSERT INTO series_values (frequency, period, ticker, value)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![code, period, ticker, value],
                    )
                    .map_err(store_err)?;
                }
                if let Some(release) = column.dates()[row] {
                    tx.execute(
                        "INSERT INTO series_dates (frequency, period, ticker, release_date)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![code, period, ticker, release.to_string()],
                    )
                    .map_err(store_err)?;
                }
            }
        }

        tx.commit().map_err(store_err)?;
        debug!("Saved {} rows", table.height());
        Ok(())
    }

    #[instrument(skip(self), fields(frequency = %frequency))]
    async fn remove(&self, frequency: CanonicalFrequency) -> Result<bool> {
        let conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.unchecked_transaction().map_err(store_err)?;
        let deleted = Self::delete_frequency(&tx, frequency.code())?;
        tx.commit().map_err(store_err)?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute_batch(
            "DELETE FROM series_tables;
             DELETE FROM series_index;
             DELETE FROM series_columns;
             DELETE FROM series_values;
             DELETE FROM series_dates;",
        )
        .map_err(store_err)?;
        debug!("Cleared all tables");
        Ok(())
    }
}
