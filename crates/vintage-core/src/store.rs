//! Store trait for persisted series tables.
//!
//! This module defines the [`SeriesStore`] trait that saves and reloads whole
//! [`SeriesTable`]s, one per canonical frequency.

use async_trait::async_trait;

use crate::{error::Result, frequency::CanonicalFrequency, table::SeriesTable};

/// Trait for persisting series tables.
///
/// Tables are replaced wholesale on save, never patched. Implementations must
/// preserve the two-table layout losslessly: reloading a saved table yields the
/// same index, column order, values and release dates.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Loads the table of a frequency.
    ///
    /// Returns `Ok(Some(table))` if one was saved, `Ok(None)` otherwise.
    async fn load(&self, frequency: CanonicalFrequency) -> Result<Option<SeriesTable>>;

    /// Saves a table, replacing any previously saved table of its frequency.
    async fn save(&self, table: &SeriesTable) -> Result<()>;

    /// Removes the table of a frequency.
    ///
    /// Returns true if a table was removed.
    async fn remove(&self, frequency: CanonicalFrequency) -> Result<bool>;

    /// Removes every saved table.
    async fn clear(&self) -> Result<()>;
}
