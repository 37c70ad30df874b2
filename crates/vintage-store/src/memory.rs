//! In-memory store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use vintage_core::{CanonicalFrequency, Result, SeriesStore, SeriesTable};

/// Saved table with the time it was saved.
#[derive(Debug, Clone)]
struct StoredTable {
    table: SeriesTable,
    saved_at: DateTime<Utc>,
}

/// Simple in-memory store for testing and development.
///
/// Tables are kept in a `RwLock`-protected `HashMap` and are lost when the store
/// is dropped. Tables are cloned on load and save.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<CanonicalFrequency, StoredTable>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns when the table of `frequency` was last saved.
    pub async fn saved_at(&self, frequency: CanonicalFrequency) -> Option<DateTime<Utc>> {
        self.tables.read().await.get(&frequency).map(|t| t.saved_at)
    }
}

#[async_trait]
impl SeriesStore for InMemoryStore {
    #[instrument(skip(self), fields(frequency = %frequency))]
    async fn load(&self, frequency: CanonicalFrequency) -> Result<Option<SeriesTable>> {
        let tables = self.tables.read().await;
        match tables.get(&frequency) {
            Some(stored) => {
                debug!("Loaded {} table from memory", frequency);
                Ok(Some(stored.table.clone()))
            }
            None => {
                debug!("No {} table in memory", frequency);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, table), fields(frequency = %table.frequency(), tickers = table.width()))]
    async fn save(&self, table: &SeriesTable) -> Result<()> {
        let stored = StoredTable {
            table: table.clone(),
            saved_at: Utc::now(),
        };
        self.tables.write().await.insert(table.frequency(), stored);
        debug!("Saved {} rows", table.height());
        Ok(())
    }

    #[instrument(skip(self), fields(frequency = %frequency))]
    async fn remove(&self, frequency: CanonicalFrequency) -> Result<bool> {
        Ok(self.tables.write().await.remove(&frequency).is_some())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.tables.write().await.clear();
        debug!("Cleared all tables");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vintage_core::{AlignedEntry, AlignedSeries};

    fn monthly_table() -> SeriesTable {
        let period = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let release = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let mut table = SeriesTable::new(CanonicalFrequency::Monthly);
        table
            .put(
                "UNRATE",
                &AlignedSeries::from_entries(
                    CanonicalFrequency::Monthly,
                    vec![AlignedEntry::new(period, Some(3.7), Some(release))],
                ),
            )
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = InMemoryStore::new();
        assert!(store.load(CanonicalFrequency::Monthly).await.unwrap().is_none());
        assert!(store.saved_at(CanonicalFrequency::Monthly).await.is_none());

        let table = monthly_table();
        store.save(&table).await.unwrap();

        let loaded = store.load(CanonicalFrequency::Monthly).await.unwrap();
        assert_eq!(loaded, Some(table));
        assert!(store.saved_at(CanonicalFrequency::Monthly).await.is_some());
        assert!(store.load(CanonicalFrequency::Weekly).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_remove_and_clear() {
        let store = InMemoryStore::new();
        store.save(&monthly_table()).await.unwrap();
        assert!(store.remove(CanonicalFrequency::Monthly).await.unwrap());
        assert!(!store.remove(CanonicalFrequency::Monthly).await.unwrap());

        store.save(&monthly_table()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load(CanonicalFrequency::Monthly).await.unwrap().is_none());
    }
}
