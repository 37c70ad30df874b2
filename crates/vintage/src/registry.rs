//! Series registry: fetch, align, store and query per frequency.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use vintage_core::{
    AlignedSeries, CanonicalFrequency, DeltaSpec, ObservationSource, Result, SeriesError,
    SeriesStore, SeriesTable, Ticker, TickerProfile,
};
use vintage_engine::{DerivedSeries, FreshnessPolicy, LagWindow, align, check_conversion};
use vintage_store::CsvStore;

use crate::config::DashboardConfig;

/// Default number of lags next to the present value.
pub const DEFAULT_LAG_DEPTH: usize = 4;

/// Largest lag depth a configuration may ask for.
pub const MAX_LAG_DEPTH: usize = 120;

/// A ticker left out of a refresh, with the reason.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedTicker {
    /// The ticker.
    pub ticker: Ticker,
    /// Why it was skipped.
    pub error: SeriesError,
}

/// Outcome of refreshing one frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshReport {
    /// Refreshed frequency.
    pub frequency: CanonicalFrequency,
    /// Tickers present in the rebuilt table, derived ones included.
    pub refreshed: Vec<Ticker>,
    /// Tickers whose fetch or derivation failed.
    pub skipped: Vec<SkippedTicker>,
    /// Number of periods in the rebuilt table.
    pub rows: usize,
}

impl RefreshReport {
    /// Returns true if no ticker was skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Registry of series tables, one per canonical frequency.
///
/// Each refresh fetches every configured ticker of a frequency from the
/// [`ObservationSource`], aligns it and replaces the frequency's table as a whole.
/// The replaced table is kept as a snapshot; freshness falls back to it for
/// tables that carry no release counts.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use vintage::{CanonicalFrequency, InMemoryStore, SeriesRegistry, TickerProfile};
///
/// let mut registry = SeriesRegistry::new(source)
///     .with_store(Arc::new(InMemoryStore::new()))
///     .with_profile(TickerProfile::new("UNRATE", CanonicalFrequency::Monthly));
///
/// registry.refresh_all().await?;
/// let window = registry.get_level("UNRATE", "M", 4)?;
/// ```
pub struct SeriesRegistry {
    source: Arc<dyn ObservationSource>,
    store: Option<Arc<dyn SeriesStore>>,
    profiles: Vec<TickerProfile>,
    derived: Vec<(CanonicalFrequency, DerivedSeries)>,
    lag_depth: usize,
    freshness: FreshnessPolicy,
    tables: HashMap<CanonicalFrequency, SeriesTable>,
    snapshots: HashMap<CanonicalFrequency, SeriesTable>,
}

impl std::fmt::Debug for SeriesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesRegistry")
            .field("source", &self.source.name())
            .field("store", &self.store.as_ref().map(|_| "configured"))
            .field(
                "profiles",
                &self
                    .profiles
                    .iter()
                    .map(|p| p.ticker.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("derived", &self.derived)
            .field("lag_depth", &self.lag_depth)
            .field("freshness", &self.freshness)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SeriesRegistry {
    /// Creates an empty registry reading from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ObservationSource>) -> Self {
        Self {
            source,
            store: None,
            profiles: Vec::new(),
            derived: Vec::new(),
            lag_depth: DEFAULT_LAG_DEPTH,
            freshness: FreshnessPolicy::default(),
            tables: HashMap::new(),
            snapshots: HashMap::new(),
        }
    }

    /// Creates a registry from a configuration.
    ///
    /// A configured data directory becomes a [`CsvStore`].
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn from_config(config: &DashboardConfig, source: Arc<dyn ObservationSource>) -> Result<Self> {
        let mut registry = Self::new(source)
            .with_profiles(config.tickers.iter().cloned())
            .with_lag_depth(config.lag_depth)
            .with_freshness(FreshnessPolicy::new(config.freshness_window_days));
        for derived in &config.derived {
            registry.register_derived(derived.frequency, derived.series.clone());
        }
        if let Some(dir) = &config.data_dir {
            registry.store = Some(Arc::new(CsvStore::new(dir)?));
        }
        Ok(registry)
    }

    /// Sets the store tables are persisted to.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SeriesStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Adds a ticker profile.
    #[must_use]
    pub fn with_profile(mut self, profile: TickerProfile) -> Self {
        self.register_profile(profile);
        self
    }

    /// Adds several ticker profiles.
    #[must_use]
    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = TickerProfile>) -> Self {
        for profile in profiles {
            self.register_profile(profile);
        }
        self
    }

    /// Adds a derived series computed on every refresh of `frequency`.
    #[must_use]
    pub fn with_derived(mut self, frequency: CanonicalFrequency, derived: DerivedSeries) -> Self {
        self.register_derived(frequency, derived);
        self
    }

    /// Sets the default lag depth.
    #[must_use]
    pub const fn with_lag_depth(mut self, lag_depth: usize) -> Self {
        self.lag_depth = lag_depth;
        self
    }

    /// Sets the freshness policy.
    #[must_use]
    pub const fn with_freshness(mut self, freshness: FreshnessPolicy) -> Self {
        self.freshness = freshness;
        self
    }

    /// Registers a ticker profile, replacing one with the same ticker and frequency.
    pub fn register_profile(&mut self, profile: TickerProfile) {
        debug!(ticker = %profile.ticker, frequency = %profile.frequency, "Registering ticker");
        match self
            .profiles
            .iter_mut()
            .find(|p| p.ticker == profile.ticker && p.frequency == profile.frequency)
        {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Registers a derived series for `frequency`.
    pub fn register_derived(&mut self, frequency: CanonicalFrequency, derived: DerivedSeries) {
        debug!(derived = %derived.name(), %frequency, "Registering derived series");
        self.derived.push((frequency, derived));
    }

    /// Returns the registered profiles.
    #[must_use]
    pub fn profiles(&self) -> &[TickerProfile] {
        &self.profiles
    }

    /// Returns the first profile of `ticker`.
    #[must_use]
    pub fn profile(&self, ticker: &Ticker) -> Option<&TickerProfile> {
        self.profiles.iter().find(|p| &p.ticker == ticker)
    }

    /// Returns whether deltas of `ticker` are meaningful. Unprofiled tickers allow them.
    #[must_use]
    pub fn supports_delta(&self, ticker: &Ticker) -> bool {
        self.profile(ticker).is_none_or(|p| p.supports_delta)
    }

    /// Returns the frequencies with at least one profile, coarsest first.
    #[must_use]
    pub fn frequencies(&self) -> Vec<CanonicalFrequency> {
        let mut frequencies: Vec<_> = self.profiles.iter().map(|p| p.frequency).collect();
        frequencies.sort_unstable();
        frequencies.dedup();
        frequencies
    }

    /// Returns the default lag depth.
    #[must_use]
    pub const fn lag_depth(&self) -> usize {
        self.lag_depth
    }

    /// Returns the current table of `frequency`.
    #[must_use]
    pub fn table(&self, frequency: CanonicalFrequency) -> Option<&SeriesTable> {
        self.tables.get(&frequency)
    }

    /// Returns the table replaced by the last refresh of `frequency`.
    #[must_use]
    pub fn snapshot(&self, frequency: CanonicalFrequency) -> Option<&SeriesTable> {
        self.snapshots.get(&frequency)
    }

    /// Installs a table without fetching, returning the one it replaces.
    ///
    /// Unlike a refresh, this leaves the freshness snapshot untouched.
    pub fn insert_table(&mut self, table: SeriesTable) -> Option<SeriesTable> {
        self.tables.insert(table.frequency(), table)
    }

    #[instrument(skip(self, profile), fields(ticker = %profile.ticker))]
    async fn fetch_aligned(&self, profile: &TickerProfile) -> Result<AlignedSeries> {
        let observations = if profile.supports_vintages {
            self.source.fetch_vintages(&profile.ticker).await?
        } else {
            self.source.fetch_latest(&profile.ticker).await?
        };
        let series = align(&observations, profile.frequency);
        debug!(
            observations = observations.len(),
            periods = series.len(),
            "Aligned series"
        );
        Ok(series)
    }

    /// Fetches, aligns and rebuilds the table of `frequency`.
    ///
    /// Tickers are fetched concurrently. A ticker whose fetch fails is logged and
    /// reported as skipped; the table is rebuilt from the rest. Derived series are
    /// recomputed on the new table.
    ///
    /// # Errors
    /// Returns an error only if the table itself cannot be assembled.
    #[instrument(skip(self), fields(frequency = %frequency, source = self.source.name()))]
    pub async fn refresh(&mut self, frequency: CanonicalFrequency) -> Result<RefreshReport> {
        let fetched: Vec<(Ticker, Result<AlignedSeries>)> = {
            let profiles: Vec<&TickerProfile> = self
                .profiles
                .iter()
                .filter(|p| p.frequency == frequency)
                .collect();
            let results = join_all(profiles.iter().map(|p| self.fetch_aligned(p))).await;
            profiles.iter().map(|p| p.ticker.clone()).zip(results).collect()
        };

        let mut series = Vec::with_capacity(fetched.len());
        let mut skipped = Vec::new();
        for (ticker, result) in fetched {
            match result {
                Ok(s) => series.push((ticker, s)),
                Err(error) => {
                    warn!(%ticker, error = %error, "Couldn't fetch ticker, skipping");
                    skipped.push(SkippedTicker { ticker, error });
                }
            }
        }

        let mut table = SeriesTable::from_series(frequency, series)?;
        for (_, derived) in self.derived.iter().filter(|(f, _)| *f == frequency) {
            if let Err(error) = derived.apply(&mut table) {
                warn!(derived = %derived.name(), error = %error, "Couldn't derive series");
                skipped.push(SkippedTicker {
                    ticker: derived.name().clone(),
                    error,
                });
            }
        }

        let report = RefreshReport {
            frequency,
            refreshed: table.tickers().cloned().collect(),
            skipped,
            rows: table.height(),
        };
        debug!(
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            rows = report.rows,
            "Rebuilt table"
        );

        let previous = match self.tables.remove(&frequency) {
            Some(previous) => Some(previous),
            None => self.load_persisted(frequency).await,
        };
        if let Some(previous) = previous {
            self.snapshots.insert(frequency, previous);
        }
        self.tables.insert(frequency, table);
        Ok(report)
    }

    /// Refreshes every configured frequency and saves each table to the store.
    ///
    /// # Errors
    /// Returns the first table assembly or persistence error.
    pub async fn refresh_all(&mut self) -> Result<Vec<RefreshReport>> {
        let mut reports = Vec::new();
        for frequency in self.frequencies() {
            let report = self.refresh(frequency).await?;
            if self.store.is_some() {
                self.save(frequency).await?;
            }
            reports.push(report);
        }
        Ok(reports)
    }

    async fn load_persisted(&self, frequency: CanonicalFrequency) -> Option<SeriesTable> {
        let store = self.store.as_ref()?;
        match store.load(frequency).await {
            Ok(table) => table,
            Err(e) => {
                warn!(%frequency, error = %e, "Couldn't load persisted table");
                None
            }
        }
    }

    /// Loads the persisted table of `frequency`, replacing the current one.
    ///
    /// Returns false if the store holds no table for the frequency.
    ///
    /// # Errors
    /// Returns [`SeriesError::Store`] if no store is configured or loading fails.
    #[instrument(skip(self), fields(frequency = %frequency))]
    pub async fn load(&mut self, frequency: CanonicalFrequency) -> Result<bool> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SeriesError::Store("no store configured".to_string()))?;
        match store.load(frequency).await? {
            Some(table) => {
                self.tables.insert(frequency, table);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Saves the current table of `frequency` to the store.
    ///
    /// # Errors
    /// Returns [`SeriesError::Store`] if no store is configured, there is no table
    /// for the frequency, or saving fails.
    #[instrument(skip(self), fields(frequency = %frequency))]
    pub async fn save(&self, frequency: CanonicalFrequency) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SeriesError::Store("no store configured".to_string()))?;
        let table = self
            .tables
            .get(&frequency)
            .ok_or_else(|| SeriesError::Store(format!("no {frequency} table to save")))?;
        store.save(table).await
    }

    fn table_for(&self, frequency: CanonicalFrequency, ticker: &Ticker) -> Result<&SeriesTable> {
        self.tables
            .get(&frequency)
            .ok_or_else(|| SeriesError::TickerNotFound(ticker.to_string()))
    }

    /// Returns the level window of `ticker` stored at `frequency`.
    ///
    /// # Errors
    /// Returns [`SeriesError::UnsupportedFrequency`] for an invalid token and
    /// [`SeriesError::TickerNotFound`] if the ticker is not stored at that frequency.
    pub fn get_level(&self, ticker: &str, frequency: &str, lag_depth: usize) -> Result<LagWindow> {
        let frequency = CanonicalFrequency::normalize(frequency)?;
        let ticker = Ticker::new(ticker);
        vintage_engine::get_level(self.table_for(frequency, &ticker)?, &ticker, lag_depth)
    }

    /// Returns the delta window of `ticker` between `native` and `aggregation`.
    ///
    /// # Errors
    /// Returns [`SeriesError::UnsupportedFrequency`] for an invalid token,
    /// [`SeriesError::UnsupportedConversion`] for a pair with no defined offset and
    /// [`SeriesError::TickerNotFound`] if the ticker is not stored at `native`.
    pub fn get_delta(
        &self,
        ticker: &str,
        native: &str,
        aggregation: &str,
        lag_depth: usize,
        is_percent: bool,
    ) -> Result<LagWindow> {
        let spec = DeltaSpec::from_tokens(native, aggregation, is_percent)?;
        check_conversion(&spec)?;
        let ticker = Ticker::new(ticker);
        vintage_engine::get_delta(self.table_for(spec.native, &ticker)?, &ticker, &spec, lag_depth)
    }

    /// Returns whether the latest value of `ticker` is a brand-new release as of `as_of`.
    ///
    /// # Errors
    /// Returns [`SeriesError::UnsupportedFrequency`] for an invalid token and
    /// [`SeriesError::TickerNotFound`] if the ticker is not stored at that frequency.
    pub fn is_new_release(&self, ticker: &str, frequency: &str, as_of: NaiveDate) -> Result<bool> {
        let frequency = CanonicalFrequency::normalize(frequency)?;
        let ticker = Ticker::new(ticker);
        let table = self.table_for(frequency, &ticker)?;
        self.freshness
            .is_new_release(table, self.snapshots.get(&frequency), &ticker, as_of)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use vintage_core::Observation;
    use vintage_store::InMemoryStore;

    /// Source serving canned observations.
    #[derive(Debug, Default)]
    pub(crate) struct FakeSource {
        vintages: HashMap<Ticker, Vec<Observation>>,
        latest: HashMap<Ticker, Vec<Observation>>,
        failing: HashSet<Ticker>,
    }

    impl FakeSource {
        pub(crate) fn with_vintages(mut self, ticker: &str, observations: Vec<Observation>) -> Self {
            self.vintages.insert(Ticker::new(ticker), observations);
            self
        }

        pub(crate) fn with_latest(mut self, ticker: &str, observations: Vec<Observation>) -> Self {
            self.latest.insert(Ticker::new(ticker), observations);
            self
        }

        pub(crate) fn failing(mut self, ticker: &str) -> Self {
            self.failing.insert(Ticker::new(ticker));
            self
        }
    }

    #[async_trait]
    impl ObservationSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_vintages(&self, ticker: &Ticker) -> Result<Vec<Observation>> {
            if self.failing.contains(ticker) {
                return Err(SeriesError::Source {
                    ticker: ticker.to_string(),
                    message: "service unavailable".to_string(),
                });
            }
            self.vintages
                .get(ticker)
                .cloned()
                .ok_or_else(|| SeriesError::Source {
                    ticker: ticker.to_string(),
                    message: "no vintage history".to_string(),
                })
        }

        async fn fetch_latest(&self, ticker: &Ticker) -> Result<Vec<Observation>> {
            self.latest
                .get(ticker)
                .cloned()
                .ok_or_else(|| SeriesError::Source {
                    ticker: ticker.to_string(),
                    message: "unknown series".to_string(),
                })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(release: NaiveDate, subject: NaiveDate, value: f64) -> Observation {
        Observation::new(release, subject, Some(value))
    }

    fn payems_vintages() -> Vec<Observation> {
        vec![
            obs(date(2024, 2, 2), date(2024, 1, 1), 157_000.0),
            obs(date(2024, 3, 8), date(2024, 1, 1), 157_100.0),
            obs(date(2024, 3, 8), date(2024, 2, 1), 157_300.0),
        ]
    }

    #[tokio::test]
    async fn test_refresh_isolates_failures() {
        let source = FakeSource::default()
            .with_vintages("PAYEMS", payems_vintages())
            .failing("UNRATE");
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly))
            .with_profile(TickerProfile::new("UNRATE", CanonicalFrequency::Monthly))
            .with_profile(TickerProfile::new("GDPC1", CanonicalFrequency::Quarterly));

        let report = registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert_eq!(report.refreshed, vec![Ticker::new("PAYEMS")]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].ticker, Ticker::new("UNRATE"));
        assert!(!report.is_complete());
        assert_eq!(report.rows, 2);

        // Revised January value and its release date
        let window = registry.get_level("PAYEMS", "monthly", 1).unwrap();
        assert_eq!(window.values, vec![Some(157_100.0), Some(157_300.0)]);
        assert_eq!(window.latest_release, Some(date(2024, 3, 8)));

        let err = registry.get_level("UNRATE", "M", 1).unwrap_err();
        assert_eq!(err, SeriesError::TickerNotFound("UNRATE".to_string()));
    }

    #[tokio::test]
    async fn test_non_vintage_path_uses_subject_dates() {
        let source = FakeSource::default().with_latest(
            "EXHOSLUSM495S",
            vec![
                Observation::undated(date(2024, 1, 1), Some(4.0e6)),
                Observation::undated(date(2024, 2, 1), Some(4.4e6)),
            ],
        );
        let mut registry = SeriesRegistry::new(Arc::new(source)).with_profile(
            TickerProfile::new("EXHOSLUSM495S", CanonicalFrequency::Monthly).without_vintages(),
        );
        let report = registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert!(report.is_complete());

        let window = registry.get_level("EXHOSLUSM495S", "M", 0).unwrap();
        assert_eq!(window.values, vec![Some(4.4e6)]);
        assert_eq!(window.latest_release, Some(date(2024, 2, 1)));
    }

    #[tokio::test]
    async fn test_refresh_applies_derived_series() {
        let source = FakeSource::default()
            .with_vintages(
                "CES0500000003",
                vec![obs(date(2024, 2, 2), date(2024, 1, 1), 34.55)],
            )
            .with_vintages("PCEPI", vec![obs(date(2024, 2, 29), date(2024, 1, 1), 122.0)]);
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_profile(TickerProfile::new("CES0500000003", CanonicalFrequency::Monthly))
            .with_profile(TickerProfile::new("PCEPI", CanonicalFrequency::Monthly))
            .with_derived(
                CanonicalFrequency::Monthly,
                DerivedSeries::deflated("RCES0500000003*", "CES0500000003", "PCEPI"),
            )
            .with_derived(CanonicalFrequency::Monthly, DerivedSeries::deflated("R2", "N", "P"));

        let report = registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert_eq!(report.refreshed.len(), 3);
        assert_eq!(report.skipped[0].ticker, Ticker::new("R2"));

        let window = registry.get_level("rces0500000003*", "M", 0).unwrap();
        assert_eq!(window.present(), Some(34.55 / 1.22));
        assert_eq!(window.latest_release, Some(date(2024, 2, 2)));
    }

    #[tokio::test]
    async fn test_refresh_all_persists_and_keeps_snapshot() {
        let store = Arc::new(InMemoryStore::new());
        let source = FakeSource::default().with_vintages("PAYEMS", payems_vintages());
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_store(store.clone())
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly));

        let reports = registry.refresh_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(registry.snapshot(CanonicalFrequency::Monthly).is_none());
        let saved = store.load(CanonicalFrequency::Monthly).await.unwrap();
        assert_eq!(saved.as_ref(), registry.table(CanonicalFrequency::Monthly));

        // A fresh registry over the same store picks up the persisted snapshot
        let source = FakeSource::default().with_vintages("PAYEMS", payems_vintages());
        let mut next = SeriesRegistry::new(Arc::new(source))
            .with_store(store)
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly));
        next.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert_eq!(next.snapshot(CanonicalFrequency::Monthly), saved.as_ref());
        // February has a single release, so it stays a first print
        assert!(next.is_new_release("PAYEMS", "M", date(2024, 3, 9)).unwrap());
    }

    #[tokio::test]
    async fn test_first_print_survives_repeated_refresh() {
        let source = FakeSource::default().with_vintages("PAYEMS", payems_vintages());
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly));

        registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert!(registry.is_new_release("PAYEMS", "M", date(2024, 3, 9)).unwrap());
        registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert!(registry.snapshot(CanonicalFrequency::Monthly).is_some());
        assert!(registry.is_new_release("PAYEMS", "M", date(2024, 3, 9)).unwrap());
    }

    #[tokio::test]
    async fn test_revised_latest_period_is_not_fresh() {
        let mut vintages = payems_vintages();
        vintages.push(obs(date(2024, 4, 5), date(2024, 2, 1), 157_400.0));
        let source = FakeSource::default().with_vintages("PAYEMS", vintages);
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly));
        registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert!(!registry.is_new_release("PAYEMS", "M", date(2024, 4, 6)).unwrap());
    }

    #[tokio::test]
    async fn test_first_print_after_refresh_is_fresh() {
        let source = FakeSource::default().with_vintages("PAYEMS", payems_vintages());
        let mut registry = SeriesRegistry::new(Arc::new(source))
            .with_profile(TickerProfile::new("PAYEMS", CanonicalFrequency::Monthly));
        registry.refresh(CanonicalFrequency::Monthly).await.unwrap();
        assert!(registry.is_new_release("PAYEMS", "M", date(2024, 3, 9)).unwrap());
        assert!(!registry.is_new_release("PAYEMS", "M", date(2024, 4, 9)).unwrap());
    }

    #[tokio::test]
    async fn test_load_and_save_require_store() {
        let mut registry = SeriesRegistry::new(Arc::new(FakeSource::default()));
        assert!(matches!(
            registry.load(CanonicalFrequency::Monthly).await,
            Err(SeriesError::Store(_))
        ));
        assert!(matches!(
            registry.save(CanonicalFrequency::Monthly).await,
            Err(SeriesError::Store(_))
        ));

        let mut registry = registry.with_store(Arc::new(InMemoryStore::new()));
        assert!(!registry.load(CanonicalFrequency::Monthly).await.unwrap());
    }

    #[test]
    fn test_delta_queries() {
        let mut registry = SeriesRegistry::new(Arc::new(FakeSource::default()));
        let entries = (0..13)
            .map(|m| {
                let period = date(2023, 1, 1).checked_add_months(chrono::Months::new(m)).unwrap();
                vintage_core::AlignedEntry::new(period, Some(100.0 + f64::from(m)), Some(period))
            })
            .collect();
        let mut table = SeriesTable::new(CanonicalFrequency::Monthly);
        table
            .put(
                "INDPRO",
                &AlignedSeries::from_entries(CanonicalFrequency::Monthly, entries),
            )
            .unwrap();
        registry.insert_table(table);

        let yoy = registry.get_delta("INDPRO", "M", "Y", 0, false).unwrap();
        assert_eq!(yoy.values, vec![Some(12.0)]);

        let err = registry.get_delta("INDPRO", "Q", "M", 0, false).unwrap_err();
        assert!(matches!(err, SeriesError::UnsupportedConversion { .. }));
        let err = registry.get_delta("INDPRO", "M", "biweekly", 0, false).unwrap_err();
        assert_eq!(err, SeriesError::UnsupportedFrequency("biweekly".to_string()));
    }

    #[test]
    fn test_register_profile_replaces_same_ticker() {
        let registry = SeriesRegistry::new(Arc::new(FakeSource::default()))
            .with_profile(TickerProfile::new("GDPNOW", CanonicalFrequency::Quarterly))
            .with_profile(TickerProfile::new("GDPNOW", CanonicalFrequency::Quarterly).without_delta())
            .with_profile(TickerProfile::new("ICSA", CanonicalFrequency::Weekly));
        assert_eq!(registry.profiles().len(), 2);
        assert!(!registry.supports_delta(&Ticker::new("GDPNOW")));
        assert!(registry.supports_delta(&Ticker::new("UNKNOWN")));
        assert_eq!(
            registry.frequencies(),
            vec![CanonicalFrequency::Quarterly, CanonicalFrequency::Weekly]
        );
    }
}
