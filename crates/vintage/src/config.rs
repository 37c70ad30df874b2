//! Dashboard configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vintage_core::{CanonicalFrequency, Result, SeriesError, TickerProfile};
use vintage_engine::DerivedSeries;

use crate::registry::{DEFAULT_LAG_DEPTH, MAX_LAG_DEPTH};
use crate::report::ReportSection;

/// A derived series and the frequency whose table it is computed on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedConfig {
    /// Frequency of the inputs and the result.
    pub frequency: CanonicalFrequency,
    /// The derivation.
    #[serde(flatten)]
    pub series: DerivedSeries,
}

/// Everything needed to refresh the tables and build a report.
///
/// Loaded from JSON. Every field except `tickers` has a default.
///
/// ```json
/// {
///   "tickers": [
///     { "ticker": "PAYEMS", "frequency": "Monthly" },
///     { "ticker": "EXHOSLUSM495S", "frequency": "Monthly", "supports_vintages": false }
///   ],
///   "lag_depth": 4,
///   "data_dir": "Raw Data"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Series to fetch.
    pub tickers: Vec<TickerProfile>,
    /// Derived series, applied after each refresh.
    #[serde(default)]
    pub derived: Vec<DerivedConfig>,
    /// Lags shown next to the present value.
    #[serde(default = "default_lag_depth")]
    pub lag_depth: usize,
    /// Maximum age in days of a fresh release.
    #[serde(default = "default_freshness_window_days")]
    pub freshness_window_days: u32,
    /// Directory of the CSV store. Tables are kept in memory only when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Report sections.
    #[serde(default)]
    pub sections: Vec<ReportSection>,
}

const fn default_lag_depth() -> usize {
    DEFAULT_LAG_DEPTH
}

const fn default_freshness_window_days() -> u32 {
    7
}

impl DashboardConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    /// Returns [`SeriesError::Parse`] for malformed JSON and
    /// [`SeriesError::InvalidParameter`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SeriesError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    /// Returns [`SeriesError::Other`] if the file cannot be read, otherwise as
    /// [`DashboardConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SeriesError::Other(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Checks that the lag depth is at most [`MAX_LAG_DEPTH`], that no ticker is
    /// configured twice at one frequency and that derived series do not shadow a
    /// fetched ticker.
    ///
    /// # Errors
    /// Returns [`SeriesError::InvalidParameter`] naming the offending setting or ticker.
    pub fn validate(&self) -> Result<()> {
        if self.lag_depth > MAX_LAG_DEPTH {
            return Err(SeriesError::InvalidParameter(format!(
                "lag_depth {} exceeds the maximum of {MAX_LAG_DEPTH}",
                self.lag_depth
            )));
        }
        let mut seen = HashSet::new();
        for profile in &self.tickers {
            if !seen.insert((profile.frequency, profile.ticker.clone())) {
                return Err(SeriesError::InvalidParameter(format!(
                    "ticker {} configured twice at {} frequency",
                    profile.ticker, profile.frequency
                )));
            }
        }
        for derived in &self.derived {
            if seen.contains(&(derived.frequency, derived.series.name().clone())) {
                return Err(SeriesError::InvalidParameter(format!(
                    "derived series {} shadows a fetched ticker",
                    derived.series.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vintage_core::Ticker;

    const CONFIG: &str = r#"{
        "tickers": [
            { "ticker": "ces0500000003", "frequency": "Monthly" },
            { "ticker": "PCEPI", "frequency": "m" },
            { "ticker": "EXHOSLUSM495S", "frequency": "Monthly", "supports_vintages": false },
            { "ticker": "GDPNOW", "frequency": "Quarterly", "supports_delta": false }
        ],
        "derived": [
            {
                "frequency": "M",
                "kind": "deflated",
                "name": "RCES0500000003*",
                "nominal": "CES0500000003",
                "deflator": "PCEPI"
            }
        ],
        "sections": [
            {
                "title": "Prices",
                "indicators": [
                    { "name": "PCE Deflator", "ticker": "PCEPI", "frequency": "M", "units": "Y/Y % Delta" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_config_with_defaults() {
        let config = DashboardConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.tickers.len(), 4);
        assert_eq!(config.tickers[0].ticker, Ticker::new("CES0500000003"));
        assert_eq!(config.tickers[1].frequency, CanonicalFrequency::Monthly);
        assert_eq!(config.derived[0].frequency, CanonicalFrequency::Monthly);
        assert!(config.tickers[0].supports_vintages);
        assert!(!config.tickers[2].supports_vintages);
        assert!(!config.tickers[3].supports_delta);
        assert_eq!(config.lag_depth, 4);
        assert_eq!(config.freshness_window_days, 7);
        assert_eq!(config.data_dir, None);
        assert_eq!(
            config.derived[0].series,
            DerivedSeries::deflated("RCES0500000003*", "CES0500000003", "PCEPI")
        );
        assert_eq!(config.sections[0].indicators[0].ticker, Ticker::new("PCEPI"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let json = r#"{
            "tickers": [
                { "ticker": "ICSA", "frequency": "Weekly" },
                { "ticker": "icsa", "frequency": "Weekly" }
            ]
        }"#;
        let err = DashboardConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, SeriesError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_duplicates_across_spellings() {
        let json = r#"{
            "tickers": [
                { "ticker": "ICSA", "frequency": "Weekly" },
                { "ticker": "ICSA", "frequency": "W" }
            ]
        }"#;
        let err = DashboardConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, SeriesError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_excessive_lag_depth() {
        let json = format!(r#"{{ "tickers": [], "lag_depth": {} }}"#, usize::MAX);
        let err = DashboardConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, SeriesError::InvalidParameter(ref m) if m.contains("lag_depth")));

        let json = format!(r#"{{ "tickers": [], "lag_depth": {MAX_LAG_DEPTH} }}"#);
        assert_eq!(DashboardConfig::from_json_str(&json).unwrap().lag_depth, MAX_LAG_DEPTH);
    }

    #[test]
    fn test_rejects_unknown_frequency() {
        let json = r#"{ "tickers": [{ "ticker": "ICSA", "frequency": "fortnightly" }] }"#;
        let err = DashboardConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, SeriesError::Parse(ref m) if m.contains("fortnightly")));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = DashboardConfig::from_json_str("{ tickers: ").unwrap_err();
        assert!(matches!(err, SeriesError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, CONFIG).unwrap();
        assert_eq!(DashboardConfig::from_path(&path).unwrap().tickers.len(), 4);

        let err = DashboardConfig::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SeriesError::Other(_)));
    }
}
