//! Derived columns computed from stored series.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vintage_core::{Result, SeriesTable, TableColumn, Ticker};

/// A column computed from other columns of the same table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedSeries {
    /// `nominal / (deflator / base)`, stamped with the nominal series' release dates.
    ///
    /// Real average hourly earnings, for example, deflate nominal earnings by the
    /// PCE price index with base 100.
    Deflated {
        /// Ticker of the derived column.
        name: Ticker,
        /// Nominal series.
        nominal: Ticker,
        /// Price index used as deflator.
        deflator: Ticker,
        /// Index level that leaves the nominal value unchanged.
        #[serde(default = "default_base")]
        base: f64,
    },
}

const fn default_base() -> f64 {
    100.0
}

impl DerivedSeries {
    /// Creates a deflated series with base 100.
    #[must_use]
    pub fn deflated(
        name: impl Into<Ticker>,
        nominal: impl Into<Ticker>,
        deflator: impl Into<Ticker>,
    ) -> Self {
        Self::Deflated {
            name: name.into(),
            nominal: nominal.into(),
            deflator: deflator.into(),
            base: default_base(),
        }
    }

    /// Returns the ticker of the derived column.
    #[must_use]
    pub const fn name(&self) -> &Ticker {
        match self {
            Self::Deflated { name, .. } => name,
        }
    }

    /// Computes the derived column and stores it in `table`, replacing a previous one.
    ///
    /// Rows with a missing input or a zero deflator are missing.
    ///
    /// # Errors
    /// Returns [`vintage_core::SeriesError::TickerNotFound`] if an input column is absent.
    pub fn apply(&self, table: &mut SeriesTable) -> Result<()> {
        match self {
            Self::Deflated {
                name,
                nominal,
                deflator,
                base,
            } => {
                let nominal_col = table.get(nominal)?;
                let deflator_col = table.get(deflator)?;
                let values: Vec<Option<f64>> = nominal_col
                    .iter()
                    .zip(deflator_col.iter())
                    .map(|(n, d)| {
                        let (n, d) = (n.value?, d.value?);
                        let real = n / (d / base);
                        real.is_finite().then_some(real)
                    })
                    .collect();
                let dates = nominal_col.iter().map(|e| e.release_date).collect();
                let releases = nominal_col.iter().map(|e| e.releases).collect();
                let column = TableColumn::new(name.clone(), values, dates)?.with_releases(releases)?;
                table.set_column(column)?;
                debug!(derived = %name, %nominal, %deflator, "Derived deflated series");
                Ok(())
            }
        }
    }
}
