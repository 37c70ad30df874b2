//! Error types for series operations.
//!
//! This module defines [`SeriesError`] which covers every failure that can occur
//! while normalizing frequencies, aligning vintages, computing levels and deltas,
//! or moving tables through a store.

use thiserror::Error;

use crate::frequency::CanonicalFrequency;

/// Errors that can occur during series operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// The frequency token matches no canonical frequency.
    #[error("Unsupported frequency: {0}")]
    UnsupportedFrequency(String),

    /// The requested ticker is absent from the series table.
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// No calendar or row offset relates the two frequencies.
    #[error("Unsupported conversion: {native} -> {aggregation}")]
    UnsupportedConversion {
        /// Native frequency of the series.
        native: CanonicalFrequency,
        /// Requested aggregation frequency.
        aggregation: CanonicalFrequency,
    },

    /// The observation source failed for a ticker.
    #[error("Source error for {ticker}: {message}")]
    Source {
        /// The ticker being fetched.
        ticker: String,
        /// Description of the failure.
        message: String,
    },

    /// Error reading or writing a persisted table.
    #[error("Store error: {0}")]
    Store(String),

    /// Error parsing persisted or configured data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl SeriesError {
    /// Returns true for errors confined to a single report row.
    ///
    /// Row-local errors are reported next to the affected indicator and never
    /// abort processing of the remaining rows.
    #[must_use]
    pub const fn is_row_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFrequency(_)
                | Self::TickerNotFound(_)
                | Self::UnsupportedConversion { .. }
        )
    }
}

/// Result type alias using [`SeriesError`].
pub type Result<T> = std::result::Result<T, SeriesError>;
