#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vintage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for vintage-aware macroeconomic series.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`CanonicalFrequency`](frequency::CanonicalFrequency) - Periodization unit
//! - [`AlignedSeries`](types::AlignedSeries) - One value per canonical period
//! - [`SeriesTable`](table::SeriesTable) - Values and release dates sharing one index
//! - [`ObservationSource`](source::ObservationSource) - Fetch seam
//! - [`SeriesStore`](store::SeriesStore) - Persistence seam

/// Error types for series operations.
pub mod error;
/// Canonical frequency definitions.
pub mod frequency;
/// Observation source trait.
pub mod source;
/// Store trait for persisted tables.
pub mod store;
/// Two-table layout of aligned series.
pub mod table;
/// Core data types (Ticker, Observation, AlignedSeries, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{Result, SeriesError};
pub use frequency::CanonicalFrequency;
pub use source::ObservationSource;
pub use store::SeriesStore;
pub use table::{SeriesTable, TableColumn};
pub use types::{AlignedEntry, AlignedSeries, DeltaSpec, Observation, Ticker, TickerProfile};
