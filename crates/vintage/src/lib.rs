#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vintage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Vintage-aware macroeconomic time series.
//!
//! This crate re-exports the core types, the alignment and delta engine and the
//! store implementations, and adds a [`SeriesRegistry`] that refreshes tables per
//! frequency with per-ticker failure isolation, plus report-row assembly.
//!
//! # Features
//!
//! - `store-sqlite` - SQLite store

// Core types and traits
pub use vintage_core::*;

// Engine
pub use vintage_engine::{
    CalendarOffset, DerivedSeries, FreshnessPolicy, LagWindow, Shift, align, check_conversion,
    delta_window, deltas, get_delta, get_level, level_window, row_offset,
};

// Store implementations
#[cfg(feature = "store-sqlite")]
pub use vintage_store::SqliteStore;
pub use vintage_store::{CsvStore, InMemoryStore};

mod config;
mod registry;
mod report;

pub use config::{DashboardConfig, DerivedConfig};
pub use registry::{DEFAULT_LAG_DEPTH, MAX_LAG_DEPTH, RefreshReport, SeriesRegistry, SkippedTicker};
pub use report::{IndicatorSpec, ReportRow, ReportSection, Section, Units, build_report, build_section};
