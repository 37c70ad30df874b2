#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vintage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Persistence backends for series tables.
//!
//! This crate provides implementations of the [`SeriesStore`] trait from `vintage-core`:
//!
//! - [`CsvStore`] - Values and dates files per frequency
//! - [`SqliteStore`] - Persistent SQLite store (default, requires `sqlite` feature)
//! - [`InMemoryStore`] - Simple in-memory store for testing

/// CSV file store.
pub mod csv;
/// In-memory store implementation.
pub mod memory;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use vintage_core::SeriesStore;

pub use csv::CsvStore;
pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
