#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vintage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Alignment, lag windows and delta computation for vintage series.
//!
//! Every operation here is a pure transformation over in-memory data. Tickers
//! are independent of each other, so callers may align them in parallel.

/// Period alignment of vintage observations.
pub mod align;
/// Delta computation across frequencies.
pub mod delta;
/// Derived columns.
pub mod derive;
/// Freshness classification.
pub mod freshness;
/// Level and lag extraction.
pub mod level;

pub use align::align;
pub use delta::{CalendarOffset, Shift, check_conversion, delta_window, deltas, get_delta, row_offset};
pub use derive::DerivedSeries;
pub use freshness::FreshnessPolicy;
pub use level::{LagWindow, get_level, level_window};
