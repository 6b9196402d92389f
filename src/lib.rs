//! pumpscan: daily pump-and-dump signal scoring for listed equities
//!
//! Reads end-of-day bars, benchmark closes, corporate events and bulk deals
//! from SQLite, scores every eligible symbol with seven signals, and writes
//! one `manipulation_scores` row per (date, symbol).

pub mod config;
pub mod error;
pub mod scoring;
pub mod sqlite_pragma;
pub mod store;
pub mod units;

pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use store::{SeriesStore, SqliteStore};

use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ScanError::InvalidDate(s.to_string()))
}
