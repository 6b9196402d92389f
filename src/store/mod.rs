//! Series store interface
//!
//! Everything the scoring engine reads or writes goes through
//! [`SeriesStore`]. `SqliteStore` is the production implementation.

pub mod sqlite;

pub use sqlite::{run_schema_migrations, SqliteStore};

use crate::error::Result;
use crate::scoring::types::{BulkDealRecord, DailyBar, EventRecord, IndexSeries, ScoreRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Data access used by the batch scorer and the backtester
///
/// All ranges are inclusive on both ends. Bar lists come back ascending by
/// date with gaps left as they are.
pub trait SeriesStore {
    /// Symbols with a bar on `date`, sorted
    fn symbols_on_date(&self, date: NaiveDate) -> Result<Vec<String>>;

    /// Most recent date with any price data
    fn latest_price_date(&self) -> Result<Option<NaiveDate>>;

    /// One symbol's bars over `[from, to]`
    fn history(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyBar>>;

    /// Every symbol's bars over `[from, to]` in a single read, grouped by symbol
    fn load_histories(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<DailyBar>>>;

    /// Benchmark closes over `[from, to]`; empty if the index is unknown
    fn index_series(&self, name: &str, from: NaiveDate, to: NaiveDate) -> Result<IndexSeries>;

    /// Symbols with an event in `[from, to]` whose type or description
    /// contains any of `keywords` (case-insensitive). An empty keyword list
    /// matches every event.
    fn recent_event_symbols(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        keywords: &[&str],
    ) -> Result<HashSet<String>>;

    fn events(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<EventRecord>>;

    fn bulk_deals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BulkDealRecord>>;

    /// The `n` most recent dates with price data up to and including `until`,
    /// ascending
    fn trading_dates(&self, until: NaiveDate, n: usize) -> Result<Vec<NaiveDate>>;

    /// Dates with price data in `[from, to]`, ascending
    fn price_dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// Replace the score rows for `date` keyed by symbol, atomically
    ///
    /// Returns the number of records written.
    fn write_scores(&mut self, date: NaiveDate, records: &[ScoreRecord]) -> Result<usize>;
}
