//! SQLite-backed series store
//!
//! Dates are stored as `YYYY-MM-DD` text. The schema ships inside the binary
//! (`sql/*.sql`) and is applied idempotently on every open.

use super::SeriesStore;
use crate::error::{Result, ScanError};
use crate::scoring::types::{
    BulkDealRecord, DailyBar, EventRecord, IndexPoint, IndexSeries, Phase, ScoreRecord,
    SignalScores,
};
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Schema files, applied in order; every statement uses IF NOT EXISTS
const MIGRATIONS: &[(&str, &str)] = &[
    ("00_daily_prices.sql", include_str!("../../sql/00_daily_prices.sql")),
    ("01_corporate_events.sql", include_str!("../../sql/01_corporate_events.sql")),
    ("02_bulk_deals.sql", include_str!("../../sql/02_bulk_deals.sql")),
    ("03_index_prices.sql", include_str!("../../sql/03_index_prices.sql")),
    ("04_manipulation_scores.sql", include_str!("../../sql/04_manipulation_scores.sql")),
];

/// Apply the embedded schema
pub fn run_schema_migrations(conn: &Connection) -> Result<()> {
    log::debug!("🔧 Running {} schema migrations", MIGRATIONS.len());
    for (name, sql) in MIGRATIONS {
        conn.execute_batch(sql)?;
        log::debug!("   └─ ✅ {}", name);
    }
    Ok(())
}

const BAR_COLUMNS: &str = "date, symbol, open, high, low, close, prev_close, pct_change, \
                           volume, delivery_volume, delivery_pct, trades, turnover";

// Unreadable values become ones SymbolHistory::new rejects (NaN or -1), so a
// bad row costs its symbol instead of the whole read. NULL stays NULL for the
// optional columns and reads as NaN/-1 for the required ones.
fn bar_from_row(row: &Row) -> rusqlite::Result<DailyBar> {
    Ok(DailyBar {
        date: row.get(0)?,
        symbol: row.get(1)?,
        open: real_at(row, 2)?.unwrap_or(f64::NAN),
        high: real_at(row, 3)?.unwrap_or(f64::NAN),
        low: real_at(row, 4)?.unwrap_or(f64::NAN),
        close: real_at(row, 5)?.unwrap_or(f64::NAN),
        prev_close: real_at(row, 6)?,
        pct_change: real_at(row, 7)?,
        volume: int_at(row, 8)?.unwrap_or(-1),
        delivery_volume: int_at(row, 9)?,
        delivery_pct: real_at(row, 10)?,
        trades: int_at(row, 11)?,
        turnover: real_at(row, 12)?,
    })
}

/// Numeric column read leniently: numeric text is parsed, anything else is NaN
fn real_at(row: &Row, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => Some(
            std::str::from_utf8(t)
                .ok()
                .and_then(|t| t.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN),
        ),
        ValueRef::Blob(_) => Some(f64::NAN),
    })
}

/// Integer column read leniently: whole-number text or reals are accepted,
/// anything else is -1
fn int_at(row: &Row, idx: usize) -> rusqlite::Result<Option<i64>> {
    let whole = |f: f64| {
        if f.is_finite() && f.fract() == 0.0 {
            f as i64
        } else {
            -1
        }
    };
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(whole(f)),
        ValueRef::Text(t) => Some(
            std::str::from_utf8(t)
                .ok()
                .and_then(|t| t.trim().parse::<f64>().ok())
                .map_or(-1, whole),
        ),
        ValueRef::Blob(_) => Some(-1),
    })
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) a database and apply the schema
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;
        run_schema_migrations(&conn)?;

        log::info!("✅ SQLite store ready: {}", db_path.display());
        Ok(Self { conn })
    }

    /// Open a database that must already exist
    ///
    /// The batch job uses this: a missing store is a configuration error, not
    /// an empty one.
    pub fn open_existing(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(ScanError::Config(format!(
                "database not found: {}",
                db_path.display()
            )));
        }
        Self::open(db_path)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert or replace bars keyed by (date, symbol)
    pub fn upsert_daily_bars(&mut self, bars: &[DailyBar]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO daily_prices ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                BAR_COLUMNS
            ))?;
            for bar in bars {
                stmt.execute(params![
                    bar.date,
                    bar.symbol,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.prev_close,
                    bar.pct_change,
                    bar.volume,
                    bar.delivery_volume,
                    bar.delivery_pct,
                    bar.trades,
                    bar.turnover,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("✅ Upserted {} daily bars", bars.len());
        Ok(bars.len())
    }

    pub fn upsert_index_points(
        &mut self,
        index_name: &str,
        points: &[IndexPoint],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO index_prices (index_name, date, close) VALUES (?1, ?2, ?3)",
            )?;
            for point in points {
                stmt.execute(params![index_name, point.date, point.close])?;
            }
        }
        tx.commit()?;
        Ok(points.len())
    }

    pub fn upsert_events(&mut self, events: &[EventRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO corporate_events (date, symbol, event_type, description) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for event in events {
                stmt.execute(params![event.date, event.symbol, event.category, event.description])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    pub fn upsert_bulk_deals(&mut self, deals: &[BulkDealRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO bulk_deals \
                 (date, symbol, client_name, buy_sell, quantity, price) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for deal in deals {
                stmt.execute(params![
                    deal.date,
                    deal.symbol,
                    deal.client_name,
                    deal.buy_sell.as_deref().unwrap_or(""),
                    deal.quantity,
                    deal.price,
                ])?;
            }
        }
        tx.commit()?;
        Ok(deals.len())
    }

    /// Stored scores for `date`, sorted by symbol
    pub fn scores_on(&self, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, symbol, abnormal_consistency, chronic_low_delivery, steady_grind,
                    price_detachment, velocity_fingerprint, microcap_detachment, reversal_risk,
                    total_score, phase, signals_triggered
             FROM manipulation_scores
             WHERE date = ?1
             ORDER BY symbol",
        )?;
        let rows = stmt
            .query_map(params![date], |row| {
                let signals = SignalScores {
                    abnormal_consistency: row.get(2)?,
                    chronic_low_delivery: row.get(3)?,
                    steady_grind: row.get(4)?,
                    price_detachment: row.get(5)?,
                    velocity_fingerprint: row.get(6)?,
                    microcap_detachment: row.get(7)?,
                    reversal_risk: row.get(8)?,
                };
                Ok((
                    row.get::<_, NaiveDate>(0)?,
                    row.get::<_, String>(1)?,
                    signals,
                    row.get::<_, f64>(9)?,
                    row.get::<_, String>(10)?,
                    row.get::<_, String>(11)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(date, symbol, signals, total, phase, signals_triggered)| {
                let phase = Phase::parse_label(&phase).ok_or_else(|| {
                    ScanError::Config(format!("unknown phase '{}' stored for {}", phase, symbol))
                })?;
                Ok(ScoreRecord {
                    date,
                    symbol,
                    signals,
                    total,
                    phase,
                    signals_triggered,
                })
            })
            .collect()
    }

    fn collect_dates(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let dates = stmt
            .query_map(params, |row| row.get::<_, NaiveDate>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }
}

impl SeriesStore for SqliteStore {
    fn symbols_on_date(&self, date: NaiveDate) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT symbol FROM daily_prices WHERE date = ?1 ORDER BY symbol")?;
        let symbols = stmt
            .query_map(params![date], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    fn latest_price_date(&self) -> Result<Option<NaiveDate>> {
        let latest = self
            .conn
            .query_row("SELECT MAX(date) FROM daily_prices", [], |row| {
                row.get::<_, Option<NaiveDate>>(0)
            })?;
        Ok(latest)
    }

    fn history(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyBar>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM daily_prices
             WHERE symbol = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date",
            BAR_COLUMNS
        ))?;
        let bars = stmt
            .query_map(params![symbol, from, to], bar_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bars)
    }

    fn load_histories(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<DailyBar>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM daily_prices
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY symbol, date",
            BAR_COLUMNS
        ))?;

        let mut grouped: BTreeMap<String, Vec<DailyBar>> = BTreeMap::new();
        for bar in stmt.query_map(params![from, to], bar_from_row)? {
            let bar = bar?;
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }
        Ok(grouped)
    }

    fn index_series(&self, name: &str, from: NaiveDate, to: NaiveDate) -> Result<IndexSeries> {
        let mut stmt = self.conn.prepare(
            "SELECT date, close FROM index_prices
             WHERE index_name = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date",
        )?;
        let points = stmt
            .query_map(params![name, from, to], |row| {
                Ok(IndexPoint {
                    date: row.get(0)?,
                    close: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(IndexSeries::new(name, points))
    }

    fn recent_event_symbols(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        keywords: &[&str],
    ) -> Result<HashSet<String>> {
        let mut sql = String::from(
            "SELECT DISTINCT symbol FROM corporate_events WHERE date BETWEEN ?1 AND ?2",
        );
        let mut args = vec![iso(from), iso(to)];

        if !keywords.is_empty() {
            let clauses: Vec<String> = keywords
                .iter()
                .map(|kw| {
                    args.push(format!("%{}%", kw.to_lowercase()));
                    let n = args.len();
                    format!("lower(event_type) LIKE ?{n} OR lower(description) LIKE ?{n}")
                })
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let symbols = stmt
            .query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(symbols)
    }

    fn events(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, symbol, event_type, description FROM corporate_events
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date, symbol",
        )?;
        let events = stmt
            .query_map(params![from, to], |row| {
                Ok(EventRecord {
                    date: row.get(0)?,
                    symbol: row.get(1)?,
                    category: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn bulk_deals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BulkDealRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, symbol, client_name, buy_sell, quantity, price FROM bulk_deals
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date, symbol",
        )?;
        let deals = stmt
            .query_map(params![from, to], |row| {
                let side: String = row.get(3)?;
                Ok(BulkDealRecord {
                    date: row.get(0)?,
                    symbol: row.get(1)?,
                    client_name: row.get(2)?,
                    buy_sell: (!side.is_empty()).then_some(side),
                    quantity: row.get(4)?,
                    price: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deals)
    }

    fn trading_dates(&self, until: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
        let mut dates = self.collect_dates(
            "SELECT DISTINCT date FROM daily_prices WHERE date <= ?1 ORDER BY date DESC LIMIT ?2",
            params![until, n as i64],
        )?;
        dates.reverse();
        Ok(dates)
    }

    fn price_dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
        self.collect_dates(
            "SELECT DISTINCT date FROM daily_prices WHERE date BETWEEN ?1 AND ?2 ORDER BY date",
            params![from, to],
        )
    }

    fn write_scores(&mut self, date: NaiveDate, records: &[ScoreRecord]) -> Result<usize> {
        if let Some(stray) = records.iter().find(|r| r.date != date) {
            return Err(ScanError::Config(format!(
                "score for {} dated {} passed in the batch for {}",
                stray.symbol, stray.date, date
            )));
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO manipulation_scores (
                    date, symbol, abnormal_consistency, chronic_low_delivery, steady_grind,
                    price_detachment, velocity_fingerprint, microcap_detachment, reversal_risk,
                    total_score, phase, signals_triggered
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for record in records {
                let s = &record.signals;
                stmt.execute(params![
                    record.date,
                    record.symbol,
                    s.abnormal_consistency,
                    s.chronic_low_delivery,
                    s.steady_grind,
                    s.price_detachment,
                    s.velocity_fingerprint,
                    s.microcap_detachment,
                    s.reversal_risk,
                    record.total,
                    record.phase.as_str(),
                    record.signals_triggered,
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("✅ Wrote {} score records for {}", records.len(), date);
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::test_support::{bar, day};
    use tempfile::tempdir;

    fn event(d: NaiveDate, symbol: &str, category: &str, description: &str) -> EventRecord {
        EventRecord {
            date: d,
            symbol: symbol.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("tracker.db");
        SqliteStore::open(&db_path).unwrap();
        let store = SqliteStore::open(&db_path).unwrap();

        let tables: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempdir().unwrap();
        let err = SqliteStore::open_existing(dir.path().join("missing.db"))
            .err()
            .unwrap();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_bars_roundtrip_and_latest_write_wins() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();

        store
            .upsert_daily_bars(&[bar("ABC", day(1), 10.0, 100), bar("ABC", day(0), 9.0, 100)])
            .unwrap();
        let mut corrected = bar("ABC", day(1), 11.0, 250);
        corrected.turnover = Some(2_750.0);
        store.upsert_daily_bars(&[corrected.clone()]).unwrap();

        let bars = store.history("ABC", day(0), day(5)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, day(0));
        assert_eq!(bars[1], corrected);
        assert_eq!(store.latest_price_date().unwrap(), Some(day(1)));
    }

    #[test]
    fn test_load_histories_groups_by_symbol() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        store
            .upsert_daily_bars(&[
                bar("XYZ", day(2), 5.0, 10),
                bar("ABC", day(2), 10.0, 10),
                bar("ABC", day(1), 10.0, 10),
                bar("ABC", day(9), 10.0, 10),
            ])
            .unwrap();

        let grouped = store.load_histories(day(0), day(5)).unwrap();
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["ABC", "XYZ"]);
        assert_eq!(grouped["ABC"].len(), 2);
        assert_eq!(grouped["ABC"][0].date, day(1));
        assert_eq!(store.symbols_on_date(day(2)).unwrap(), vec!["ABC", "XYZ"]);
    }

    #[test]
    fn test_null_close_surfaces_as_nan() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO daily_prices (date, symbol, volume) VALUES ('2024-01-01', 'BAD', 10)",
                [],
            )
            .unwrap();
        let bars = store.history("BAD", day(0), day(0)).unwrap();
        assert!(bars[0].close.is_nan());
    }

    #[test]
    fn test_text_in_numeric_columns_is_marked_not_fatal() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO daily_prices (date, symbol, open, close, volume, delivery_pct, trades)
                 VALUES ('2024-01-01', 'BAD', '12.5', 13, ' -', ' -', 'n/a')",
                [],
            )
            .unwrap();
        let bars = store.history("BAD", day(0), day(0)).unwrap();
        assert_eq!(bars[0].open, 12.5);
        assert_eq!(bars[0].close, 13.0);
        assert_eq!(bars[0].volume, -1);
        assert!(bars[0].delivery_pct.unwrap().is_nan());
        assert_eq!(bars[0].trades, Some(-1));
        assert_eq!(bars[0].turnover, None);
    }

    #[test]
    fn test_recent_event_symbols_keyword_filter() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        store
            .upsert_events(&[
                event(day(3), "ABC", "Financial Results", "Q2 results"),
                event(day(3), "DEF", "Dividend", "Interim DIVIDEND declared"),
                event(day(3), "XYZ", "Bonus", "1:1 bonus"),
                event(day(20), "LATE", "Financial Results", "Q3"),
            ])
            .unwrap();

        let hits = store
            .recent_event_symbols(day(0), day(10), &["results", "dividend"])
            .unwrap();
        let expected: HashSet<String> = ["ABC", "DEF"].iter().map(|s| s.to_string()).collect();
        assert_eq!(hits, expected);

        let all = store.recent_event_symbols(day(0), day(10), &[]).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_trading_dates_are_most_recent_ascending() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        let bars: Vec<DailyBar> = [0, 1, 4, 5, 6, 7, 8]
            .iter()
            .map(|&d| bar("ABC", day(d), 1.0, 1))
            .collect();
        store.upsert_daily_bars(&bars).unwrap();

        assert_eq!(
            store.trading_dates(day(7), 3).unwrap(),
            vec![day(5), day(6), day(7)]
        );
        assert_eq!(
            store.price_dates(day(1), day(4)).unwrap(),
            vec![day(1), day(4)]
        );
    }

    #[test]
    fn test_bulk_deal_side_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        let with_side = BulkDealRecord {
            date: day(1),
            symbol: "ABC".to_string(),
            client_name: "FUND".to_string(),
            buy_sell: Some("BUY".to_string()),
            quantity: Some(10),
            price: Some(1.5),
        };
        let without_side = BulkDealRecord {
            buy_sell: None,
            client_name: "OTHER".to_string(),
            ..with_side.clone()
        };
        store
            .upsert_bulk_deals(&[with_side.clone(), without_side.clone()])
            .unwrap();

        let deals = store.bulk_deals(day(0), day(2)).unwrap();
        assert_eq!(deals.len(), 2);
        assert!(deals.contains(&with_side));
        assert!(deals.contains(&without_side));
    }

    #[test]
    fn test_write_scores_rejects_foreign_dates() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("t.db")).unwrap();
        let record = ScoreRecord {
            date: day(2),
            symbol: "ABC".to_string(),
            signals: SignalScores::default(),
            total: 0.0,
            phase: Phase::Clean,
            signals_triggered: String::new(),
        };
        assert!(store.write_scores(day(1), &[record.clone()]).is_err());
        assert_eq!(store.write_scores(day(2), &[record]).unwrap(), 1);
        assert_eq!(store.scores_on(day(2)).unwrap().len(), 1);
    }
}
