//! End-to-end scoring runs against a real SQLite file
//!
//! Each test seeds a fresh database under a tempdir, runs the batch scorer
//! and reads `manipulation_scores` back.

#[cfg(test)]
mod batch_scoring_tests {
    use chrono::NaiveDate;
    use pumpscan::scoring::{
        BatchScorer, DailyBar, IndexPoint, LargeCapUniverse, NoiseEliminator, NoiseFilterConfig,
        Phase, SkipReason,
    };
    use pumpscan::units::TurnoverUnit;
    use pumpscan::{ScanError, SeriesStore, SqliteStore};
    use tempfile::{tempdir, TempDir};

    const BENCHMARK: &str = "NIFTY 500";

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn bar(symbol: &str, n: i64, close: f64, volume: i64, delivery_pct: f64) -> DailyBar {
        DailyBar {
            date: day(n),
            symbol: symbol.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            prev_close: None,
            pct_change: None,
            volume,
            delivery_volume: None,
            delivery_pct: Some(delivery_pct),
            trades: None,
            turnover: None,
        }
    }

    /// 90 daily bars: flat price, 20 of the last 30 days at 10x volume
    fn volume_spike(symbol: &str) -> Vec<DailyBar> {
        (0..90)
            .map(|n| {
                let volume = if n >= 70 { 100_000 } else { 10_000 };
                bar(symbol, n, 50.0, volume, 50.0)
            })
            .collect()
    }

    /// 90 daily bars of a textbook pump: +1.5% a day on green candles, 10%
    /// delivery, thin turnover, volume stepping up 10x for the last 30 days
    fn textbook_pump(symbol: &str) -> Vec<DailyBar> {
        (0..90)
            .map(|n| {
                let close = 10.0 * 1.015f64.powi(n as i32);
                let volume = if n >= 60 { 100_000 } else { 10_000 };
                let mut b = bar(symbol, n, close, volume, 10.0);
                b.open = close * 0.995;
                b.low = b.open;
                b
            })
            .collect()
    }

    fn flat(symbol: &str) -> Vec<DailyBar> {
        (0..90).map(|n| bar(symbol, n, 50.0, 10_000, 50.0)).collect()
    }

    fn seeded_store(bars: &[DailyBar]) -> (TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tracker.db");
        let mut store = SqliteStore::open(&db_path).unwrap();
        store.upsert_daily_bars(bars).unwrap();
        (dir, db_path)
    }

    fn scorer(db_path: &std::path::Path, large_caps: &[&str]) -> BatchScorer<SqliteStore> {
        BatchScorer::new(
            SqliteStore::open_existing(db_path).unwrap(),
            NoiseEliminator::new(
                LargeCapUniverse::new("test", large_caps.iter().copied()),
                NoiseFilterConfig::default(),
            ),
            BENCHMARK,
            120,
        )
    }

    #[test]
    fn test_volume_consistency_scenario() {
        let (_dir, db_path) = seeded_store(&volume_spike("SPIKE"));
        let mut scorer = scorer(&db_path, &[]);

        assert_eq!(scorer.run_scoring(day(89)).unwrap(), 1);

        let records = scorer.store().scores_on(day(89)).unwrap();
        let record = &records[0];
        assert_eq!(record.symbol, "SPIKE");
        assert_eq!(record.signals.abnormal_consistency, 2.0);
        assert_eq!(record.total, 2.0);
        assert_eq!(record.phase, Phase::Clean);
        assert_eq!(record.signals_triggered, "consistency=2.0");
    }

    #[test]
    fn test_textbook_pump_is_extreme() {
        let (_dir, db_path) = seeded_store(&textbook_pump("PUMP"));
        let mut scorer = scorer(&db_path, &[]);
        scorer.run_scoring(day(89)).unwrap();

        let record = &scorer.store().scores_on(day(89)).unwrap()[0];
        assert_eq!(record.signals.abnormal_consistency, 2.0);
        assert_eq!(record.signals.chronic_low_delivery, 2.0);
        assert_eq!(record.signals.steady_grind, 2.0);
        assert_eq!(record.signals.velocity_fingerprint, 1.5);
        assert_eq!(record.signals.microcap_detachment, 1.5);
        // No benchmark loaded
        assert_eq!(record.signals.price_detachment, 0.0);
        assert_eq!(record.total, record.signals.total());
        assert_eq!(record.phase, Phase::Extreme);
    }

    #[test]
    fn test_large_cap_excluded_before_scoring() {
        let mut bars = textbook_pump("RELIANCE");
        bars.extend(flat("SMALLCO"));
        let (_dir, db_path) = seeded_store(&bars);
        let mut scorer = scorer(&db_path, &["RELIANCE"]);

        let run = scorer.run(day(89)).unwrap();
        assert_eq!(run.skipped.get(&SkipReason::LargeCap), Some(&1));
        assert_eq!(run.written, 1);

        let symbols: Vec<String> = scorer
            .store()
            .scores_on(day(89))
            .unwrap()
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        assert_eq!(symbols, vec!["SMALLCO"]);
    }

    #[test]
    fn test_benchmark_detachment() {
        let (_dir, db_path) = seeded_store(&textbook_pump("PUMP"));
        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            let flat_index: Vec<IndexPoint> = (0..90)
                .map(|n| IndexPoint {
                    date: day(n),
                    close: 20_000.0,
                })
                .collect();
            store.upsert_index_points(BENCHMARK, &flat_index).unwrap();
        }

        let mut scorer = scorer(&db_path, &[]);
        scorer.run_scoring(day(89)).unwrap();
        let record = &scorer.store().scores_on(day(89)).unwrap()[0];
        assert_eq!(record.signals.price_detachment, 1.5);
    }

    #[test]
    fn test_symbol_outside_benchmark_range_scores_zero_detachment() {
        let (_dir, db_path) = seeded_store(&textbook_pump("PUMP"));
        {
            // Only ten overlapping dates, below the alignment minimum
            let mut store = SqliteStore::open(&db_path).unwrap();
            let sparse: Vec<IndexPoint> = (80..90)
                .map(|n| IndexPoint {
                    date: day(n),
                    close: 20_000.0,
                })
                .collect();
            store.upsert_index_points(BENCHMARK, &sparse).unwrap();
        }

        let mut scorer = scorer(&db_path, &[]);
        scorer.run_scoring(day(89)).unwrap();
        let record = &scorer.store().scores_on(day(89)).unwrap()[0];
        assert_eq!(record.signals.price_detachment, 0.0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut bars = textbook_pump("PUMP");
        bars.extend(volume_spike("SPIKE"));
        bars.extend(flat("FLAT"));
        let (_dir, db_path) = seeded_store(&bars);
        let mut scorer = scorer(&db_path, &[]);

        scorer.run_scoring(day(89)).unwrap();
        let first = scorer.store().scores_on(day(89)).unwrap();
        scorer.run_scoring(day(89)).unwrap();
        let second = scorer.store().scores_on(day(89)).unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);

        let rows: i64 = scorer
            .store()
            .connection()
            .query_row("SELECT COUNT(*) FROM manipulation_scores", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_rerun_replaces_after_correction() {
        let (_dir, db_path) = seeded_store(&volume_spike("SPIKE"));
        let mut scorer = scorer(&db_path, &[]);
        scorer.run_scoring(day(89)).unwrap();
        assert_eq!(scorer.store().scores_on(day(89)).unwrap()[0].total, 2.0);

        // Re-ingest corrected volumes; the next run must overwrite the score
        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            store.upsert_daily_bars(&flat("SPIKE")).unwrap();
        }
        scorer.run_scoring(day(89)).unwrap();

        let records = scorer.store().scores_on(day(89)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total, 0.0);
        assert_eq!(records[0].signals_triggered, "");
    }

    #[test]
    fn test_recent_results_excluded() {
        let mut bars = flat("ABC");
        bars.extend(flat("XYZ"));
        let (_dir, db_path) = seeded_store(&bars);
        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            store
                .upsert_events(&[pumpscan::scoring::EventRecord {
                    date: day(87),
                    symbol: "XYZ".to_string(),
                    category: "Financial Results".to_string(),
                    description: "Audited results for the quarter".to_string(),
                }])
                .unwrap();
        }

        let mut scorer = scorer(&db_path, &[]);
        let run = scorer.run(day(89)).unwrap();
        assert_eq!(run.skipped.get(&SkipReason::RecentResults), Some(&1));
        assert_eq!(run.records.len(), 1);
        assert_eq!(run.records[0].symbol, "ABC");
    }

    #[test]
    fn test_heavily_traded_symbol_is_too_liquid() {
        // Feed reports turnover in crores: 200 crore a day
        let liquid: Vec<DailyBar> = flat("LIQUID")
            .into_iter()
            .map(|b| b.with_reported_turnover(200.0, TurnoverUnit::Crores))
            .collect();
        let (_dir, db_path) = seeded_store(&liquid);

        let mut scorer = scorer(&db_path, &[]);
        let run = scorer.run(day(89)).unwrap();
        assert_eq!(run.skipped.get(&SkipReason::TooLiquid), Some(&1));
        assert_eq!(run.written, 0);
    }

    #[test]
    fn test_malformed_row_skips_only_that_symbol() {
        let (_dir, db_path) = seeded_store(&flat("GOOD"));
        {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .connection()
                .execute(
                    "INSERT INTO daily_prices (date, symbol, open, close, volume)
                     VALUES ('2024-03-30', 'BROKEN', NULL, NULL, 100)",
                    [],
                )
                .unwrap();
        }

        let mut scorer = scorer(&db_path, &[]);
        let run = scorer.run(day(89)).unwrap();
        assert_eq!(run.failed, 1);
        assert_eq!(run.written, 1);
        assert_eq!(run.records[0].symbol, "GOOD");
    }

    #[test]
    fn test_text_in_numeric_column_skips_only_that_symbol() {
        let (_dir, db_path) = seeded_store(&flat("GOOD"));
        {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .connection()
                .execute(
                    "INSERT INTO daily_prices (date, symbol, open, close, volume, delivery_pct)
                     VALUES ('2024-03-30', 'BROKEN', 10, 10, 100, ' -')",
                    [],
                )
                .unwrap();
        }

        let mut scorer = scorer(&db_path, &[]);
        let run = scorer.run(day(89)).unwrap();
        assert_eq!(run.symbols_seen, 2);
        assert_eq!(run.failed, 1);
        assert_eq!(run.written, 1);
        assert_eq!(run.records[0].symbol, "GOOD");
    }

    #[test]
    fn test_date_without_prices_fails_and_writes_nothing() {
        let (_dir, db_path) = seeded_store(&flat("ABC"));
        let mut scorer = scorer(&db_path, &[]);

        let err = scorer.run_scoring(day(200)).unwrap_err();
        assert!(matches!(err, ScanError::NoPriceData(_)));
        assert!(scorer.store().scores_on(day(200)).unwrap().is_empty());
        assert_eq!(scorer.store().latest_price_date().unwrap(), Some(day(89)));
    }
}
