//! Batch scorer
//!
//! Orchestrates one scoring pass for a target date:
//!
//! ```text
//! symbols_on_date ─┐
//! load_histories ──┤  (one bulk read each)
//! index_series ────┤
//! earnings set ────┤
//! events / deals ──┘
//!         ↓
//! par_iter over symbols: SymbolHistory → NoiseEliminator → signals → aggregate
//!         ↓
//! sort by symbol → write_scores (single transaction)
//! ```
//!
//! Scoring reads only shared, immutable inputs, so the per-symbol loop runs
//! on rayon with no locking. The only write happens once at the end.

use super::aggregator::aggregate;
use super::context::{ContextIndex, ALLOTMENT_LOOKBACK_DAYS, DEAL_LOOKBACK_DAYS, RESULTS_KEYWORDS};
use super::noise::{NoiseEliminator, SkipReason};
use super::signals::evaluate;
use super::types::{DailyBar, IndexSeries, ScoreRecord, SymbolHistory};
use crate::error::{Result, ScanError};
use crate::store::SeriesStore;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// What happened to one symbol in a pass
#[derive(Debug)]
pub enum SymbolOutcome {
    Scored(ScoreRecord),
    Skipped(SkipReason),
    Failed(ScanError),
}

/// Result of a full scoring pass
#[derive(Debug)]
pub struct BatchRun {
    pub date: NaiveDate,
    pub symbols_seen: usize,
    /// Sorted by symbol
    pub records: Vec<ScoreRecord>,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub failed: usize,
    pub written: usize,
    pub context: ContextIndex,
}

/// Inputs shared by every symbol on one target date
pub struct DayInputs {
    pub index: IndexSeries,
    pub recent_earnings: HashSet<String>,
}

impl DayInputs {
    /// The benchmark, or `None` when nothing was loaded
    pub fn index(&self) -> Option<&IndexSeries> {
        (!self.index.is_empty()).then_some(&self.index)
    }
}

pub struct BatchScorer<S: SeriesStore> {
    store: S,
    eliminator: NoiseEliminator,
    benchmark_index: String,
    lookback_days: i64,
}

impl<S: SeriesStore> BatchScorer<S> {
    pub fn new(
        store: S,
        eliminator: NoiseEliminator,
        benchmark_index: impl Into<String>,
        lookback_days: i64,
    ) -> Self {
        Self {
            store,
            eliminator,
            benchmark_index: benchmark_index.into(),
            lookback_days,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn eliminator(&self) -> &NoiseEliminator {
        &self.eliminator
    }

    pub fn benchmark_index(&self) -> &str {
        &self.benchmark_index
    }

    pub fn lookback_days(&self) -> i64 {
        self.lookback_days
    }

    /// First calendar date of the history window for `target_date`
    pub fn window_start(&self, target_date: NaiveDate) -> NaiveDate {
        target_date - Duration::days(self.lookback_days)
    }

    /// Score every symbol with a bar on `target_date` and persist the records
    ///
    /// Returns the number of records written.
    pub fn run_scoring(&mut self, target_date: NaiveDate) -> Result<usize> {
        self.run(target_date).map(|run| run.written)
    }

    /// Full pass, keeping the staged records and tallies for reporting
    pub fn run(&mut self, target_date: NaiveDate) -> Result<BatchRun> {
        let symbols = self.store.symbols_on_date(target_date)?;
        if symbols.is_empty() {
            return Err(ScanError::NoPriceData(target_date.to_string()));
        }

        let from = self.window_start(target_date);
        let mut histories = self.store.load_histories(from, target_date)?;
        let inputs = self.day_inputs(target_date, from, target_date)?;

        let events = self.store.events(
            target_date - Duration::days(ALLOTMENT_LOOKBACK_DAYS),
            target_date,
        )?;
        let deals = self
            .store
            .bulk_deals(target_date - Duration::days(DEAL_LOOKBACK_DAYS), target_date)?;
        let context = ContextIndex::build(target_date, &events, &deals);

        log::info!(
            "📥 Loaded {} symbols, {} bars, {} index points, {} earnings exclusions, {} events, {} deals",
            symbols.len(),
            histories.values().map(Vec::len).sum::<usize>(),
            inputs.index.points().len(),
            inputs.recent_earnings.len(),
            events.len(),
            deals.len()
        );
        if inputs.index.is_empty() {
            log::warn!(
                "⚠️  No {} data in window, price detachment scores 0",
                self.benchmark_index
            );
        }

        let work: Vec<(String, Vec<DailyBar>)> = symbols
            .into_iter()
            .map(|symbol| {
                let bars = histories.remove(&symbol).unwrap_or_default();
                (symbol, bars)
            })
            .collect();
        let symbols_seen = work.len();

        // Only the gate and the day inputs cross threads; the store is not Sync
        let eliminator = &self.eliminator;
        let outcomes: Vec<(String, SymbolOutcome)> = work
            .into_par_iter()
            .map(|(symbol, bars)| {
                let outcome = score_symbol(
                    eliminator,
                    &symbol,
                    bars,
                    target_date,
                    inputs.index(),
                    &inputs.recent_earnings,
                );
                (symbol, outcome)
            })
            .collect();

        let mut records = Vec::new();
        let mut skipped: BTreeMap<SkipReason, usize> = BTreeMap::new();
        let mut failed = 0;
        for (symbol, outcome) in outcomes {
            match outcome {
                SymbolOutcome::Scored(record) => records.push(record),
                SymbolOutcome::Skipped(reason) => *skipped.entry(reason).or_insert(0) += 1,
                SymbolOutcome::Failed(e) => {
                    log::warn!("⚠️  Skipping {}: {}", symbol, e);
                    failed += 1;
                }
            }
        }
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        for (reason, count) in &skipped {
            log::info!("   ├─ skipped {}: {}", reason, count);
        }
        if failed > 0 {
            log::warn!("   ├─ failed: {}", failed);
        }

        let written = self.store.write_scores(target_date, &records)?;
        log::info!(
            "✅ Scored {} of {} symbols for {}",
            written,
            symbols_seen,
            target_date
        );

        Ok(BatchRun {
            date: target_date,
            symbols_seen,
            records,
            skipped,
            failed,
            written,
            context,
        })
    }

    /// Benchmark series over `[from, to]` and the recent-earnings set for
    /// `target_date`
    pub fn day_inputs(
        &self,
        target_date: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<DayInputs> {
        let index = self.store.index_series(&self.benchmark_index, from, to)?;
        let recent_earnings = self.recent_earnings(target_date)?;
        Ok(DayInputs {
            index,
            recent_earnings,
        })
    }

    /// Symbols with results/dividend news in the last few trading dates
    pub fn recent_earnings(&self, target_date: NaiveDate) -> Result<HashSet<String>> {
        let window = self
            .store
            .trading_dates(target_date, self.eliminator.config().earnings_window_days)?;
        match window.first() {
            Some(&from) => self
                .store
                .recent_event_symbols(from, target_date, RESULTS_KEYWORDS),
            None => Ok(HashSet::new()),
        }
    }
}

/// Gate and score one symbol
///
/// Pure: everything it needs is passed in, so it is safe to call from any
/// worker thread.
pub fn score_symbol(
    eliminator: &NoiseEliminator,
    symbol: &str,
    bars: Vec<DailyBar>,
    target_date: NaiveDate,
    index: Option<&IndexSeries>,
    recent_earnings: &HashSet<String>,
) -> SymbolOutcome {
    let history = match SymbolHistory::new(symbol, bars) {
        Ok(h) => h,
        Err(e) => return SymbolOutcome::Failed(e),
    };

    if let Some(reason) = eliminator.should_skip(symbol, &history, target_date, recent_earnings) {
        return SymbolOutcome::Skipped(reason);
    }

    let scores = evaluate(history.until(target_date), index);
    SymbolOutcome::Scored(aggregate(target_date, symbol, scores))
}
