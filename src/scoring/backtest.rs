//! Day-by-day replay of the batch scorer over a date range
//!
//! Read-only: nothing is written to `manipulation_scores`. Each replayed date
//! sees exactly the window a live run on that date would have loaded.

use super::aggregator::{DISTRIBUTION_THRESHOLD, EXTREME_THRESHOLD, PUMP_THRESHOLD, WATCH_THRESHOLD};
use super::engine::{score_symbol, BatchScorer, SymbolOutcome};
use super::noise::SkipReason;
use super::types::{DailyBar, ScoreRecord};
use crate::error::{Result, ScanError};
use crate::store::SeriesStore;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// One symbol's replayed scores, ascending by date
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub symbol: String,
    pub records: Vec<ScoreRecord>,
    pub skipped: Vec<(NaiveDate, SkipReason)>,
}

/// Headline numbers for a timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub symbol: String,
    pub days_scored: usize,
    pub max_total: Option<f64>,
    pub max_date: Option<NaiveDate>,
    pub reached_distribution: bool,
    pub first_watch: Option<NaiveDate>,
    pub first_pump: Option<NaiveDate>,
    pub first_extreme: Option<NaiveDate>,
}

impl TimelineSummary {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let first_at = |threshold: f64| {
            timeline
                .records
                .iter()
                .find(|r| r.total >= threshold)
                .map(|r| r.date)
        };

        // Earliest date wins a tie for the maximum
        let mut max: Option<&ScoreRecord> = None;
        for record in &timeline.records {
            if max.map_or(true, |m| record.total > m.total) {
                max = Some(record);
            }
        }

        Self {
            symbol: timeline.symbol.clone(),
            days_scored: timeline.records.len(),
            max_total: max.map(|r| r.total),
            max_date: max.map(|r| r.date),
            reached_distribution: timeline
                .records
                .iter()
                .any(|r| r.total >= DISTRIBUTION_THRESHOLD),
            first_watch: first_at(WATCH_THRESHOLD),
            first_pump: first_at(PUMP_THRESHOLD),
            first_extreme: first_at(EXTREME_THRESHOLD),
        }
    }

    pub fn render(&self) -> String {
        let never = |d: Option<NaiveDate>| d.map_or("Never".to_string(), |d| d.to_string());
        let max = match (self.max_total, self.max_date) {
            (Some(total), Some(date)) => format!("{:.1} on {}", total, date),
            _ => "no scored days".to_string(),
        };
        format!(
            "--- {} ---\n  Days scored: {}\n  Max score: {}\n  Reached {:.0}+: {}\n  First crossed {:.0}: {}\n  First crossed {:.0}: {}\n  First crossed {:.0}: {}",
            self.symbol,
            self.days_scored,
            max,
            DISTRIBUTION_THRESHOLD,
            if self.reached_distribution { "YES" } else { "NO" },
            WATCH_THRESHOLD,
            never(self.first_watch),
            PUMP_THRESHOLD,
            never(self.first_pump),
            EXTREME_THRESHOLD,
            never(self.first_extreme),
        )
    }
}

impl Timeline {
    /// `date total phase signals` per scored day
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.symbol);
        for r in &self.records {
            out.push_str(&format!(
                "  {}  {:>5.2}  {:<13} {}\n",
                r.date,
                r.total,
                r.phase.as_str(),
                r.signals_triggered
            ));
        }
        if !self.skipped.is_empty() {
            out.push_str(&format!("  ({} days skipped by the noise filter)\n", self.skipped.len()));
        }
        out
    }
}

pub struct Backtester<'a, S: SeriesStore> {
    scorer: &'a BatchScorer<S>,
}

impl<'a, S: SeriesStore> Backtester<'a, S> {
    pub fn new(scorer: &'a BatchScorer<S>) -> Self {
        Self { scorer }
    }

    /// Replay every date with price data in `[from, to]` for `symbols`
    ///
    /// Timelines come back in the order the symbols were given.
    pub fn run(&self, symbols: &[String], from: NaiveDate, to: NaiveDate) -> Result<Vec<Timeline>> {
        let store = self.scorer.store();
        let dates = store.price_dates(from, to)?;
        if dates.is_empty() {
            return Err(ScanError::NoPriceData(format!("{} to {}", from, to)));
        }

        let load_from = self.scorer.window_start(from);
        let index = store.index_series(self.scorer.benchmark_index(), load_from, to)?;
        let index = (!index.is_empty()).then_some(&index);

        let histories: Vec<Vec<DailyBar>> = symbols
            .iter()
            .map(|s| store.history(s, load_from, to))
            .collect::<Result<_>>()?;

        // Earnings sets need the store, so gather them before going parallel
        let earnings: Vec<HashSet<String>> = dates
            .iter()
            .map(|&d| self.scorer.recent_earnings(d))
            .collect::<Result<_>>()?;

        log::info!(
            "🔁 Replaying {} dates ({} to {}) for {} symbols",
            dates.len(),
            dates[0],
            dates[dates.len() - 1],
            symbols.len()
        );

        // Only plain data crosses threads; the store is not Sync
        let eliminator = self.scorer.eliminator();
        let lookback = Duration::days(self.scorer.lookback_days());
        let per_date: Vec<Vec<(usize, SymbolOutcome)>> = dates
            .par_iter()
            .zip(earnings.par_iter())
            .map(|(&date, recent_earnings)| {
                let window_from = date - lookback;
                histories
                    .iter()
                    .enumerate()
                    .filter_map(|(i, bars)| {
                        let start = bars.partition_point(|b| b.date < window_from);
                        let end = bars.partition_point(|b| b.date <= date);
                        let window = &bars[start..end];
                        // Live runs only score symbols that traded on the date
                        if window.last().map(|b| b.date) != Some(date) {
                            return None;
                        }
                        let outcome = score_symbol(
                            eliminator,
                            &symbols[i],
                            window.to_vec(),
                            date,
                            index,
                            recent_earnings,
                        );
                        Some((i, outcome))
                    })
                    .collect()
            })
            .collect();

        let mut timelines: Vec<Timeline> = symbols
            .iter()
            .map(|s| Timeline {
                symbol: s.clone(),
                ..Default::default()
            })
            .collect();

        for (date, outcomes) in dates.iter().zip(per_date) {
            for (i, outcome) in outcomes {
                match outcome {
                    SymbolOutcome::Scored(record) => timelines[i].records.push(record),
                    SymbolOutcome::Skipped(reason) => timelines[i].skipped.push((*date, reason)),
                    SymbolOutcome::Failed(e) => {
                        log::warn!("⚠️  {} on {}: {}", symbols[i], date, e)
                    }
                }
            }
        }

        Ok(timelines)
    }
}
