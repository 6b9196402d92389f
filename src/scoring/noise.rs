//! Noise eliminator
//!
//! Gate that runs before any signal. Filters are checked in order and the
//! first match wins:
//!
//! 1. `large_cap` - member of the large-cap reference universe
//! 2. `insufficient_history` - fewer than 60 bars up to the target date
//! 3. `recent_results` - results/dividend announced in the last 5 trading days
//! 4. `too_liquid` - 90-day average turnover above 100 crore

use super::types::SymbolHistory;
use super::windows::mean;
use crate::error::{Result, ScanError};
use crate::units::CRORE;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Why a symbol was left out of scoring, in gate order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    LargeCap,
    InsufficientHistory,
    RecentResults,
    TooLiquid,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::LargeCap => "large_cap",
            SkipReason::InsufficientHistory => "insufficient_history",
            SkipReason::RecentResults => "recent_results",
            SkipReason::TooLiquid => "too_liquid",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versioned large/liquid-index constituent set
///
/// Loaded from a JSON document so membership can change without a rebuild:
///
/// ```json
/// { "version": "nifty100-2024-09", "symbols": ["RELIANCE", "TCS"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LargeCapUniverse {
    pub version: String,
    symbols: HashSet<String>,
}

impl LargeCapUniverse {
    pub fn new<I, S>(version: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            version: version.into(),
            symbols: symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: LargeCapUniverse = serde_json::from_str(json)?;
        Ok(Self::new(raw.version, raw.symbols))
    }

    /// Read the reference set from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("cannot read large-cap set {}: {}", path.display(), e))
        })?;
        let universe = Self::from_json_str(&json)?;
        log::info!(
            "📋 Loaded large-cap set {} ({} symbols) from {}",
            universe.version,
            universe.len(),
            path.display()
        );
        Ok(universe)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(&symbol.trim().to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Thresholds for the gate
#[derive(Debug, Clone)]
pub struct NoiseFilterConfig {
    /// Bars required up to the target date
    pub min_history_bars: usize,
    /// Trading days an earnings announcement keeps a symbol out
    pub earnings_window_days: usize,
    /// Average daily turnover ceiling in rupees
    pub liquidity_ceiling: f64,
    /// Calendar days averaged for the liquidity check
    pub liquidity_window_days: i64,
}

impl Default for NoiseFilterConfig {
    fn default() -> Self {
        Self {
            min_history_bars: 60,
            earnings_window_days: 5,
            liquidity_ceiling: 100.0 * CRORE,
            liquidity_window_days: 90,
        }
    }
}

pub struct NoiseEliminator {
    large_caps: LargeCapUniverse,
    config: NoiseFilterConfig,
}

impl NoiseEliminator {
    pub fn new(large_caps: LargeCapUniverse, config: NoiseFilterConfig) -> Self {
        Self { large_caps, config }
    }

    pub fn config(&self) -> &NoiseFilterConfig {
        &self.config
    }

    /// Decide whether `symbol` is scored on `target_date`
    ///
    /// Returns the first matching skip reason, or `None` if the symbol
    /// proceeds to the signal battery.
    pub fn should_skip(
        &self,
        symbol: &str,
        history: &SymbolHistory,
        target_date: NaiveDate,
        recent_earnings: &HashSet<String>,
    ) -> Option<SkipReason> {
        if self.large_caps.contains(symbol) {
            return Some(SkipReason::LargeCap);
        }

        let bars = history.until(target_date);
        if bars.len() < self.config.min_history_bars {
            return Some(SkipReason::InsufficientHistory);
        }

        if recent_earnings.contains(symbol) {
            return Some(SkipReason::RecentResults);
        }

        let cutoff = target_date - Duration::days(self.config.liquidity_window_days);
        let start = bars.partition_point(|b| b.date <= cutoff);
        if let Some(avg) = mean(bars[start..].iter().map(|b| b.turnover_rupees())) {
            if avg > self.config.liquidity_ceiling {
                return Some(SkipReason::TooLiquid);
            }
        }

        None
    }
}
