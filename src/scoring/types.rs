//! Core data model for the scoring engine
//!
//! Bars, index points, corporate events and bulk deals come in from the store
//! read-only. Score records go back out, one per (date, symbol).

use crate::error::{Result, ScanError};
use crate::units::TurnoverUnit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One symbol, one trading date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub prev_close: Option<f64>,
    pub pct_change: Option<f64>,
    pub volume: i64,
    pub delivery_volume: Option<i64>,
    pub delivery_pct: Option<f64>,
    pub trades: Option<i64>,
    /// Reported turnover, already normalised to rupees at ingestion
    pub turnover: Option<f64>,
}

impl DailyBar {
    /// Traded value for the day in rupees
    ///
    /// Uses the reported turnover when the source supplied one, otherwise
    /// close x volume.
    pub fn turnover_rupees(&self) -> f64 {
        match self.turnover {
            Some(t) if t.is_finite() && t >= 0.0 => t,
            _ => self.close * self.volume as f64,
        }
    }

    /// Record a feed's turnover figure, converting from its declared unit
    pub fn with_reported_turnover(mut self, value: f64, unit: TurnoverUnit) -> Self {
        self.turnover = Some(unit.to_rupees(value));
        self
    }

    /// Close strictly above open
    pub fn is_positive(&self) -> bool {
        self.close > self.open
    }
}

/// Ascending, duplicate-free series of bars for one symbol
///
/// Gaps are allowed: non-trading days are absent, never zero-filled.
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    symbol: String,
    bars: Vec<DailyBar>,
}

impl SymbolHistory {
    /// Build a history, rejecting rows the signals cannot reason about
    ///
    /// Rejected: out-of-order or duplicate dates, non-finite open/close or
    /// optional prices, negative volume or counts, bars belonging to a
    /// different symbol.
    pub fn new(symbol: impl Into<String>, bars: Vec<DailyBar>) -> Result<Self> {
        let symbol = symbol.into();
        let malformed = |reason: String| ScanError::MalformedHistory {
            symbol: symbol.clone(),
            reason,
        };

        for (i, bar) in bars.iter().enumerate() {
            if bar.symbol != symbol {
                return Err(malformed(format!("bar for {} on {}", bar.symbol, bar.date)));
            }
            if !bar.close.is_finite() || !bar.open.is_finite() {
                return Err(malformed(format!("non-finite open/close on {}", bar.date)));
            }
            if bar.volume < 0 {
                return Err(malformed(format!("negative volume on {}", bar.date)));
            }
            let optional_reals = [bar.prev_close, bar.pct_change, bar.delivery_pct, bar.turnover];
            if optional_reals.iter().flatten().any(|v| !v.is_finite()) {
                return Err(malformed(format!("unreadable price field on {}", bar.date)));
            }
            if [bar.delivery_volume, bar.trades].iter().flatten().any(|v| *v < 0) {
                return Err(malformed(format!("negative count on {}", bar.date)));
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(malformed(format!(
                    "dates not strictly ascending at {}",
                    bar.date
                )));
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    /// Bars dated on or before `date`
    pub fn until(&self, date: NaiveDate) -> &[DailyBar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        &self.bars[..end]
    }
}

/// A single benchmark close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Benchmark index closes, ascending by date
#[derive(Debug, Clone, Default)]
pub struct IndexSeries {
    pub name: String,
    points: Vec<IndexPoint>,
}

impl IndexSeries {
    pub fn new(name: impl Into<String>, mut points: Vec<IndexPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn points(&self) -> &[IndexPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].close)
    }
}

/// Corporate announcement, used only for keyword membership tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub category: String,
    pub description: String,
}

impl EventRecord {
    /// True if the lowercased category or description contains any keyword
    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        let text = format!("{} {}", self.category, self.description).to_lowercase();
        keywords.iter().any(|kw| text.contains(kw))
    }

    /// Whole-word match, for short keywords like "mou" that hide inside
    /// longer words ("amount")
    pub fn mentions_word(&self, word: &str) -> bool {
        let text = format!("{} {}", self.category, self.description).to_lowercase();
        text.split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    }
}

/// Bulk/block deal with its counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDealRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub client_name: String,
    pub buy_sell: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
}

/// The seven suspicion signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
    AbnormalConsistency,
    ChronicLowDelivery,
    SteadyGrind,
    PriceDetachment,
    VelocityFingerprint,
    MicroCapDetachment,
    ReversalRisk,
}

impl SignalId {
    pub fn all() -> [SignalId; 7] {
        [
            SignalId::AbnormalConsistency,
            SignalId::ChronicLowDelivery,
            SignalId::SteadyGrind,
            SignalId::PriceDetachment,
            SignalId::VelocityFingerprint,
            SignalId::MicroCapDetachment,
            SignalId::ReversalRisk,
        ]
    }

    /// Short identifier used in the `signals_triggered` audit string
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalId::AbnormalConsistency => "consistency",
            SignalId::ChronicLowDelivery => "low_delivery",
            SignalId::SteadyGrind => "steady_grind",
            SignalId::PriceDetachment => "detachment",
            SignalId::VelocityFingerprint => "velocity",
            SignalId::MicroCapDetachment => "microcap",
            SignalId::ReversalRisk => "reversal",
        }
    }

    /// Upper bound of the signal's contribution
    pub fn max_score(&self) -> f64 {
        match self {
            SignalId::AbnormalConsistency => 2.0,
            SignalId::ChronicLowDelivery => 2.0,
            SignalId::SteadyGrind => 2.0,
            SignalId::PriceDetachment => 1.5,
            SignalId::VelocityFingerprint => 1.5,
            SignalId::MicroCapDetachment => 1.5,
            SignalId::ReversalRisk => 2.0,
        }
    }

    /// Plain-English description for summaries
    pub fn describe(&self) -> &'static str {
        match self {
            SignalId::AbnormalConsistency => "persistently abnormal volume",
            SignalId::ChronicLowDelivery => "rising on low delivery",
            SignalId::SteadyGrind => "steady low-volatility grind up",
            SignalId::PriceDetachment => "detached from benchmark",
            SignalId::VelocityFingerprint => "fast smooth rally",
            SignalId::MicroCapDetachment => "thinly traded rally",
            SignalId::ReversalRisk => "distribution signs",
        }
    }
}

/// Values of all seven signals for one symbol
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub abnormal_consistency: f64,
    pub chronic_low_delivery: f64,
    pub steady_grind: f64,
    pub price_detachment: f64,
    pub velocity_fingerprint: f64,
    pub microcap_detachment: f64,
    pub reversal_risk: f64,
}

impl SignalScores {
    pub fn get(&self, id: SignalId) -> f64 {
        match id {
            SignalId::AbnormalConsistency => self.abnormal_consistency,
            SignalId::ChronicLowDelivery => self.chronic_low_delivery,
            SignalId::SteadyGrind => self.steady_grind,
            SignalId::PriceDetachment => self.price_detachment,
            SignalId::VelocityFingerprint => self.velocity_fingerprint,
            SignalId::MicroCapDetachment => self.microcap_detachment,
            SignalId::ReversalRisk => self.reversal_risk,
        }
    }

    /// (id, value) pairs in signal order
    pub fn entries(&self) -> [(SignalId, f64); 7] {
        SignalId::all().map(|id| (id, self.get(id)))
    }

    /// Exact, uncapped sum of the seven values
    pub fn total(&self) -> f64 {
        self.abnormal_consistency
            + self.chronic_low_delivery
            + self.steady_grind
            + self.price_detachment
            + self.velocity_fingerprint
            + self.microcap_detachment
            + self.reversal_risk
    }
}

/// Manipulation-lifecycle label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Clean,
    Watch,
    PumpPhase,
    Distribution,
    Extreme,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Clean => "CLEAN",
            Phase::Watch => "WATCH",
            Phase::PumpPhase => "PUMP PHASE",
            Phase::Distribution => "DISTRIBUTION",
            Phase::Extreme => "EXTREME",
        }
    }

    /// Inverse of [`Phase::as_str`]
    pub fn parse_label(s: &str) -> Option<Self> {
        match s {
            "CLEAN" => Some(Phase::Clean),
            "WATCH" => Some(Phase::Watch),
            "PUMP PHASE" => Some(Phase::PumpPhase),
            "DISTRIBUTION" => Some(Phase::Distribution),
            "EXTREME" => Some(Phase::Extreme),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored (date, symbol) row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub signals: SignalScores,
    pub total: f64,
    pub phase: Phase,
    /// Compact `name=value` list of signals above zero
    pub signals_triggered: String,
}
