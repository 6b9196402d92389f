//! Signal-scoring engine
//!
//! Leaves first: [`types`] and [`windows`] feed the [`noise`] gate and the
//! [`signals`] battery, [`aggregator`] turns signals into a phase, and
//! [`engine`] runs the whole thing for one date. [`backtest`] replays it over
//! a range.

pub mod aggregator;
pub mod backtest;
pub mod context;
pub mod engine;
pub mod noise;
pub mod report;
pub mod signals;
pub mod types;
pub mod windows;

pub use aggregator::{aggregate, classify_phase};
pub use backtest::{Backtester, Timeline, TimelineSummary};
pub use context::{ContextIndex, SymbolContext};
pub use engine::{BatchRun, BatchScorer, SymbolOutcome};
pub use noise::{LargeCapUniverse, NoiseEliminator, NoiseFilterConfig, SkipReason};
pub use signals::evaluate;
pub use types::{
    BulkDealRecord, DailyBar, EventRecord, IndexPoint, IndexSeries, Phase, ScoreRecord, SignalId,
    SignalScores, SymbolHistory,
};
