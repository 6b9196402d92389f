//! Aggregator and phase classifier

use super::types::{Phase, ScoreRecord, SignalScores};
use chrono::NaiveDate;

pub const EXTREME_THRESHOLD: f64 = 8.0;
pub const DISTRIBUTION_THRESHOLD: f64 = 6.0;
pub const PUMP_THRESHOLD: f64 = 5.0;
pub const WATCH_THRESHOLD: f64 = 3.0;

/// Map a total score and the reversal state to a phase
///
/// DISTRIBUTION is checked before PUMP PHASE: a high score with active
/// reversal signs is distribution, not an ongoing pump.
pub fn classify_phase(total: f64, reversal_active: bool) -> Phase {
    if total >= EXTREME_THRESHOLD {
        Phase::Extreme
    } else if total >= DISTRIBUTION_THRESHOLD && reversal_active {
        Phase::Distribution
    } else if total >= PUMP_THRESHOLD {
        Phase::PumpPhase
    } else if total >= WATCH_THRESHOLD {
        Phase::Watch
    } else {
        Phase::Clean
    }
}

/// `name=value` list of the signals above zero, in signal order
pub fn signals_triggered(scores: &SignalScores) -> String {
    scores
        .entries()
        .iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(id, v)| format!("{}={:.1}", id.as_str(), v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Sum, classify and package one symbol's signals
pub fn aggregate(date: NaiveDate, symbol: &str, scores: SignalScores) -> ScoreRecord {
    let total = scores.total();
    ScoreRecord {
        date,
        symbol: symbol.to_string(),
        signals: scores,
        total,
        phase: classify_phase(total, scores.reversal_risk > 0.0),
        signals_triggered: signals_triggered(&scores),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_table() {
        assert_eq!(classify_phase(8.1, false), Phase::Extreme);
        assert_eq!(classify_phase(8.0, true), Phase::Extreme);
        assert_eq!(classify_phase(6.5, true), Phase::Distribution);
        assert_eq!(classify_phase(6.5, false), Phase::PumpPhase);
        assert_eq!(classify_phase(5.5, true), Phase::PumpPhase);
        assert_eq!(classify_phase(4.0, false), Phase::Watch);
        assert_eq!(classify_phase(3.0, false), Phase::Watch);
        assert_eq!(classify_phase(2.99, true), Phase::Clean);
        assert_eq!(classify_phase(1.0, false), Phase::Clean);
    }

    #[test]
    fn test_aggregate_total_is_exact_sum() {
        let scores = SignalScores {
            abnormal_consistency: 2.0,
            chronic_low_delivery: 2.0,
            steady_grind: 1.5,
            price_detachment: 1.5,
            velocity_fingerprint: 1.5,
            microcap_detachment: 1.5,
            reversal_risk: 2.0,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let record = aggregate(date, "ABC", scores);

        assert_eq!(record.total, 12.0);
        assert_eq!(record.phase, Phase::Extreme);
    }

    #[test]
    fn test_distribution_uses_reversal_signal() {
        let scores = SignalScores {
            abnormal_consistency: 2.0,
            chronic_low_delivery: 2.0,
            steady_grind: 1.5,
            reversal_risk: 1.0,
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let record = aggregate(date, "ABC", scores);

        assert_eq!(record.total, 6.5);
        assert_eq!(record.phase, Phase::Distribution);
        assert_eq!(
            record.signals_triggered,
            "consistency=2.0,low_delivery=2.0,steady_grind=1.5,reversal=1.0"
        );
    }

    #[test]
    fn test_nothing_triggered() {
        assert_eq!(signals_triggered(&SignalScores::default()), "");
    }
}
