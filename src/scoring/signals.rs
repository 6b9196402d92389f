//! Signal battery
//!
//! Seven independent, pure functions over a symbol's trailing bars. Each one
//! returns a value in `[0, max]` from a fixed threshold table and returns
//! exactly 0.0 when its window is short or a denominator is zero or missing.
//!
//! | Signal | Window | Max |
//! |---|---|---|
//! | S1 abnormal consistency | 30 bars vs full history | 2.0 |
//! | S2 chronic low delivery | 30 bars | 2.0 |
//! | S3 steady grind | 45 bars | 2.0 |
//! | S4 price detachment | 60 bars vs benchmark | 1.5 |
//! | S5 velocity fingerprint | 60 bars | 1.5 |
//! | S6 micro-cap detachment | 60 bars | 1.5 |
//! | S7 reversal risk | 5 bars vs 30 bars | 2.0 |

use super::types::{DailyBar, IndexSeries, SignalScores};
use super::windows::{
    close_to_close_returns, mean, pct_return, sample_std, trailing, trailing_day_returns,
    window_return,
};
use crate::units::CRORE;

pub const CONSISTENCY_WINDOW: usize = 30;
pub const LOW_DELIVERY_WINDOW: usize = 30;
pub const GRIND_WINDOW: usize = 45;
pub const DETACHMENT_WINDOW: usize = 60;
pub const VELOCITY_WINDOW: usize = 60;
pub const MICROCAP_WINDOW: usize = 60;
pub const REVERSAL_SHORT_WINDOW: usize = 5;
pub const REVERSAL_LONG_WINDOW: usize = 30;

/// Minimum date-aligned stock/index points for S4
pub const MIN_ALIGNED_POINTS: usize = 20;

/// Run all seven signals
pub fn evaluate(bars: &[DailyBar], index: Option<&IndexSeries>) -> SignalScores {
    SignalScores {
        abnormal_consistency: abnormal_consistency(bars),
        chronic_low_delivery: chronic_low_delivery(bars),
        steady_grind: steady_grind(bars),
        price_detachment: price_detachment(bars, index),
        velocity_fingerprint: velocity_fingerprint(bars),
        microcap_detachment: microcap_detachment(bars),
        reversal_risk: reversal_risk(bars),
    }
}

/// S1: share of the last 30 days trading above twice the long-run mean volume
pub fn abnormal_consistency(bars: &[DailyBar]) -> f64 {
    let Some(window) = trailing(bars, CONSISTENCY_WINDOW) else {
        return 0.0;
    };
    let Some(long_avg) = mean(bars.iter().map(|b| b.volume as f64)) else {
        return 0.0;
    };
    if long_avg <= 0.0 {
        return 0.0;
    }

    let heavy_days = window
        .iter()
        .filter(|b| b.volume as f64 > 2.0 * long_avg)
        .count();
    let fraction = heavy_days as f64 / window.len() as f64;

    if fraction > 0.60 {
        2.0
    } else if fraction > 0.40 {
        1.0
    } else {
        0.0
    }
}

/// S2: up days (>0.5%) settled with under 25% delivery, last 30 days
pub fn chronic_low_delivery(bars: &[DailyBar]) -> f64 {
    let (Some(window), Some(returns)) = (
        trailing(bars, LOW_DELIVERY_WINDOW),
        trailing_day_returns(bars, LOW_DELIVERY_WINDOW),
    ) else {
        return 0.0;
    };

    let days = window
        .iter()
        .zip(returns)
        .filter(|(bar, ret)| {
            matches!(ret, Some(r) if *r > 0.5)
                && matches!(bar.delivery_pct, Some(d) if d.is_finite() && d < 25.0)
        })
        .count();

    if days >= 15 {
        2.0
    } else if days >= 8 {
        1.0
    } else {
        0.0
    }
}

/// S3: mostly green candles with unusually low day-to-day volatility
pub fn steady_grind(bars: &[DailyBar]) -> f64 {
    let Some(window) = trailing(bars, GRIND_WINDOW) else {
        return 0.0;
    };
    let Some(std) = close_to_close_returns(window).and_then(|r| sample_std(&r)) else {
        return 0.0;
    };

    let positive = window.iter().filter(|b| b.is_positive()).count() as f64 / window.len() as f64;

    if positive > 0.80 && std < 1.0 {
        2.0
    } else if positive > 0.70 && std < 1.5 {
        1.5
    } else {
        0.0
    }
}

/// S4: 60-day outperformance over the benchmark on matching dates
pub fn price_detachment(bars: &[DailyBar], index: Option<&IndexSeries>) -> f64 {
    let Some(index) = index.filter(|i| !i.is_empty()) else {
        return 0.0;
    };
    let Some(window) = trailing(bars, DETACHMENT_WINDOW) else {
        return 0.0;
    };

    let aligned: Vec<(f64, f64)> = window
        .iter()
        .filter_map(|b| index.close_on(b.date).map(|ic| (b.close, ic)))
        .collect();
    if aligned.len() < MIN_ALIGNED_POINTS {
        return 0.0;
    }

    let (first, last) = (aligned[0], aligned[aligned.len() - 1]);
    let (Some(stock_ret), Some(index_ret)) =
        (pct_return(first.0, last.0), pct_return(first.1, last.1))
    else {
        return 0.0;
    };
    let detachment = stock_ret - index_ret;

    if detachment > 80.0 {
        1.5
    } else if detachment > 40.0 {
        1.0
    } else {
        0.0
    }
}

/// S5: large 60-day gain achieved with few down days
pub fn velocity_fingerprint(bars: &[DailyBar]) -> f64 {
    let Some(window) = trailing(bars, VELOCITY_WINDOW) else {
        return 0.0;
    };
    let (Some(ret), Some(returns)) = (window_return(window), close_to_close_returns(window)) else {
        return 0.0;
    };
    if returns.is_empty() {
        return 0.0;
    }

    let down_days = returns.iter().filter(|r| **r < 0.0).count();
    let smoothness = 1.0 - down_days as f64 / returns.len() as f64;

    if ret > 100.0 && smoothness > 0.80 {
        1.5
    } else if ret > 50.0 && smoothness > 0.75 {
        1.0
    } else {
        0.0
    }
}

/// S6: big 60-day move on turnover too thin to be organic
pub fn microcap_detachment(bars: &[DailyBar]) -> f64 {
    let Some(window) = trailing(bars, MICROCAP_WINDOW) else {
        return 0.0;
    };
    let (Some(price_move), Some(avg_turnover)) = (
        window_return(window),
        mean(window.iter().map(|b| b.turnover_rupees())),
    ) else {
        return 0.0;
    };
    if avg_turnover <= 0.0 || price_move <= 50.0 {
        return 0.0;
    }

    if avg_turnover < CRORE {
        1.5
    } else if avg_turnover < 5.0 * CRORE {
        1.0
    } else {
        0.0
    }
}

/// S7: distribution signs in the last week
///
/// Counts three independent signs: a 5-day drop worse than -2%, a down day
/// with delivery above 50%, and 5-day volume under half the 30-day average.
pub fn reversal_risk(bars: &[DailyBar]) -> f64 {
    let (Some(long), Some(short), Some(short_returns)) = (
        trailing(bars, REVERSAL_LONG_WINDOW),
        trailing(bars, REVERSAL_SHORT_WINDOW),
        trailing_day_returns(bars, REVERSAL_SHORT_WINDOW),
    ) else {
        return 0.0;
    };
    let (Some(short_ret), Some(short_vol), Some(long_vol)) = (
        window_return(short),
        mean(short.iter().map(|b| b.volume as f64)),
        mean(long.iter().map(|b| b.volume as f64)),
    ) else {
        return 0.0;
    };
    if long_vol <= 0.0 {
        return 0.0;
    }

    let falling = short_ret < -2.0;
    let delivered_selling = short.iter().zip(short_returns).any(|(bar, ret)| {
        matches!(ret, Some(r) if r < 0.0)
            && matches!(bar.delivery_pct, Some(d) if d.is_finite() && d > 50.0)
    });
    let drying_up = short_vol < 0.5 * long_vol;

    let signs = [falling, delivered_selling, drying_up]
        .iter()
        .filter(|s| **s)
        .count();

    match signs {
        3 => 2.0,
        2 => 1.0,
        _ => 0.0,
    }
}
