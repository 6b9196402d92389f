//! Trailing-window helpers and small statistics
//!
//! Every helper returns `None` instead of NaN: an empty window, a zero or
//! missing denominator, or a non-finite input all collapse to `None`, and the
//! calling signal turns that into a zero contribution.

use super::types::DailyBar;

/// Last `n` bars, or `None` when fewer than `n` are available
pub fn trailing(bars: &[DailyBar], n: usize) -> Option<&[DailyBar]> {
    if n == 0 || bars.len() < n {
        return None;
    }
    Some(&bars[bars.len() - n..])
}

/// Arithmetic mean of finite values
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        if !v.is_finite() {
            return None;
        }
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sample standard deviation (n - 1); needs at least two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values.iter().copied())?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let std = var.sqrt();
    std.is_finite().then_some(std)
}

/// Percent change from `from` to `to`; `None` on a non-positive base
pub fn pct_return(from: f64, to: f64) -> Option<f64> {
    if !from.is_finite() || !to.is_finite() || from <= 0.0 {
        return None;
    }
    Some((to - from) / from * 100.0)
}

/// Percent return across a window, first close to last close
pub fn window_return(window: &[DailyBar]) -> Option<f64> {
    let first = window.first()?;
    let last = window.last()?;
    pct_return(first.close, last.close)
}

/// Day return of `bar` in percent
///
/// Prefers the exchange-reported change, then the previous bar's close, then
/// the bar's own previous-close field.
pub fn day_return(prev: Option<&DailyBar>, bar: &DailyBar) -> Option<f64> {
    if let Some(pct) = bar.pct_change.filter(|p| p.is_finite()) {
        return Some(pct);
    }
    let base = prev.map(|p| p.close).or(bar.prev_close)?;
    pct_return(base, bar.close)
}

/// Day returns for the last `n` bars, using the bar before the window as the
/// base for the first one when it exists
pub fn trailing_day_returns(bars: &[DailyBar], n: usize) -> Option<Vec<Option<f64>>> {
    let window = trailing(bars, n)?;
    let offset = bars.len() - n;
    let returns = window
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = (offset + i).checked_sub(1).map(|j| &bars[j]);
            day_return(prev, bar)
        })
        .collect();
    Some(returns)
}

/// Close-to-close percent returns within a window (len - 1 values)
pub fn close_to_close_returns(window: &[DailyBar]) -> Option<Vec<f64>> {
    window
        .windows(2)
        .map(|pair| pct_return(pair[0].close, pair[1].close))
        .collect()
}
