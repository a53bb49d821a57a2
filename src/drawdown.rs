use chrono::NaiveDate;
use serde::Serialize;

use crate::utils::SeriesView;

/// A maximal run of strictly negative drawdown.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawdownPeriod {
    pub start: usize,
    /// Position of the deepest point of the run.
    pub valley: usize,
    /// Last underwater position (the run may still be open at the end).
    pub end: usize,
    pub start_date: Option<NaiveDate>,
    pub valley_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Depth as a negative fraction (e.g. -0.25 for -25%)
    pub depth: f64,
    /// Calendar days from start to end inclusive, or the number of
    /// observations when the series has no dates.
    pub days: u32,
}

/// Compounded value of one unit invested: `e_i = prod_{k<=i}(1 + r_k)`.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut eq = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            eq *= 1.0 + r;
            eq
        })
        .collect()
}

/// Running maximum of the equity curve.
pub fn peak_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|e| {
            peak = peak.max(*e);
            peak
        })
        .collect()
}

/// `dd_i = e_i / max(e_1..e_i) - 1`. Non-positive, and zero at the first
/// observation.
pub fn to_drawdown_series(returns: &[f64]) -> Vec<f64> {
    let equity = equity_curve(returns);
    let peaks = peak_series(&equity);
    equity
        .iter()
        .zip(&peaks)
        .map(|(e, p)| e / p - 1.0)
        .collect()
}

/// Every drawdown period of the series, in chronological order.
pub fn drawdown_details(series: SeriesView<'_>) -> Vec<DrawdownPeriod> {
    let drawdowns = to_drawdown_series(series.values);

    let mut periods = Vec::new();
    let mut open: Option<(usize, usize)> = None;

    for (i, &dd) in drawdowns.iter().enumerate() {
        match open {
            None if dd < 0.0 => open = Some((i, i)),
            Some((start, valley)) if dd < 0.0 => {
                if dd < drawdowns[valley] {
                    open = Some((start, i));
                }
            }
            Some((start, valley)) => {
                periods.push(make_period(series, &drawdowns, start, valley, i - 1));
                open = None;
            }
            None => {}
        }
    }

    if let Some((start, valley)) = open {
        periods.push(make_period(series, &drawdowns, start, valley, drawdowns.len() - 1));
    }

    periods
}

fn make_period(
    series: SeriesView<'_>,
    drawdowns: &[f64],
    start: usize,
    valley: usize,
    end: usize,
) -> DrawdownPeriod {
    let date_at = |i: usize| series.dates.and_then(|d| d.get(i).copied());
    let start_date = date_at(start);
    let end_date = date_at(end);

    let days = match (start_date, end_date) {
        (Some(s), Some(e)) => (e - s).num_days() + 1,
        _ => (end - start + 1) as i64,
    };

    DrawdownPeriod {
        start,
        valley,
        end,
        start_date,
        valley_date: date_at(valley),
        end_date,
        depth: drawdowns[valley],
        days: u32::try_from(days).unwrap_or(u32::MAX),
    }
}

/// The `top_n` deepest periods, deepest first.
pub fn top_drawdowns(series: SeriesView<'_>, top_n: usize) -> Vec<DrawdownPeriod> {
    let mut periods = drawdown_details(series);
    periods.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    periods.truncate(top_n);
    periods
}
