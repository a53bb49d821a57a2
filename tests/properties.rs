//! Invariants that must hold for any well-formed returns series.

use chrono::{Days, NaiveDate};
use perfstats::calendar::resample_monthly;
use perfstats::distribution::quantile;
use perfstats::drawdown::{equity_curve, peak_series, to_drawdown_series};
use perfstats::stats::{
    beta, exposure, max_drawdown, r_squared, total_return, ulcer_index, win_rate,
};
use perfstats::utils::prepare_returns;
use perfstats::{ReturnSeries, SeriesView};
use proptest::prelude::*;

fn returns_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.2_f64..0.2, 1..200)
}

/// Returns paired with strictly increasing dates, gaps of one to four days.
fn dated_returns() -> impl Strategy<Value = (Vec<f64>, Vec<NaiveDate>)> {
    prop::collection::vec((-0.2_f64..0.2, 1_u64..5), 1..200).prop_map(|rows| {
        let mut date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut values = Vec::with_capacity(rows.len());
        let mut dates = Vec::with_capacity(rows.len());
        for (value, gap) in rows {
            date = date + Days::new(gap);
            values.push(value);
            dates.push(date);
        }
        (values, dates)
    })
}

fn relative_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn total_return_is_the_compounded_product(r in returns_strategy()) {
        let product = r.iter().fold(1.0, |acc, x| acc * (1.0 + x));
        prop_assert!(relative_eq(total_return(&r), product - 1.0, 1e-12));
    }

    #[test]
    fn drawdowns_are_non_positive(r in returns_strategy()) {
        let dd = to_drawdown_series(&r);
        prop_assert_eq!(dd[0], 0.0);
        prop_assert!(dd.iter().all(|d| *d <= 0.0));
    }

    #[test]
    fn peak_never_decreases(r in returns_strategy()) {
        let peaks = peak_series(&equity_curve(&r));
        prop_assert!(peaks.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn monthly_sums_conserve_the_total((values, dates) in dated_returns()) {
        let view = SeriesView::new(&values, &dates).unwrap();
        let monthly: f64 = resample_monthly(view, false).iter().sum();
        let total: f64 = values.iter().sum();
        prop_assert!((monthly - total).abs() < 1e-9);
    }

    #[test]
    fn monthly_compounding_conserves_growth((values, dates) in dated_returns()) {
        let view = SeriesView::new(&values, &dates).unwrap();
        let monthly = resample_monthly(view, true);
        let growth = |xs: &[f64]| xs.iter().fold(1.0, |acc, x| acc * (1.0 + x));
        prop_assert!(relative_eq(growth(&monthly), growth(&values), 1e-10));
    }

    #[test]
    fn win_rate_counts_winners_among_non_zero(r in returns_strategy()) {
        let non_zero = r.iter().filter(|x| **x != 0.0).count();
        let winners = r.iter().filter(|x| **x > 0.0).count();
        let rebuilt = win_rate(&r) * non_zero as f64;
        prop_assert_eq!(rebuilt.round() as usize, winners);
        prop_assert!((rebuilt - winners as f64).abs() < 1e-9);
    }

    #[test]
    fn prepare_is_idempotent(r in returns_strategy()) {
        let once = prepare_returns(&r, 0.0, false);
        let twice = prepare_returns(&once, 0.0, false);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dated_prepare_is_idempotent((values, dates) in dated_returns()) {
        let series = ReturnSeries::new(dates, values, None).unwrap();
        let once = series.prepare(0.0, false);
        let twice = once.prepare(0.0, false);
        prop_assert_eq!(&once.values, &twice.values);
        prop_assert_eq!(&once.dates, &twice.dates);
    }

    #[test]
    fn counting_metrics_ignore_order(r in returns_strategy()) {
        let mut reversed = r.clone();
        reversed.reverse();
        prop_assert_eq!(exposure(&r), exposure(&reversed));
        prop_assert_eq!(win_rate(&r), win_rate(&reversed));
        prop_assert_eq!(quantile(&r, 0.95), quantile(&reversed, 0.95));
    }

    #[test]
    fn series_against_itself(r in prop::collection::vec(-0.2_f64..0.2, 2..200)) {
        prop_assume!(r.iter().any(|x| *x != r[0]));
        prop_assert!((beta(&r, &r) - 1.0).abs() < 1e-9);
        prop_assert!((r_squared(&r, &r) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ulcer_index_is_bounded_by_max_drawdown(r in returns_strategy()) {
        let ulcer = ulcer_index(&r);
        let max_dd = max_drawdown(&r);
        prop_assert!(ulcer >= 0.0);
        prop_assert!(ulcer <= max_dd.abs() + 1e-12);
        if r.len() >= 2 {
            let underwater = to_drawdown_series(&r).iter().any(|d| *d < 0.0);
            prop_assert_eq!(ulcer > 0.0, underwater);
        }
    }
}
