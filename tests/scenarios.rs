//! End-to-end metric checks on small hand-computed series.

use chrono::NaiveDate;
use perfstats::calendar::resample_monthly;
use perfstats::distribution::quantile;
use perfstats::drawdown::{drawdown_details, equity_curve, peak_series, to_drawdown_series};
use perfstats::stats::{
    self, cagr, consecutive_losses, consecutive_wins, exposure, expected_return, max_drawdown,
    serenity_index, sharpe, smart_sharpe, sortino, total_return, ulcer_index, volatility,
    win_rate,
};
use perfstats::utils::prepare_returns;
use perfstats::{MetricsOptions, SeriesView, compute_performance_metrics};

const EPS: f64 = 1e-12;

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn constant_zero_returns() {
    let r = [0.0; 252];
    let view = SeriesView::undated(&r);

    assert_eq!(total_return(&r), 0.0);
    assert_eq!(cagr(view), 0.0);
    assert_eq!(volatility(&r, 252), 0.0);
    assert_eq!(max_drawdown(&r), 0.0);
    assert_eq!(sharpe(&r, 0.0, 252, true), 0.0);
    assert_eq!(ulcer_index(&r), 0.0);
    assert_eq!(win_rate(&r), 0.0);
    assert_eq!(serenity_index(&r, 0.0), 0.0);
}

#[test]
fn constant_positive_returns() {
    let r = [0.01; 252];
    let expected_total = 1.01_f64.powi(252) - 1.0;

    assert_close(total_return(&r), expected_total, 1e-9);
    assert_close(expected_total, 11.2740, 1e-3);
    assert_close(cagr(SeriesView::undated(&r)), expected_total, 1e-9);
    assert_eq!(volatility(&r, 252), 0.0);
    assert_eq!(sharpe(&r, 0.0, 252, true), 0.0);
    assert_eq!(max_drawdown(&r), 0.0);
    assert_eq!(win_rate(&r), 1.0);
    assert_eq!(sortino(&r, 0.0, 252, true), f64::INFINITY);
}

#[test]
fn alternating_ten_percent() {
    let r: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 0.10 } else { -0.10 }).collect();

    assert_close(total_return(&r), (1.1_f64 * 0.9).powi(5) - 1.0, EPS);
    assert_close(total_return(&r), -0.049_009_950_1, 1e-10);
    // The peak of 1.1 is never regained; the last loss is the deepest point.
    assert_close(max_drawdown(&r), 0.99_f64.powi(4) * 0.9 - 1.0, EPS);
    assert_close(to_drawdown_series(&r)[1], -0.1, EPS);
    assert_eq!(win_rate(&r), 0.5);
    assert_eq!(consecutive_wins(&r), 1);
    assert_eq!(consecutive_losses(&r), 1);
}

#[test]
fn three_equal_returns() {
    let r = [0.10, 0.10, 0.10];

    assert_close(total_return(&r), 0.331, EPS);
    assert_close(expected_return(SeriesView::undated(&r), None, true), 0.10, EPS);
    assert_eq!(volatility(&r, 252), 0.0);
}

#[test]
fn decreasing_run_then_recovery() {
    let r = [0.10, -0.05, -0.05, -0.05, 0.20];

    let equity = equity_curve(&r);
    for (e, x) in equity.iter().zip([1.10, 1.045, 0.99275, 0.943_112_5, 1.131_735]) {
        assert_close(*e, x, EPS);
    }

    let peaks = peak_series(&equity);
    for (p, x) in peaks.iter().zip([1.10, 1.10, 1.10, 1.10, 1.131_735]) {
        assert_close(*p, x, EPS);
    }

    let dd = to_drawdown_series(&r);
    for (d, x) in dd.iter().zip([0.0, -0.05, -0.0975, -0.142_625, 0.0]) {
        assert_close(*d, x, EPS);
    }
    assert_close(max_drawdown(&r), -0.142_625, EPS);

    let periods = drawdown_details(SeriesView::undated(&r));
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].start, 1);
    assert_eq!(periods[0].end, 3);
    assert_eq!(periods[0].days, 3);
}

#[test]
fn prices_are_detected_and_converted() {
    let r = prepare_returns(&[100.0, 102.0, 101.0, 105.0], 0.0, false);

    assert_eq!(r.len(), 3);
    assert_close(r[0], 0.02, EPS);
    assert_close(r[1], -1.0 / 102.0, EPS);
    assert_close(r[2], 4.0 / 101.0, EPS);
    assert_close(total_return(&r), 0.05, EPS);
}

#[test]
fn permutation_keeps_counting_metrics() {
    let r = [0.02, -0.01, 0.0, 0.03, -0.04, 0.01, 0.0, -0.02];
    let mut shuffled = r;
    shuffled.reverse();
    shuffled.swap(0, 3);

    assert_eq!(exposure(&r), exposure(&shuffled));
    assert_eq!(win_rate(&r), win_rate(&shuffled));
    assert_eq!(quantile(&r, 0.95), quantile(&shuffled, 0.95));
    assert_eq!(quantile(&r, 0.05), quantile(&shuffled, 0.05));
    assert_eq!(stats::tail_ratio(&r, 0.95), stats::tail_ratio(&shuffled, 0.95));
}

#[test]
fn permutation_changes_path_metrics() {
    let alternating = [0.2, -0.1, 0.2, -0.1];
    let front_loaded = [0.2, 0.2, -0.1, -0.1];

    assert_close(
        sharpe(&alternating, 0.0, 252, true),
        sharpe(&front_loaded, 0.0, 252, true),
        1e-9,
    );
    assert_ne!(
        smart_sharpe(&alternating, 0.0, 252),
        smart_sharpe(&front_loaded, 0.0, 252)
    );
    // Back-to-back losses compound into a deeper trough.
    assert_close(max_drawdown(&alternating), -0.1, EPS);
    assert_close(max_drawdown(&front_loaded), 0.81 - 1.0, EPS);

    let dates = [
        NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
    ];
    let a = resample_monthly(SeriesView::new(&alternating, &dates).unwrap(), false);
    let b = resample_monthly(SeriesView::new(&front_loaded, &dates).unwrap(), false);
    assert_ne!(a, b);
}

#[test]
fn full_metrics_on_degenerate_input_stay_finite() {
    let r = [0.0; 30];
    let metrics =
        compute_performance_metrics(SeriesView::undated(&r), None, &MetricsOptions::default());

    assert_eq!(metrics.total_return, 0.0);
    assert_eq!(metrics.sharpe, 0.0);
    assert_eq!(metrics.max_drawdown, 0.0);
    assert!(metrics.benchmark.is_none());

    let json = serde_json::to_value(&metrics).unwrap();
    assert_eq!(json["sharpe"], 0.0);
}
