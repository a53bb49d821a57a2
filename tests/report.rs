use chrono::{Days, NaiveDate};
use perfstats::{HtmlReportError, HtmlReportOptions, ReturnSeries, html};

fn daily_series(name: &str, start: NaiveDate, values: Vec<f64>) -> ReturnSeries {
    let dates = (0..values.len() as u64)
        .map(|i| start + Days::new(i))
        .collect();
    ReturnSeries::new(dates, values, Some(name.to_string())).unwrap()
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

fn wave(n: usize, drift: f64, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|i| drift + amplitude * ((i as f64) * 0.7).sin())
        .collect()
}

fn temp_path(file: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("perfstats-{}-{file}", std::process::id()))
}

#[test]
fn renders_strategy_only_tearsheet() {
    let series = daily_series("Momentum", start(), wave(400, 0.0008, 0.01));
    let page = html(&series, HtmlReportOptions::default().with_title("Momentum <Book>")).unwrap();

    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("Momentum &lt;Book&gt;"));
    assert!(page.contains("Cumulative Return"));
    assert!(page.contains("<svg"));
    assert!(page.contains("<h3>EOY Returns</h3>"));
    assert!(!page.contains("{{"));
    // no comparison column, so nothing is highlighted
    assert!(!page.contains(r#"<td class="better">"#));
}

#[test]
fn benchmark_adds_columns_and_highlights() {
    let strategy = daily_series("Alpha", start(), wave(300, 0.002, 0.004));
    let benchmark = daily_series("Index", start(), wave(300, -0.001, 0.02));

    let options = HtmlReportOptions::default()
        .with_benchmark(&benchmark)
        .with_benchmark_title("Index");
    let page = html(&strategy, options).unwrap();

    assert!(page.contains("Benchmark is Index"));
    assert!(page.contains("<th>Index</th><th>Alpha</th>"));
    assert!(page.contains("EOY Returns vs Benchmark"));
    assert!(page.contains("<td>Beta</td>"));
    assert!(page.contains(r#"<td class="better">"#));
}

#[test]
fn benchmark_is_cut_to_the_common_range() {
    let strategy = daily_series("Alpha", start(), wave(200, 0.001, 0.01));
    let late = start() + Days::new(100);
    let benchmark = daily_series("Index", late, wave(200, 0.0005, 0.01));

    let options = HtmlReportOptions::default()
        .with_benchmark(&benchmark)
        .with_match_dates(false);
    let page = html(&strategy, options).unwrap();

    let header = format!("{} - ", late.format("%e %b, %Y").to_string().trim());
    assert!(page.contains(&header));
}

#[test]
fn all_nan_input_is_rejected() {
    let series = daily_series("Empty", start(), vec![f64::NAN; 10]);
    let err = html(&series, HtmlReportOptions::default()).unwrap_err();
    assert!(matches!(err, HtmlReportError::EmptySeries));
}

#[test]
fn writes_output_file() {
    let path = temp_path("tearsheet.html");
    let series = daily_series("Momentum", start(), wave(120, 0.001, 0.01));

    let page = html(&series, HtmlReportOptions::default().with_output(&path)).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(page, written);
}

#[test]
fn custom_template_is_used() {
    let path = temp_path("template.html");
    std::fs::write(&path, "<h1>{{title}}</h1>{{metrics}}").unwrap();
    let series = daily_series("Momentum", start(), wave(120, 0.001, 0.01));

    let page = html(
        &series,
        HtmlReportOptions::default()
            .with_title("Custom")
            .with_template_path(&path),
    )
    .unwrap();
    std::fs::remove_file(&path).ok();

    assert!(page.starts_with("<h1>Custom</h1><table>"));
    assert!(!page.contains("<svg"));
}

#[test]
fn missing_template_is_an_io_error() {
    let series = daily_series("Momentum", start(), wave(50, 0.001, 0.01));
    let options = HtmlReportOptions::default().with_template_path(temp_path("missing.html"));
    assert!(matches!(html(&series, options), Err(HtmlReportError::Io(_))));
}

#[test]
fn benchmark_is_joined_on_dates() {
    let values = wave(40, 0.001, 0.01);
    let strategy = daily_series("Alpha", start(), values.clone());
    let mut holiday = values;
    holiday[17] = f64::NAN;
    let benchmark = daily_series("Alpha Copy", start(), holiday);

    let options = HtmlReportOptions::default()
        .with_benchmark(&benchmark)
        .with_match_dates(false);
    let page = html(&strategy, options).unwrap();

    // Paired day by day, the copy tracks the strategy exactly.
    assert!(page.contains("<tr><td>Beta</td><td>-</td><td>1.00</td></tr>"));
    assert!(page.contains("<tr><td>Correlation</td><td>-</td><td>1.00</td></tr>"));
}

#[test]
fn benchmark_without_common_dates_is_skipped() {
    let strategy = daily_series("Alpha", start(), wave(30, 0.001, 0.01));
    let later = start() + Days::new(365);
    let benchmark = daily_series("Index", later, wave(30, 0.001, 0.01));

    let page = html(&strategy, HtmlReportOptions::default().with_benchmark(&benchmark)).unwrap();
    assert!(!page.contains("Benchmark is"));
    assert!(!page.contains("<td>Beta</td>"));
}

#[test]
fn keep_nans_reaches_the_metrics() {
    let mut values = wave(60, 0.001, 0.01);
    values[10] = f64::NAN;
    let series = daily_series("Gappy", start(), values);
    let row = "<tr><td>Cumulative Return</td><td>-</td></tr>";

    let dropped = html(&series, HtmlReportOptions::default()).unwrap();
    assert!(!dropped.contains(row));

    let kept = html(&series, HtmlReportOptions::default().with_keep_nans(true)).unwrap();
    assert!(kept.contains(row));
}

#[test]
fn hand_built_series_is_validated() {
    let broken = ReturnSeries {
        dates: vec![start()],
        values: vec![0.01, 0.02],
        name: None,
    };
    let err = html(&broken, HtmlReportOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HtmlReportError::Data(perfstats::DataError::LengthMismatch { dates: 1, values: 2 })
    ));
}
