use chrono::{Days, NaiveDate};
use perfstats::{HtmlReportOptions, ReturnSeries, html};
use tracing_subscriber::EnvFilter;

/// Deterministic daily returns: a drift plus two sine waves.
fn synthetic(
    name: &str,
    start: NaiveDate,
    days: u64,
    drift: f64,
    scale: f64,
    phase: f64,
) -> Result<ReturnSeries, perfstats::DataError> {
    let dates = (0..days).map(|i| start + Days::new(i)).collect();
    let values = (0..days)
        .map(|i| {
            let t = i as f64 + phase;
            drift + scale * (0.8 * (t * 0.37).sin() + 0.5 * (t * 1.71).cos())
        })
        .collect();
    ReturnSeries::new(dates, values, Some(name.to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("perfstats=debug".parse()?))
        .init();

    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap_or_default();
    let strategy = synthetic("Long/Short Equity", start, 900, 0.0007, 0.008, 0.0)?;
    // The index starts a month later; the report is cut to the overlap.
    let benchmark = synthetic("Index", start + Days::new(30), 900, 0.0004, 0.011, 3.0)?;

    let output = std::env::temp_dir().join("perfstats-tearsheet-benchmark.html");
    let options = HtmlReportOptions::default()
        .with_benchmark(&benchmark)
        .with_title("perfstats Demo Tearsheet (with Benchmark)")
        .with_benchmark_title("Benchmark Index")
        .with_rf(0.01)
        .with_output(&output);

    let page = html(&strategy, options)?;
    println!("wrote {} bytes to {}", page.len(), output.display());

    Ok(())
}
