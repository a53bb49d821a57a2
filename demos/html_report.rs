use chrono::{Datelike, Days, NaiveDate, Weekday};
use perfstats::{
    HtmlReportOptions, MetricsOptions, ReturnSeries, compute_performance_metrics, html,
};
use tracing_subscriber::EnvFilter;

/// Two years of weekday returns with a small drift and a few bad weeks.
fn synthetic_strategy() -> Result<ReturnSeries, perfstats::DataError> {
    let mut date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default();
    let mut dates = Vec::new();
    let mut returns = Vec::new();

    let mut i = 0_u32;
    while dates.len() < 504 {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let t = f64::from(i);
            let noise = 0.009 * (t * 0.61).sin() + 0.004 * (t * 1.93).cos();
            let shock = if i % 97 < 4 { -0.012 } else { 0.0 };
            dates.push(date);
            returns.push(0.0006 + noise + shock);
            i += 1;
        }
        date = date + Days::new(1);
    }

    ReturnSeries::new(dates, returns, Some("Demo Strategy".to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("perfstats=info".parse()?))
        .init();

    let series = synthetic_strategy()?;

    let metrics = compute_performance_metrics(series.view(), None, &MetricsOptions::default());
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    let output = std::env::temp_dir().join("perfstats-tearsheet.html");
    let options = HtmlReportOptions::default()
        .with_title("perfstats Demo Tearsheet")
        .with_rf(0.02)
        .with_output(&output);

    let page = html(&series, options)?;
    println!("wrote {} bytes to {}", page.len(), output.display());

    Ok(())
}
