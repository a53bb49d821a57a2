use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calendar;
use crate::drawdown::{DrawdownPeriod, top_drawdowns};
use crate::plots;
use crate::stats::{
    BenchmarkMetrics, MetricsOptions, PerformanceMetrics, compute_performance_metrics,
};
use crate::utils::{
    DataError, PERIODS_PER_YEAR, ReturnSeries, align_on_dates, match_start_dates,
};

const DEFAULT_TITLE: &str = "Strategy Tearsheet";
const DEFAULT_DRAWDOWN_ROWS: usize = 30;
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_TEMPLATE: &str = include_str!("report_template.html");

#[derive(Debug, Error)]
pub enum HtmlReportError {
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("returns series is empty")]
    EmptySeries,
}

pub struct HtmlReportOptions<'a> {
    pub benchmark: Option<&'a ReturnSeries>,
    /// Annualised risk-free rate used by the metrics.
    pub rf: f64,
    pub title: String,
    pub output: Option<PathBuf>,
    pub compounded: bool,
    pub periods_per_year: u32,
    /// Keep non-finite observations instead of dropping them.
    pub keep_nans: bool,
    pub template_path: Option<PathBuf>,
    /// Start both series at the later of their first active dates.
    pub match_dates: bool,
    pub strategy_title: Option<String>,
    pub benchmark_title: Option<String>,
    /// Rows in the worst-drawdowns table.
    pub drawdown_rows: usize,
}

impl<'a> Default for HtmlReportOptions<'a> {
    fn default() -> Self {
        Self {
            benchmark: None,
            rf: 0.0,
            title: DEFAULT_TITLE.to_string(),
            output: None,
            compounded: true,
            periods_per_year: PERIODS_PER_YEAR,
            keep_nans: false,
            template_path: None,
            match_dates: true,
            strategy_title: None,
            benchmark_title: None,
            drawdown_rows: DEFAULT_DRAWDOWN_ROWS,
        }
    }
}

impl<'a> HtmlReportOptions<'a> {
    pub fn with_benchmark(mut self, benchmark: &'a ReturnSeries) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    pub fn with_rf(mut self, rf: f64) -> Self {
        self.rf = rf;
        self
    }

    pub fn with_output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_strategy_title<S: Into<String>>(mut self, title: S) -> Self {
        self.strategy_title = Some(title.into());
        self
    }

    pub fn with_benchmark_title<S: Into<String>>(mut self, title: S) -> Self {
        self.benchmark_title = Some(title.into());
        self
    }

    pub fn with_template_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_compounded(mut self, compounded: bool) -> Self {
        self.compounded = compounded;
        self
    }

    pub fn with_periods_per_year(mut self, periods: u32) -> Self {
        self.periods_per_year = periods;
        self
    }

    pub fn with_keep_nans(mut self, keep_nans: bool) -> Self {
        self.keep_nans = keep_nans;
        self
    }

    pub fn with_match_dates(mut self, match_dates: bool) -> Self {
        self.match_dates = match_dates;
        self
    }

    pub fn with_drawdown_rows(mut self, rows: usize) -> Self {
        self.drawdown_rows = rows;
        self
    }

    fn metrics_options(&self) -> MetricsOptions {
        MetricsOptions::default()
            .with_rf(self.rf)
            .with_periods_per_year(self.periods_per_year)
            .with_compounded(self.compounded)
            .with_keep_nans(self.keep_nans)
    }
}

/// Renders the full tearsheet and, when an output path is set, writes it
/// to disk as well.
pub fn html(
    returns: &ReturnSeries,
    options: HtmlReportOptions<'_>,
) -> Result<String, HtmlReportError> {
    let metric_options = options.metrics_options();
    let (strategy, benchmark) = prepare_inputs(returns, &options, &metric_options)?;
    let benchmark = benchmark.as_ref();

    let metrics = compute_performance_metrics(
        strategy.view(),
        benchmark.map(|b| b.values.as_slice()),
        &metric_options,
    );
    let benchmark_metrics =
        benchmark.map(|b| compute_performance_metrics(b.view(), None, &metric_options));

    let mut tpl = match &options.template_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let (start, end) = strategy.date_range().ok_or(HtmlReportError::EmptySeries)?;
    let date_range = format!(
        "{} - {}",
        start.format("%e %b, %Y").to_string().trim(),
        end.format("%e %b, %Y").to_string().trim()
    );

    let strategy_title = options
        .strategy_title
        .clone()
        .or_else(|| strategy.name.clone())
        .unwrap_or_else(|| "Strategy".to_string());
    let benchmark_title = options
        .benchmark_title
        .clone()
        .or_else(|| benchmark.and_then(|b| b.name.clone()))
        .unwrap_or_else(|| "Benchmark".to_string());

    tpl = tpl.replace("{{title}}", &escape_html(&options.title));
    tpl = tpl.replace("{{date_range}}", &date_range);
    tpl = tpl.replace("{{v}}", VERSION);
    let benchmark_prefix = match benchmark {
        Some(_) => format!("Benchmark is {} | ", escape_html(&benchmark_title)),
        None => String::new(),
    };
    tpl = tpl.replace("{{benchmark_title}}", &benchmark_prefix);

    let rows = metric_rows(benchmark.is_some());
    let metrics_html = build_metrics_table(
        &rows,
        &metrics,
        benchmark_metrics.as_ref(),
        &escape_html(&strategy_title),
        &escape_html(&benchmark_title),
    );
    tpl = tpl.replace("{{metrics}}", &metrics_html);

    let ppy = options.periods_per_year;
    let charts = [
        ("{{returns}}", plots::cumulative_returns(&strategy, benchmark)),
        ("{{log_returns}}", plots::log_returns(&strategy, benchmark)),
        (
            "{{vol_returns}}",
            benchmark
                .map(|b| plots::vol_matched_returns(&strategy, b))
                .unwrap_or_default(),
        ),
        ("{{eoy_returns}}", plots::eoy_returns(&strategy, benchmark)),
        ("{{monthly_dist}}", plots::monthly_distribution(&strategy)),
        ("{{daily_returns}}", plots::daily_returns(&strategy)),
        (
            "{{rolling_beta}}",
            benchmark
                .map(|b| plots::rolling_beta(&strategy, b, ppy))
                .unwrap_or_default(),
        ),
        ("{{rolling_vol}}", plots::rolling_volatility(&strategy, benchmark, ppy)),
        ("{{rolling_sharpe}}", plots::rolling_sharpe(&strategy, options.rf, ppy)),
        ("{{rolling_sortino}}", plots::rolling_sortino(&strategy, options.rf, ppy)),
        ("{{dd_periods}}", plots::drawdown_periods(&strategy)),
        ("{{dd_plot}}", plots::underwater(&strategy)),
        ("{{monthly_heatmap}}", plots::monthly_heatmap(&strategy)),
        ("{{returns_dist}}", plots::returns_distribution(&strategy)),
    ];
    for (placeholder, svg) in &charts {
        tpl = tpl.replace(placeholder, svg);
    }

    let eoy_title = if benchmark.is_some() {
        "<h3>EOY Returns vs Benchmark</h3>"
    } else {
        "<h3>EOY Returns</h3>"
    };
    tpl = tpl.replace("{{eoy_title}}", eoy_title);
    tpl = tpl.replace("{{eoy_table}}", &build_eoy_table(&strategy, benchmark));

    let worst = top_drawdowns(strategy.view(), options.drawdown_rows);
    tpl = tpl.replace("{{dd_info}}", &build_drawdown_info(&worst));

    debug!(
        observations = strategy.len(),
        metric_rows = rows.len(),
        drawdowns = worst.len(),
        benchmark = benchmark.is_some(),
        "assembled html report"
    );

    if let Some(path) = &options.output {
        debug!(path = %path.display(), "writing html report");
        std::fs::write(path, &tpl)?;
    }

    Ok(tpl)
}

/// Sanitises both inputs and joins them on their common dates.
fn prepare_inputs(
    returns: &ReturnSeries,
    options: &HtmlReportOptions<'_>,
    metric_options: &MetricsOptions,
) -> Result<(ReturnSeries, Option<ReturnSeries>), HtmlReportError> {
    returns.validate()?;
    let strategy = metric_options.prepare(returns);
    if strategy.is_empty() {
        return Err(HtmlReportError::EmptySeries);
    }

    let Some(bench) = options.benchmark else {
        return Ok((strategy, None));
    };
    bench.validate()?;
    let bench = metric_options.prepare(bench);
    if bench.is_empty() {
        warn!("benchmark has no usable observations; rendering without it");
        return Ok((strategy, None));
    }

    let (mut joined, mut bench) = align_on_dates(&strategy, &bench);
    if joined.is_empty() {
        warn!("benchmark shares no dates with the strategy; rendering without it");
        return Ok((strategy, None));
    }
    if options.match_dates {
        (joined, bench) = match_start_dates(&joined, &bench);
    }
    debug!(
        strategy = joined.len(),
        benchmark = bench.len(),
        match_dates = options.match_dates,
        "aligned strategy and benchmark"
    );
    Ok((joined, Some(bench)))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// === metrics table ===

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Better {
    Higher,
    Lower,
    /// Closer to zero wins; used for negative quantities like drawdowns.
    SmallerMagnitude,
    Neutral,
}

#[derive(Clone, Copy)]
enum Format {
    Percent,
    Ratio,
    Whole,
}

enum Cell {
    Value(f64, Format),
    Date(Option<NaiveDate>),
    Missing,
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Value(v, _) if v.is_nan() => "-".to_string(),
            Cell::Value(v, _) if v.is_infinite() => {
                let symbol = if *v > 0.0 { "∞" } else { "-∞" };
                symbol.to_string()
            }
            Cell::Value(v, Format::Percent) => format!("{:.2}%", v * 100.0),
            Cell::Value(v, Format::Ratio) => format!("{v:.2}"),
            Cell::Value(v, Format::Whole) => format!("{v:.0}"),
            Cell::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
            Cell::Date(None) | Cell::Missing => "-".to_string(),
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Cell::Value(v, _) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }
}

type Extract = Box<dyn Fn(&PerformanceMetrics) -> Cell>;

enum Row {
    Metric {
        label: &'static str,
        extract: Extract,
        better: Better,
    },
    Separator,
}

fn value(
    label: &'static str,
    format: Format,
    better: Better,
    f: fn(&PerformanceMetrics) -> f64,
) -> Row {
    Row::Metric {
        label,
        extract: Box::new(move |m: &PerformanceMetrics| Cell::Value(f(m), format)),
        better,
    }
}

fn pct(label: &'static str, better: Better, f: fn(&PerformanceMetrics) -> f64) -> Row {
    value(label, Format::Percent, better, f)
}

fn ratio(label: &'static str, better: Better, f: fn(&PerformanceMetrics) -> f64) -> Row {
    value(label, Format::Ratio, better, f)
}

fn date(label: &'static str, f: fn(&PerformanceMetrics) -> Option<NaiveDate>) -> Row {
    Row::Metric {
        label,
        extract: Box::new(move |m: &PerformanceMetrics| Cell::Date(f(m))),
        better: Better::Neutral,
    }
}

/// Benchmark-relative rows; the benchmark's own column has no value.
fn greek(label: &'static str, better: Better, f: fn(&BenchmarkMetrics) -> f64) -> Row {
    Row::Metric {
        label,
        extract: Box::new(move |m: &PerformanceMetrics| match &m.benchmark {
            Some(b) => Cell::Value(f(b), Format::Ratio),
            None => Cell::Missing,
        }),
        better,
    }
}

fn metric_rows(with_benchmark: bool) -> Vec<Row> {
    use Better::*;

    let mut rows = vec![
        pct("Risk-Free Rate", Neutral, |m| m.rf),
        pct("Time in Market", Neutral, |m| m.exposure),
        Row::Separator,
        pct("Cumulative Return", Higher, |m| m.total_return),
        pct("CAGR﹪", Higher, |m| m.cagr),
        Row::Separator,
        ratio("Sharpe", Higher, |m| m.sharpe),
        pct("Prob. Sharpe Ratio", Higher, |m| m.probabilistic_sharpe),
        ratio("Smart Sharpe", Higher, |m| m.smart_sharpe),
        ratio("Sortino", Higher, |m| m.sortino),
        ratio("Smart Sortino", Higher, |m| m.smart_sortino),
        ratio("Sortino/√2", Higher, |m| m.sortino_sqrt2),
        ratio("Smart Sortino/√2", Higher, |m| m.smart_sortino_sqrt2),
        ratio("Omega", Higher, |m| m.omega),
        Row::Separator,
        pct("Max Drawdown", SmallerMagnitude, |m| m.max_drawdown),
        date("Max DD Date", |m| m.max_drawdown_valley),
        date("Max DD Period Start", |m| m.max_drawdown_start),
        date("Max DD Period End", |m| m.max_drawdown_end),
        value("Longest DD Days", Format::Whole, Lower, |m| {
            m.longest_dd_days as f64
        }),
        pct("Volatility (ann.)", Lower, |m| m.volatility),
    ];
    if with_benchmark {
        rows.push(greek("R^2", Neutral, |b| b.r_squared));
        rows.push(greek("Information Ratio", Higher, |b| b.information_ratio));
    }
    rows.extend([
        ratio("Calmar", Higher, |m| m.calmar),
        ratio("Skew", Neutral, |m| m.skew),
        ratio("Kurtosis", Neutral, |m| m.kurtosis),
        Row::Separator,
        pct("Expected Daily", Higher, |m| m.expected_daily),
        pct("Expected Monthly", Higher, |m| m.expected_monthly),
        pct("Expected Yearly", Higher, |m| m.expected_yearly),
        pct("Kelly Criterion", Higher, |m| m.kelly_criterion),
        pct("Risk of Ruin", Lower, |m| m.risk_of_ruin),
        pct("Daily Value-at-Risk", SmallerMagnitude, |m| m.value_at_risk),
        pct("Expected Shortfall (cVaR)", SmallerMagnitude, |m| {
            m.expected_shortfall
        }),
        Row::Separator,
        value("Max Consecutive Wins", Format::Whole, Higher, |m| {
            m.consecutive_wins as f64
        }),
        value("Max Consecutive Losses", Format::Whole, Lower, |m| {
            m.consecutive_losses as f64
        }),
        ratio("Gain/Pain Ratio", Higher, |m| m.gain_to_pain),
        ratio("Gain/Pain (1M)", Higher, |m| m.gain_to_pain_monthly),
        Row::Separator,
        ratio("Payoff Ratio", Higher, |m| m.payoff_ratio),
        ratio("Profit Factor", Higher, |m| m.profit_factor),
        ratio("Common Sense Ratio", Higher, |m| m.common_sense_ratio),
        ratio("CPC Index", Higher, |m| m.cpc_index),
        ratio("Tail Ratio", Higher, |m| m.tail_ratio),
        ratio("Outlier Win Ratio", Higher, |m| m.outlier_win_ratio),
        ratio("Outlier Loss Ratio", Neutral, |m| m.outlier_loss_ratio),
        Row::Separator,
        pct("MTD", Higher, |m| m.mtd),
        pct("3M", Higher, |m| m.three_month),
        pct("6M", Higher, |m| m.six_month),
        pct("YTD", Higher, |m| m.ytd),
        pct("1Y", Higher, |m| m.one_year),
        pct("3Y (ann.)", Higher, |m| m.three_year),
        pct("5Y (ann.)", Higher, |m| m.five_year),
        pct("10Y (ann.)", Higher, |m| m.ten_year),
        pct("All-time (ann.)", Higher, |m| m.all_time),
        Row::Separator,
        pct("Best Day", Higher, |m| m.best_day),
        pct("Worst Day", Higher, |m| m.worst_day),
        pct("Best Month", Higher, |m| m.best_month),
        pct("Worst Month", Higher, |m| m.worst_month),
        pct("Best Year", Higher, |m| m.best_year),
        pct("Worst Year", Higher, |m| m.worst_year),
        Row::Separator,
        pct("Avg. Drawdown", SmallerMagnitude, |m| m.avg_drawdown),
        value("Avg. Drawdown Days", Format::Whole, Lower, |m| {
            m.avg_drawdown_days
        }),
        ratio("Recovery Factor", Higher, |m| m.recovery_factor),
        ratio("Ulcer Index", Lower, |m| m.ulcer_index),
        ratio("Ulcer Performance Index", Higher, |m| {
            m.ulcer_performance_index
        }),
        ratio("Serenity Index", Higher, |m| m.serenity_index),
        Row::Separator,
        pct("Avg. Up Month", Higher, |m| m.avg_up_month),
        pct("Avg. Down Month", Higher, |m| m.avg_down_month),
        pct("Win Days %", Higher, |m| m.win_days),
        pct("Win Month %", Higher, |m| m.win_month),
        pct("Win Quarter %", Higher, |m| m.win_quarter),
        pct("Win Year %", Higher, |m| m.win_year),
    ]);
    if with_benchmark {
        rows.extend([
            Row::Separator,
            greek("Beta", Neutral, |b| b.beta),
            greek("Alpha", Higher, |b| b.alpha),
            greek("Correlation", Neutral, |b| b.correlation),
            greek("Treynor Ratio", Higher, |b| b.treynor_ratio),
        ]);
    }
    rows
}

/// Decides which column, if any, gets the "better" highlight.
fn winner(better: Better, strategy: &Cell, benchmark: &Cell) -> Option<bool> {
    let (s, b) = (strategy.number()?, benchmark.number()?);
    let strategy_wins = match better {
        Better::Neutral => return None,
        Better::Higher => s > b,
        Better::Lower => s < b,
        Better::SmallerMagnitude => s.abs() < b.abs(),
    };
    let benchmark_wins = match better {
        Better::Higher => b > s,
        Better::Lower => b < s,
        _ => b.abs() < s.abs(),
    };
    match (strategy_wins, benchmark_wins) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn build_metrics_table(
    rows: &[Row],
    strategy: &PerformanceMetrics,
    benchmark: Option<&PerformanceMetrics>,
    strategy_title: &str,
    benchmark_title: &str,
) -> String {
    let mut html = String::new();
    html.push_str("<table><thead><tr><th>Metric</th>");
    if benchmark.is_some() {
        html.push_str(&format!("<th>{benchmark_title}</th>"));
    }
    html.push_str(&format!("<th>{strategy_title}</th></tr></thead><tbody>"));

    let colspan = if benchmark.is_some() { 3 } else { 2 };
    for row in rows {
        let Row::Metric {
            label,
            extract,
            better,
        } = row
        else {
            html.push_str(&format!(r#"<tr><td colspan="{colspan}"><hr></td></tr>"#));
            continue;
        };

        let s_cell = extract(strategy);
        html.push_str(&format!("<tr><td>{label}</td>"));
        let strategy_class = match benchmark {
            Some(bench) => {
                let b_cell = extract(bench);
                let win = winner(*better, &s_cell, &b_cell);
                let class = if win == Some(false) { r#" class="better""# } else { "" };
                html.push_str(&format!("<td{class}>{}</td>", b_cell.render()));
                if win == Some(true) { r#" class="better""# } else { "" }
            }
            None => "",
        };
        html.push_str(&format!("<td{strategy_class}>{}</td></tr>", s_cell.render()));
    }

    html.push_str("</tbody></table>");
    html
}

// === side tables ===

fn build_eoy_table(strategy: &ReturnSeries, benchmark: Option<&ReturnSeries>) -> String {
    let strat_years = calendar::yearly_table(&strategy.values, &strategy.dates);
    if strat_years.is_empty() {
        return "<p>No EOY data available.</p>".to_string();
    }
    let bench_years = benchmark.map(|b| calendar::yearly_table(&b.values, &b.dates));

    let mut years: BTreeSet<i32> = strat_years.keys().copied().collect();
    if let Some(b) = &bench_years {
        years.extend(b.keys().copied());
    }

    let mut html = String::new();
    html.push_str("<table>\n<thead>\n<tr><th>Year</th>");
    if bench_years.is_some() {
        html.push_str("<th>Benchmark</th><th>Strategy</th><th>Multiplier</th><th>Won</th>");
    } else {
        html.push_str("<th>Strategy</th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for year in years {
        let strat = strat_years.get(&year).copied().unwrap_or(0.0) * 100.0;
        match &bench_years {
            Some(bench_map) => {
                let bench = bench_map.get(&year).copied().unwrap_or(0.0) * 100.0;
                let multiplier = if bench.abs() > f64::EPSILON {
                    strat / bench
                } else {
                    0.0
                };
                let won = if strat > bench { "+" } else { "-" };
                html.push_str(&format!(
                    "<tr><td>{year}</td><td>{bench:.2}%</td><td>{strat:.2}%</td><td>{multiplier:.2}</td><td>{won}</td></tr>\n"
                ));
            }
            None => {
                html.push_str(&format!("<tr><td>{year}</td><td>{strat:.2}%</td></tr>\n"));
            }
        }
    }

    html.push_str("</tbody>\n</table>");
    html
}

fn build_drawdown_info(drawdowns: &[DrawdownPeriod]) -> String {
    let date_cell = |d: Option<NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    let mut html = String::new();
    html.push_str("<table><thead><tr>");
    html.push_str("<th>Started</th><th>Recovered</th><th>Drawdown</th><th>Days</th>");
    html.push_str("</tr></thead><tbody>");
    for dd in drawdowns {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}%</td><td>{}</td></tr>",
            date_cell(dd.start_date),
            date_cell(dd.end_date),
            dd.depth * 100.0,
            dd.days
        ));
    }
    html.push_str("</tbody></table>");
    html
}
